//! Error types for the safe `SQLite` wrapper.

use std::fmt;

use thiserror::Error;

use super::ffi;

/// Result code returned by `SQLite` operations.
///
/// Connections enable extended result codes, so the value may carry extra
/// detail in its upper bits (e.g. `SQLITE_CONSTRAINT_UNIQUE`). Use
/// [`primary`](Self::primary) to compare against the base codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DbErrorCode(pub i32);

impl DbErrorCode {
    /// The primary result code with the extended bits stripped.
    #[must_use]
    pub const fn primary(self) -> i32 {
        self.0 & 0xff
    }
}

impl fmt::Display for DbErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Broad classification of a [`DbError`], following how a caller can react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A parameter index was out of range or the engine rejected a value.
    /// Retrying with corrected input can succeed.
    Binding,
    /// Executing the statement failed (constraint, busy/locked, I/O,
    /// corruption, ...). Surfaced as-is; retry policy belongs to the caller.
    Execution,
    /// The API was used out of protocol, e.g. stepping a finished statement.
    /// Indicates a bug in the calling code.
    Misuse,
    /// Anything else, including SQL syntax errors reported at prepare time.
    Other,
}

/// Error returned by database operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("sqlite error {code}: {message}")]
pub struct DbError {
    /// `SQLite` result code.
    pub code: DbErrorCode,
    /// Human-readable error message (from `sqlite3_errmsg` when available).
    pub message: String,
}

impl DbError {
    /// Creates a new database error.
    pub(crate) fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code: DbErrorCode(code),
            message: message.into(),
        }
    }

    /// Creates an `SQLITE_MISUSE` error for a protocol violation.
    pub(crate) fn misuse(message: impl Into<String>) -> Self {
        Self::new(ffi::SQLITE_MISUSE, message)
    }

    /// Classifies the error by its primary result code.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self.code.primary() {
            ffi::SQLITE_RANGE | ffi::SQLITE_TOOBIG | ffi::SQLITE_MISMATCH => ErrorKind::Binding,
            ffi::SQLITE_MISUSE => ErrorKind::Misuse,
            ffi::SQLITE_CONSTRAINT
            | ffi::SQLITE_BUSY
            | ffi::SQLITE_LOCKED
            | ffi::SQLITE_IOERR
            | ffi::SQLITE_CORRUPT
            | ffi::SQLITE_NOTADB
            | ffi::SQLITE_FULL
            | ffi::SQLITE_READONLY
            | ffi::SQLITE_INTERRUPT
            | ffi::SQLITE_ABORT
            | ffi::SQLITE_NOMEM
            | ffi::SQLITE_PERM
            | ffi::SQLITE_CANTOPEN
            | ffi::SQLITE_PROTOCOL
            | ffi::SQLITE_SCHEMA => ErrorKind::Execution,
            _ => ErrorKind::Other,
        }
    }

    /// Returns `true` for `SQLITE_BUSY` and `SQLITE_LOCKED`, the two codes a
    /// higher layer may want to retry.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(self.code.primary(), ffi::SQLITE_BUSY | ffi::SQLITE_LOCKED)
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_strips_extended_bits() {
        // SQLITE_CONSTRAINT_UNIQUE
        let code = DbErrorCode(2067);
        assert_eq!(code.primary(), ffi::SQLITE_CONSTRAINT);
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(DbError::new(25, "range").kind(), ErrorKind::Binding);
        assert_eq!(DbError::misuse("misuse").kind(), ErrorKind::Misuse);
        assert_eq!(DbError::new(2067, "unique").kind(), ErrorKind::Execution);
        assert_eq!(DbError::new(ffi::SQLITE_ERROR, "syntax").kind(), ErrorKind::Other);
    }

    #[test]
    fn test_is_busy() {
        assert!(DbError::new(5, "busy").is_busy());
        // SQLITE_LOCKED_SHAREDCACHE
        assert!(DbError::new(262, "locked").is_busy());
        assert!(!DbError::new(19, "constraint").is_busy());
    }

    #[test]
    fn test_display() {
        let err = DbError::new(1, "no such table: t");
        assert_eq!(err.to_string(), "sqlite error 1: no such table: t");
    }
}
