//! Safe wrapper around a `SQLite` database connection.
//!
//! This file contains **no `unsafe` code**. All FFI interaction is delegated to
//! [`ffi::RawDb`] which encapsulates the raw pointers and C type conversions.

use std::os::raw::c_int;
use std::path::Path;
use std::sync::Arc;

use super::error::{DbError, DbResult};
use super::ffi::{self, RawDb};
use super::statement::{Statement, StepResult};
use super::value::Value;

/// A `SQLite` database connection.
///
/// The native handle is reference-counted: every [`Statement`] prepared from
/// this connection holds a share of it. Dropping (or [`close`](Self::close)-ing)
/// the `Connection` gives up the owner's share only; the database is closed
/// once the last statement is gone as well.
///
/// The handle is opened in serialized mode, but a statement is meant to be
/// used by one thread at a time, and callers should keep work on one
/// connection serialized.
pub struct Connection {
    db: Option<Arc<RawDb>>,
}

impl Connection {
    /// Opens (or creates) a database at `path`.
    ///
    /// Pass `read_only = true` for read-only access; the file must exist.
    pub fn open(path: &Path, read_only: bool) -> DbResult<Self> {
        let path_str = path.to_string_lossy();
        let flags = if read_only {
            ffi::SQLITE_OPEN_READONLY | ffi::SQLITE_OPEN_FULLMUTEX
        } else {
            ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE | ffi::SQLITE_OPEN_FULLMUTEX
        };
        let db = RawDb::open(&path_str, flags)?;
        log::debug!("opened database {path_str} (read_only: {read_only})");
        Ok(Self {
            db: Some(Arc::new(db)),
        })
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> DbResult<Self> {
        Self::open(Path::new(":memory:"), false)
    }

    /// `true` until [`close`](Self::close) is called.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.db.is_some()
    }

    /// Releases the owner's share of the native handle.
    ///
    /// Statements prepared earlier keep working; the database is closed when
    /// the last of them is dropped. Further calls on this `Connection` fail
    /// with `SQLITE_MISUSE`.
    pub fn close(&mut self) {
        self.db = None;
    }

    fn raw(&self) -> DbResult<&Arc<RawDb>> {
        self.db
            .as_ref()
            .ok_or_else(|| DbError::misuse("connection is closed"))
    }

    /// Executes one or more SQL statements separated by semicolons.
    ///
    /// No result rows are returned. Suitable for DDL, PRAGMAs, and
    /// multi-statement scripts.
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.raw()?.exec(sql)
    }

    /// Compiles the first SQL statement in `sql`.
    pub fn prepare(&self, sql: &str) -> DbResult<Statement> {
        let db = self.raw()?;
        let raw_stmt = db.prepare(sql)?;
        Ok(Statement::new(raw_stmt, Arc::clone(db)))
    }

    /// Prepares and executes a single SQL statement with the given parameters.
    ///
    /// Returns the number of rows changed.
    pub fn execute(&self, sql: &str, params: &[Value]) -> DbResult<usize> {
        let mut stmt = self.prepare(sql)?;
        stmt.bind_values(params)?;
        while stmt.step()? == StepResult::Row {}
        Ok(self.changes())
    }

    /// Prepares and executes a statement, mapping exactly one result row.
    ///
    /// Returns an error if no row is returned.
    pub fn query_row<T>(
        &self,
        sql: &str,
        params: &[Value],
        mapper: impl FnOnce(&mut Statement) -> DbResult<T>,
    ) -> DbResult<T> {
        self.query_row_optional(sql, params, mapper)?
            .ok_or_else(|| DbError::new(ffi::SQLITE_DONE, "query returned no rows"))
    }

    /// Like [`query_row`](Self::query_row) but returns `Ok(None)` when no row
    /// is returned.
    pub fn query_row_optional<T>(
        &self,
        sql: &str,
        params: &[Value],
        mapper: impl FnOnce(&mut Statement) -> DbResult<T>,
    ) -> DbResult<Option<T>> {
        let mut stmt = self.prepare(sql)?;
        stmt.bind_values(params)?;
        match stmt.step()? {
            StepResult::Row => mapper(&mut stmt).map(Some),
            StepResult::Done => Ok(None),
        }
    }

    /// Caps the size in bytes of any string or blob on this connection,
    /// bound parameters included, and returns the previous cap.
    ///
    /// The engine clamps `limit` to its compile-time maximum.
    pub fn set_length_limit(&self, limit: usize) -> DbResult<usize> {
        let limit = c_int::try_from(limit).unwrap_or(c_int::MAX);
        let previous = self.raw()?.limit(ffi::SQLITE_LIMIT_LENGTH, limit);
        Ok(usize::try_from(previous).unwrap_or(0))
    }

    /// Returns the rowid of the most recent successful INSERT, or 0 once the
    /// connection is closed.
    #[must_use]
    pub fn last_insert_rowid(&self) -> i64 {
        self.db.as_ref().map_or(0, |db| db.last_insert_rowid())
    }

    /// Returns the number of rows changed by the most recent statement, or 0
    /// once the connection is closed.
    #[must_use]
    pub fn changes(&self) -> usize {
        self.db
            .as_ref()
            .map_or(0, |db| usize::try_from(db.changes()).unwrap_or(0))
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}
