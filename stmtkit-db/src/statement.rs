//! Safe wrapper around a `SQLite` prepared statement.
//!
//! This file contains **no `unsafe` code**. All FFI interaction is delegated to
//! [`ffi::RawStmt`] which encapsulates the raw pointers and C type conversions.
//!
//! A [`Statement`] runs a small state machine:
//!
//! ```text
//!            step: row             step: row
//!   Start ─────────────▶ HasRow ◀──────────┐
//!     │                    │  └────────────┘
//!     │ step: done/error   │ step: done/error
//!     ▼                    ▼
//!   Finished ◀─────────────┘      reset: any state ──▶ Start
//! ```
//!
//! Parameter indices are 1-based, column indices 0-based, as in `SQLite`.

use std::borrow::Cow;
use std::fmt;
use std::os::raw::c_int;
use std::sync::Arc;

use super::error::{DbError, DbResult};
use super::ffi::{self, RawDb, RawStmt};
use super::guard::ResetGuard;
use super::value::Value;

/// Result of a single [`Statement::step`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// A result row is available (`SQLITE_ROW`).
    Row,
    /// The statement has finished executing (`SQLITE_DONE`).
    Done,
}

/// Execution state of a [`Statement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    /// Freshly prepared or reset; no row fetched yet.
    #[default]
    Start,
    /// A row is available for reading.
    HasRow,
    /// No more rows for this execution, either because the engine reported
    /// done or because a step failed. Only [`Statement::reset`] leaves it.
    Finished,
}

/// Runtime storage class of a single column value.
///
/// `SQLite` types values, not columns, so two rows of the same column can
/// report different datatypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datatype {
    /// 64-bit signed integer.
    Integer,
    /// 64-bit IEEE float.
    Float,
    /// Binary blob.
    Blob,
    /// SQL NULL.
    Null,
    /// Text.
    Text,
}

impl Datatype {
    const fn from_raw(code: c_int) -> Self {
        match code {
            ffi::SQLITE_INTEGER => Self::Integer,
            ffi::SQLITE_FLOAT => Self::Float,
            ffi::SQLITE_TEXT => Self::Text,
            ffi::SQLITE_BLOB => Self::Blob,
            // SQLITE_NULL is the only remaining storage class.
            _ => Self::Null,
        }
    }
}

/// A prepared `SQLite` statement.
///
/// Created via [`Connection::prepare`](super::Connection::prepare). The
/// statement holds a shared reference to the connection, so the database
/// stays open for as long as the statement exists, even after the
/// [`Connection`](super::Connection) itself is dropped. The native statement
/// is finalized when the `Statement` is dropped or [`finalize`](Self::finalize)d.
///
/// A default-constructed statement is *empty*: fallible operations on it
/// return an `SQLITE_MISUSE` error, `view_*` accessors panic, and
/// [`reset`](Self::reset) does nothing.
#[derive(Default)]
pub struct Statement {
    // Declaration order is drop order: the statement is finalized before the
    // connection reference is released.
    raw: Option<RawStmt>,
    db: Option<Arc<RawDb>>,
    state: State,
    /// Bindings issued mid-execution, applied on the next reset.
    pending: Vec<(c_int, Value)>,
    /// `clear_bindings` was called mid-execution.
    clear_on_reset: bool,
    /// A queued binding the engine rejected at reset, reported by the next
    /// step.
    rejected: Option<DbError>,
}

impl Statement {
    /// Wraps a freshly compiled statement.
    pub(super) fn new(raw: RawStmt, db: Arc<RawDb>) -> Self {
        Self {
            raw: Some(raw),
            db: Some(db),
            ..Self::default()
        }
    }

    // ── State ───────────────────────────────────────────────────────────

    /// Current execution state.
    #[must_use]
    pub const fn state(&self) -> State {
        self.state
    }

    /// `true` unless the statement is [`State::Finished`].
    #[must_use]
    pub const fn can_step(&self) -> bool {
        !matches!(self.state, State::Finished)
    }

    /// `true` while a row is available for the `view_*` accessors.
    #[must_use]
    pub const fn has_row(&self) -> bool {
        matches!(self.state, State::HasRow)
    }

    /// `true` if the statement owns no native handle.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.is_none()
    }

    /// Moves the statement out, leaving an empty one in its place.
    #[must_use]
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// The SQL text the statement was compiled from, `None` when empty.
    #[must_use]
    pub fn sql(&self) -> Option<Cow<'_, str>> {
        self.raw.as_ref().map(RawStmt::sql)
    }

    // ── Binding ─────────────────────────────────────────────────────────

    /// Binds a blob to the 1-based parameter `index`. The bytes are copied.
    pub fn bind_blob(&mut self, index: usize, value: &[u8]) -> DbResult<()> {
        self.bind_with(
            index,
            || Value::Blob(value.to_vec()),
            |raw, idx| raw.bind_blob(idx, value),
        )
    }

    /// Binds text to the 1-based parameter `index`. The text is copied.
    pub fn bind_string(&mut self, index: usize, value: &str) -> DbResult<()> {
        self.bind_with(
            index,
            || Value::Text(value.to_string()),
            |raw, idx| raw.bind_text(idx, value),
        )
    }

    /// Binds a 32-bit integer to the 1-based parameter `index`.
    pub fn bind_int32(&mut self, index: usize, value: i32) -> DbResult<()> {
        self.bind_with(
            index,
            || Value::Integer(value.into()),
            |raw, idx| raw.bind_int(idx, value),
        )
    }

    /// Binds a 64-bit integer to the 1-based parameter `index`.
    pub fn bind_int64(&mut self, index: usize, value: i64) -> DbResult<()> {
        self.bind_with(
            index,
            || Value::Integer(value),
            |raw, idx| raw.bind_int64(idx, value),
        )
    }

    /// Binds a float to the 1-based parameter `index`.
    pub fn bind_double(&mut self, index: usize, value: f64) -> DbResult<()> {
        self.bind_with(
            index,
            || Value::Real(value),
            |raw, idx| raw.bind_double(idx, value),
        )
    }

    /// Binds SQL NULL to the 1-based parameter `index`.
    pub fn bind_null(&mut self, index: usize) -> DbResult<()> {
        self.bind_with(index, || Value::Null, RawStmt::bind_null)
    }

    /// Binds an owned [`Value`] to the 1-based parameter `index`.
    pub fn bind_value(&mut self, index: usize, value: &Value) -> DbResult<()> {
        self.bind_with(index, || value.clone(), |raw, idx| bind_native(raw, idx, value))
    }

    /// Binds a slice of [`Value`]s to parameters `1..=values.len()`.
    ///
    /// Stops at the first failure; parameters bound before it keep their
    /// new values.
    pub fn bind_values(&mut self, values: &[Value]) -> DbResult<()> {
        for (i, value) in values.iter().enumerate() {
            self.bind_value(i + 1, value)?;
        }
        Ok(())
    }

    /// Resets every parameter to NULL.
    ///
    /// Mid-execution, the clear is deferred to the next [`reset`](Self::reset)
    /// together with any pending bindings issued before it.
    pub fn clear_bindings(&mut self) -> DbResult<()> {
        let raw = self.raw_or_misuse()?;
        if self.state == State::Start {
            let rc = raw.clear_bindings();
            return self.check(rc);
        }
        self.pending.clear();
        self.clear_on_reset = true;
        Ok(())
    }

    /// Number of parameters in the compiled SQL (the largest index).
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.raw
            .as_ref()
            .map_or(0, |raw| usize::try_from(raw.parameter_count()).unwrap_or(0))
    }

    /// 1-based index of a named parameter, including its prefix
    /// (`":id"`, `"@id"`, `"$id"`). `None` if there is no such parameter.
    #[must_use]
    pub fn parameter_index(&self, name: &str) -> Option<usize> {
        let idx = self.raw.as_ref()?.parameter_index(name);
        usize::try_from(idx).ok().filter(|idx| *idx > 0)
    }

    /// Shared binding path.
    ///
    /// In [`State::Start`] the value goes straight to the engine. Otherwise
    /// the engine would refuse it (`SQLITE_MISUSE`), so the index is checked
    /// here and the value is queued for the next reset; the row currently
    /// being read is unaffected either way.
    fn bind_with(
        &mut self,
        index: usize,
        deferred: impl FnOnce() -> Value,
        bind: impl FnOnce(&RawStmt, c_int) -> c_int,
    ) -> DbResult<()> {
        let raw = self.raw_or_misuse()?;
        let idx = c_int::try_from(index).map_err(|_| out_of_range(index))?;
        if self.state == State::Start {
            let rc = bind(raw, idx);
            return self.check(rc);
        }
        if !(1..=raw.parameter_count()).contains(&idx) {
            return Err(out_of_range(index));
        }
        let value = deferred();
        let len = match &value {
            Value::Text(text) => Some(text.len()),
            Value::Blob(blob) => Some(blob.len()),
            _ => None,
        };
        if let (Some(len), Some(db)) = (len, &self.db) {
            let limit = db.limit(ffi::SQLITE_LIMIT_LENGTH, -1);
            if usize::try_from(limit).is_ok_and(|limit| len > limit) {
                return Err(DbError::new(
                    ffi::SQLITE_TOOBIG,
                    format!("parameter {index} is {len} bytes, over the {limit}-byte limit"),
                ));
            }
        }
        log::trace!("deferring binding of parameter {index} until reset");
        self.pending.retain(|(queued, _)| *queued != idx);
        self.pending.push((idx, value));
        Ok(())
    }

    // ── Stepping ────────────────────────────────────────────────────────

    /// Advances to the next result row.
    ///
    /// Returns [`StepResult::Row`] when a row is available and
    /// [`StepResult::Done`] when the statement has run to completion.
    ///
    /// # Errors
    ///
    /// * `SQLITE_MISUSE` if the statement is empty or already
    ///   [`State::Finished`]; the state is left untouched.
    /// * The engine's error for a binding issued mid-execution that could
    ///   not be applied at the last reset. The statement stays in
    ///   [`State::Start`] with that parameter unbound (NULL); rebind it and
    ///   step again.
    /// * Any execution error from the engine (constraint, busy, I/O, ...).
    ///   The statement moves to [`State::Finished`] and must be reset before
    ///   it can run again.
    pub fn step(&mut self) -> DbResult<StepResult> {
        if self.state == State::Finished {
            return Err(DbError::misuse(
                "statement must be reset before stepping again",
            ));
        }
        if let Some(err) = self.rejected.take() {
            return Err(err);
        }
        let raw = self.raw_or_misuse()?;
        log::trace!("step: {}", raw.sql());
        let rc = raw.step();
        match rc {
            ffi::SQLITE_ROW => {
                self.state = State::HasRow;
                Ok(StepResult::Row)
            }
            ffi::SQLITE_DONE => {
                self.state = State::Finished;
                Ok(StepResult::Done)
            }
            _ => {
                self.state = State::Finished;
                let err = self.error(rc);
                log::debug!("step failed: {err}");
                Err(err)
            }
        }
    }

    /// Rewinds the statement to [`State::Start`].
    ///
    /// Bindings are kept; pending bindings issued mid-execution are applied
    /// now, and one the engine rejects is reported by the next
    /// [`step`](Self::step). Safe to call in any state, repeatedly, and on an
    /// empty statement.
    pub fn reset(&mut self) {
        let Some(raw) = self.raw.as_ref() else {
            return;
        };
        // The return code repeats the last step's error, already reported.
        raw.reset();
        if std::mem::take(&mut self.clear_on_reset) {
            raw.clear_bindings();
        }
        for (idx, value) in self.pending.drain(..) {
            let rc = bind_native(raw, idx, &value);
            if rc != ffi::SQLITE_OK && self.rejected.is_none() {
                let err = self
                    .db
                    .as_ref()
                    .map_or_else(|| DbError::new(rc, ffi::errstr(rc)), |db| db.error(rc));
                log::debug!("deferred binding of parameter {idx} failed: {err}");
                self.rejected = Some(err);
            }
        }
        self.state = State::Start;
    }

    /// Returns a guard that derefs to this statement and resets it when
    /// dropped, whichever way the enclosing scope is left.
    pub fn guard(&mut self) -> ResetGuard<'_> {
        ResetGuard::new(self)
    }

    /// Finalizes the native statement now and leaves this one empty.
    ///
    /// Idempotent; dropping the statement afterwards releases nothing.
    pub fn finalize(&mut self) {
        // Assigning drops the old fields in declaration order.
        *self = Self::default();
    }

    // ── Column reading ──────────────────────────────────────────────────

    /// Number of columns in the result set; 0 for an empty statement or one
    /// that returns no data (e.g. an INSERT).
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.raw
            .as_ref()
            .map_or(0, |raw| usize::try_from(raw.column_count()).unwrap_or(0))
    }

    /// Name of the 0-based column `index`, as given by `AS` or derived by the
    /// engine. Available in any state.
    #[must_use]
    pub fn column_name(&self, index: usize) -> Option<&str> {
        let idx = c_int::try_from(index).ok()?;
        self.raw.as_ref()?.column_name(idx)
    }

    /// Reads column `index` as text, converting numbers the way `SQLite`
    /// does. NULL reads as the empty string.
    ///
    /// Borrows the engine's buffer when it holds valid UTF-8; invalid
    /// sequences are replaced. Converting a blob or a number to text may
    /// reallocate that buffer, hence the exclusive borrow.
    ///
    /// # Panics
    ///
    /// If there is no current row or `index` is out of range.
    #[must_use]
    pub fn view_string(&mut self, index: usize) -> Cow<'_, str> {
        let (raw, idx) = self.current_row(index);
        String::from_utf8_lossy(raw.column_text(idx))
    }

    /// Reads column `index` as raw bytes; NULL reads as an empty slice.
    ///
    /// Numbers are converted to their text form first, which may replace
    /// the engine's buffer; the exclusive borrow keeps earlier views from
    /// outliving it.
    ///
    /// # Panics
    ///
    /// If there is no current row or `index` is out of range.
    #[must_use]
    pub fn view_blob(&mut self, index: usize) -> &[u8] {
        let (raw, idx) = self.current_row(index);
        raw.column_blob(idx)
    }

    /// Reads column `index` as a 32-bit integer. Larger values are truncated
    /// to their low 32 bits, as `sqlite3_column_int` does.
    ///
    /// # Panics
    ///
    /// If there is no current row or `index` is out of range.
    #[must_use]
    pub fn view_int32(&self, index: usize) -> i32 {
        let (raw, idx) = self.current_row(index);
        raw.column_int(idx)
    }

    /// Reads column `index` as a 64-bit integer.
    ///
    /// # Panics
    ///
    /// If there is no current row or `index` is out of range.
    #[must_use]
    pub fn view_int64(&self, index: usize) -> i64 {
        let (raw, idx) = self.current_row(index);
        raw.column_int64(idx)
    }

    /// Reads column `index` as a float.
    ///
    /// # Panics
    ///
    /// If there is no current row or `index` is out of range.
    #[must_use]
    pub fn view_double(&self, index: usize) -> f64 {
        let (raw, idx) = self.current_row(index);
        raw.column_double(idx)
    }

    /// Storage class of the value in column `index` of the current row.
    ///
    /// Call this before any conversion: reading a number as text changes
    /// the value's reported type.
    ///
    /// # Panics
    ///
    /// If there is no current row or `index` is out of range.
    #[must_use]
    pub fn view_datatype(&self, index: usize) -> Datatype {
        let (raw, idx) = self.current_row(index);
        Datatype::from_raw(raw.column_type(idx))
    }

    /// Copies column `index` out as an owned [`Value`] of its own datatype.
    ///
    /// # Panics
    ///
    /// If there is no current row or `index` is out of range.
    #[must_use]
    pub fn view_value(&self, index: usize) -> Value {
        let (raw, idx) = self.current_row(index);
        // Buffers are copied before returning, so no borrow outlives a
        // conversion.
        match Datatype::from_raw(raw.column_type(idx)) {
            Datatype::Integer => Value::Integer(raw.column_int64(idx)),
            Datatype::Float => Value::Real(raw.column_double(idx)),
            Datatype::Text => {
                Value::Text(String::from_utf8_lossy(raw.column_text(idx)).into_owned())
            }
            Datatype::Blob => Value::Blob(raw.column_blob(idx).to_vec()),
            Datatype::Null => Value::Null,
        }
    }

    /// Checks the `view_*` preconditions.
    fn current_row(&self, index: usize) -> (&RawStmt, c_int) {
        let Some(raw) = self.raw.as_ref() else {
            panic!("column read on an empty statement");
        };
        assert!(
            self.state == State::HasRow,
            "column read without a current row (state: {:?})",
            self.state
        );
        let count = raw.column_count();
        match c_int::try_from(index) {
            Ok(idx) if idx < count => (raw, idx),
            _ => panic!("column index {index} out of range (column count {count})"),
        }
    }

    // ── Diagnostics ─────────────────────────────────────────────────────

    /// Returns the engine's query plan for this statement.
    ///
    /// Compiles `EXPLAIN QUERY PLAN <sql>` on the same connection and
    /// renders one line per plan row, its columns joined by `|`. The
    /// statement itself is not touched.
    pub fn explain(&self) -> DbResult<String> {
        let (Some(raw), Some(db)) = (self.raw.as_ref(), self.db.as_ref()) else {
            return Err(empty_statement());
        };
        let sql = format!("EXPLAIN QUERY PLAN {}", raw.sql());
        let mut plan = Self::new(db.prepare(&sql)?, Arc::clone(db));
        let mut lines = Vec::new();
        while plan.step()? == StepResult::Row {
            let line = (0..plan.column_count())
                .map(|i| plan.view_string(i).into_owned())
                .collect::<Vec<_>>()
                .join("|");
            lines.push(line);
        }
        Ok(lines.join("\n"))
    }

    // ── Helpers ─────────────────────────────────────────────────────────

    fn raw_or_misuse(&self) -> DbResult<&RawStmt> {
        self.raw.as_ref().ok_or_else(empty_statement)
    }

    fn check(&self, rc: c_int) -> DbResult<()> {
        if rc == ffi::SQLITE_OK {
            Ok(())
        } else {
            Err(self.error(rc))
        }
    }

    fn error(&self, rc: c_int) -> DbError {
        match &self.db {
            Some(db) => db.error(rc),
            None => DbError::new(rc, ffi::errstr(rc)),
        }
    }
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.sql())
            .field("state", &self.state)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

fn bind_native(raw: &RawStmt, idx: c_int, value: &Value) -> c_int {
    match value {
        Value::Integer(v) => raw.bind_int64(idx, *v),
        Value::Real(v) => raw.bind_double(idx, *v),
        Value::Text(v) => raw.bind_text(idx, v),
        Value::Blob(v) => raw.bind_blob(idx, v),
        Value::Null => raw.bind_null(idx),
    }
}

fn empty_statement() -> DbError {
    DbError::misuse("statement is empty")
}

fn out_of_range(index: usize) -> DbError {
    DbError::new(ffi::SQLITE_RANGE, format!("parameter index {index} out of range"))
}
