//! Raw FFI layer over the `SQLite` C API.
//!
//! The symbols come from `libsqlite3-sys`, which compiles the bundled
//! amalgamation into a static library. This is the **only** module in the
//! crate that contains `unsafe` code or C types: everything above it talks to
//! [`RawDb`] and [`RawStmt`], which own their pointers and release them on
//! drop.
//!
//! Functions on [`RawStmt`] return raw result codes. Translating a code into a
//! [`DbError`] needs the owning connection's error message, so that happens one
//! layer up in the statement wrapper.

use std::borrow::Cow;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr::{self, NonNull};

use libsqlite3_sys as sys;

use super::error::{DbError, DbResult};

// `libsqlite3-sys` omits `sqlite3_close_v2` from its generated bindings, but the
// bundled amalgamation still exports the symbol.
extern "C" {
    fn sqlite3_close_v2(db: *mut sys::sqlite3) -> c_int;
}

// ── SQLite constants ────────────────────────────────────────────────────

pub const SQLITE_OK: c_int = 0;
pub const SQLITE_ERROR: c_int = 1;
pub const SQLITE_PERM: c_int = 3;
pub const SQLITE_ABORT: c_int = 4;
pub const SQLITE_BUSY: c_int = 5;
pub const SQLITE_LOCKED: c_int = 6;
pub const SQLITE_NOMEM: c_int = 7;
pub const SQLITE_READONLY: c_int = 8;
pub const SQLITE_INTERRUPT: c_int = 9;
pub const SQLITE_IOERR: c_int = 10;
pub const SQLITE_CORRUPT: c_int = 11;
pub const SQLITE_FULL: c_int = 13;
pub const SQLITE_CANTOPEN: c_int = 14;
pub const SQLITE_PROTOCOL: c_int = 15;
pub const SQLITE_SCHEMA: c_int = 17;
pub const SQLITE_TOOBIG: c_int = 18;
pub const SQLITE_CONSTRAINT: c_int = 19;
pub const SQLITE_MISMATCH: c_int = 20;
pub const SQLITE_MISUSE: c_int = 21;
pub const SQLITE_RANGE: c_int = 25;
pub const SQLITE_NOTADB: c_int = 26;
pub const SQLITE_ROW: c_int = 100;
pub const SQLITE_DONE: c_int = 101;

// Column type constants
pub const SQLITE_INTEGER: c_int = 1;
pub const SQLITE_FLOAT: c_int = 2;
pub const SQLITE_TEXT: c_int = 3;
pub const SQLITE_BLOB: c_int = 4;

// Run-time limit categories
pub const SQLITE_LIMIT_LENGTH: c_int = 0;

// Open flags
pub const SQLITE_OPEN_READONLY: c_int = 0x0000_0001;
pub const SQLITE_OPEN_READWRITE: c_int = 0x0000_0002;
pub const SQLITE_OPEN_CREATE: c_int = 0x0000_0004;
pub const SQLITE_OPEN_FULLMUTEX: c_int = 0x0001_0000;

/// Returns the English description `SQLite` keeps for a result code.
pub fn errstr(code: c_int) -> String {
    // SAFETY: sqlite3_errstr returns a pointer to a static string.
    unsafe { cstr_lossy(sys::sqlite3_errstr(code)) }.into_owned()
}

/// Reads a NUL-terminated C string, tolerating null and invalid UTF-8.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that stays valid
/// for `'a`.
unsafe fn cstr_lossy<'a>(ptr: *const c_char) -> Cow<'a, str> {
    if ptr.is_null() {
        Cow::Borrowed("")
    } else {
        CStr::from_ptr(ptr).to_string_lossy()
    }
}

fn to_cstring(text: &str, what: &str) -> DbResult<CString> {
    CString::new(text)
        .map_err(|e| DbError::new(SQLITE_ERROR, format!("nul in {what}: {e}")))
}

// ── Connection handle ───────────────────────────────────────────────────

/// Owned `sqlite3*` handle. Closed with `sqlite3_close_v2` when dropped.
pub struct RawDb {
    ptr: NonNull<sys::sqlite3>,
}

// SAFETY: connections are opened with SQLITE_OPEN_FULLMUTEX, so SQLite
// serializes every call made through the handle.
unsafe impl Send for RawDb {}
// SAFETY: see above.
unsafe impl Sync for RawDb {}

impl RawDb {
    /// Opens (or creates) the database at `path` with the given open flags.
    pub fn open(path: &str, flags: c_int) -> DbResult<Self> {
        let c_path = to_cstring(path, "path")?;
        let mut db: *mut sys::sqlite3 = ptr::null_mut();
        // SAFETY: `c_path` is a valid C string and `db` a valid out-pointer.
        let rc = unsafe { sys::sqlite3_open_v2(c_path.as_ptr(), &mut db, flags, ptr::null()) };
        let Some(ptr) = NonNull::new(db) else {
            return Err(DbError::new(rc, format!("sqlite3_open_v2 returned {rc}")));
        };
        // From here on `raw` owns the handle and closes it on every path.
        let raw = Self { ptr };
        if rc != SQLITE_OK {
            return Err(raw.error(rc));
        }
        // SAFETY: the handle is open.
        unsafe { sys::sqlite3_extended_result_codes(raw.ptr.as_ptr(), 1) };
        Ok(raw)
    }

    /// Runs one or more `;`-separated statements, discarding any rows.
    pub fn exec(&self, sql: &str) -> DbResult<()> {
        let c_sql = to_cstring(sql, "SQL")?;
        let mut errmsg: *mut c_char = ptr::null_mut();
        // SAFETY: the handle is open, `c_sql` is valid, no callback is passed.
        let rc = unsafe {
            sys::sqlite3_exec(
                self.ptr.as_ptr(),
                c_sql.as_ptr(),
                None,
                ptr::null_mut(),
                &mut errmsg,
            )
        };
        if rc == SQLITE_OK {
            return Ok(());
        }
        if errmsg.is_null() {
            return Err(self.error(rc));
        }
        // SAFETY: sqlite3_exec allocated `errmsg` with sqlite3_malloc.
        let message = unsafe {
            let message = cstr_lossy(errmsg).into_owned();
            sys::sqlite3_free(errmsg.cast());
            message
        };
        Err(DbError::new(rc, message))
    }

    /// Compiles the first statement in `sql`.
    pub fn prepare(&self, sql: &str) -> DbResult<RawStmt> {
        let c_sql = to_cstring(sql, "SQL")?;
        let mut stmt: *mut sys::sqlite3_stmt = ptr::null_mut();
        // SAFETY: the handle is open, `c_sql` is NUL-terminated (-1 length).
        let rc = unsafe {
            sys::sqlite3_prepare_v2(
                self.ptr.as_ptr(),
                c_sql.as_ptr(),
                -1,
                &mut stmt,
                ptr::null_mut(),
            )
        };
        if rc != SQLITE_OK {
            return Err(self.error(rc));
        }
        // A blank or comment-only input compiles to no statement at all.
        NonNull::new(stmt)
            .map(|ptr| RawStmt { ptr })
            .ok_or_else(|| DbError::new(SQLITE_MISUSE, "no SQL statement to prepare"))
    }

    /// Number of rows changed by the most recent INSERT/UPDATE/DELETE.
    pub fn changes(&self) -> c_int {
        // SAFETY: the handle is open.
        unsafe { sys::sqlite3_changes(self.ptr.as_ptr()) }
    }

    /// Sets the run-time limit `id` to `value` and returns the previous
    /// value; a negative `value` only queries it.
    pub fn limit(&self, id: c_int, value: c_int) -> c_int {
        // SAFETY: the handle is open; SQLite clamps values above the
        // compile-time maximum.
        unsafe { sys::sqlite3_limit(self.ptr.as_ptr(), id, value) }
    }

    /// Rowid of the most recent successful INSERT.
    pub fn last_insert_rowid(&self) -> i64 {
        // SAFETY: the handle is open.
        unsafe { sys::sqlite3_last_insert_rowid(self.ptr.as_ptr()) }
    }

    /// Builds an error from `code` and the connection's current message.
    pub fn error(&self, code: c_int) -> DbError {
        // SAFETY: the handle is open; the message is copied before returning.
        let message = unsafe { cstr_lossy(sys::sqlite3_errmsg(self.ptr.as_ptr())) };
        DbError::new(code, message)
    }
}

impl Drop for RawDb {
    fn drop(&mut self) {
        // SAFETY: the handle is open and never used again. close_v2 defers the
        // physical close until every statement on it has been finalized.
        let rc = unsafe { sqlite3_close_v2(self.ptr.as_ptr()) };
        if rc != SQLITE_OK {
            log::warn!("sqlite3_close_v2 failed: {}", errstr(rc));
        }
    }
}

// ── Statement handle ────────────────────────────────────────────────────

/// Owned `sqlite3_stmt*` handle. Finalized exactly once, when dropped.
pub struct RawStmt {
    ptr: NonNull<sys::sqlite3_stmt>,
}

// SAFETY: the handle has a single owner and is only touched through `&self`
// or `&mut self` on that owner; it is never shared between threads.
unsafe impl Send for RawStmt {}

impl RawStmt {
    fn as_ptr(&self) -> *mut sys::sqlite3_stmt {
        self.ptr.as_ptr()
    }

    // ── Execution ───────────────────────────────────────────────────────

    pub fn step(&self) -> c_int {
        // SAFETY: the statement is live.
        unsafe { sys::sqlite3_step(self.as_ptr()) }
    }

    pub fn reset(&self) -> c_int {
        // SAFETY: the statement is live.
        unsafe { sys::sqlite3_reset(self.as_ptr()) }
    }

    pub fn clear_bindings(&self) -> c_int {
        // SAFETY: the statement is live.
        unsafe { sys::sqlite3_clear_bindings(self.as_ptr()) }
    }

    /// The SQL text the statement was compiled from.
    pub fn sql(&self) -> Cow<'_, str> {
        // SAFETY: the text is owned by the statement and lives as long as it.
        unsafe { cstr_lossy(sys::sqlite3_sql(self.as_ptr())) }
    }

    // ── Parameter binding ───────────────────────────────────────────────

    pub fn bind_int(&self, index: c_int, value: i32) -> c_int {
        // SAFETY: the statement is live; SQLite range-checks `index`.
        unsafe { sys::sqlite3_bind_int(self.as_ptr(), index, value) }
    }

    pub fn bind_int64(&self, index: c_int, value: i64) -> c_int {
        // SAFETY: the statement is live; SQLite range-checks `index`.
        unsafe { sys::sqlite3_bind_int64(self.as_ptr(), index, value) }
    }

    pub fn bind_double(&self, index: c_int, value: f64) -> c_int {
        // SAFETY: the statement is live; SQLite range-checks `index`.
        unsafe { sys::sqlite3_bind_double(self.as_ptr(), index, value) }
    }

    pub fn bind_null(&self, index: c_int) -> c_int {
        // SAFETY: the statement is live; SQLite range-checks `index`.
        unsafe { sys::sqlite3_bind_null(self.as_ptr(), index) }
    }

    /// Binds a copy of `value` (`SQLITE_TRANSIENT`).
    pub fn bind_blob(&self, index: c_int, value: &[u8]) -> c_int {
        let Ok(len) = c_int::try_from(value.len()) else {
            return SQLITE_TOOBIG;
        };
        // SAFETY: `value` is valid for `len` bytes for the duration of the
        // call and SQLite copies it before returning.
        unsafe {
            sys::sqlite3_bind_blob(
                self.as_ptr(),
                index,
                value.as_ptr().cast(),
                len,
                sys::SQLITE_TRANSIENT(),
            )
        }
    }

    /// Binds a copy of `value` (`SQLITE_TRANSIENT`).
    pub fn bind_text(&self, index: c_int, value: &str) -> c_int {
        let Ok(len) = c_int::try_from(value.len()) else {
            return SQLITE_TOOBIG;
        };
        // SAFETY: as for `bind_blob`; the explicit length means no NUL is needed.
        unsafe {
            sys::sqlite3_bind_text(
                self.as_ptr(),
                index,
                value.as_ptr().cast(),
                len,
                sys::SQLITE_TRANSIENT(),
            )
        }
    }

    pub fn parameter_count(&self) -> c_int {
        // SAFETY: the statement is live.
        unsafe { sys::sqlite3_bind_parameter_count(self.as_ptr()) }
    }

    /// 1-based index of a named parameter (`:name`, `@name`, `$name`), or 0.
    pub fn parameter_index(&self, name: &str) -> c_int {
        let Ok(c_name) = CString::new(name) else {
            return 0;
        };
        // SAFETY: the statement is live and `c_name` is NUL-terminated.
        unsafe { sys::sqlite3_bind_parameter_index(self.as_ptr(), c_name.as_ptr()) }
    }

    // ── Column reading ──────────────────────────────────────────────────

    pub fn column_count(&self) -> c_int {
        // SAFETY: the statement is live.
        unsafe { sys::sqlite3_column_count(self.as_ptr()) }
    }

    pub fn column_name(&self, column: c_int) -> Option<&str> {
        // SAFETY: the name lives until the statement is finalized; null means
        // the column is out of range.
        unsafe {
            let ptr = sys::sqlite3_column_name(self.as_ptr(), column);
            if ptr.is_null() {
                None
            } else {
                CStr::from_ptr(ptr).to_str().ok()
            }
        }
    }

    pub fn column_type(&self, column: c_int) -> c_int {
        // SAFETY: the statement is live.
        unsafe { sys::sqlite3_column_type(self.as_ptr(), column) }
    }

    pub fn column_int(&self, column: c_int) -> i32 {
        // SAFETY: the statement is live.
        unsafe { sys::sqlite3_column_int(self.as_ptr(), column) }
    }

    pub fn column_int64(&self, column: c_int) -> i64 {
        // SAFETY: the statement is live.
        unsafe { sys::sqlite3_column_int64(self.as_ptr(), column) }
    }

    pub fn column_double(&self, column: c_int) -> f64 {
        // SAFETY: the statement is live.
        unsafe { sys::sqlite3_column_double(self.as_ptr(), column) }
    }

    /// Column value as raw bytes; empty for NULL.
    ///
    /// The slice aliases an engine-owned buffer that stays valid until the
    /// next step, reset or finalize, or until another `column_blob` /
    /// `column_text` call converts the same value. Callers must not keep a
    /// slice across any of these; `Statement` enforces that by handing out
    /// buffer views only through `&mut self`.
    pub fn column_blob(&self, column: c_int) -> &[u8] {
        // SAFETY: pointer first, then length, as SQLite documents.
        unsafe {
            let ptr = sys::sqlite3_column_blob(self.as_ptr(), column);
            let len = sys::sqlite3_column_bytes(self.as_ptr(), column);
            bytes(ptr.cast(), len)
        }
    }

    /// Column value converted to text by the engine, without the trailing NUL.
    pub fn column_text(&self, column: c_int) -> &[u8] {
        // SAFETY: see `column_blob`.
        unsafe {
            let ptr = sys::sqlite3_column_text(self.as_ptr(), column);
            let len = sys::sqlite3_column_bytes(self.as_ptr(), column);
            bytes(ptr.cast(), len)
        }
    }
}

/// # Safety
///
/// `ptr` must be null or valid for reads of `len` bytes for `'a`.
unsafe fn bytes<'a>(ptr: *const u8, len: c_int) -> &'a [u8] {
    match usize::try_from(len) {
        Ok(len) if len > 0 && !ptr.is_null() => std::slice::from_raw_parts(ptr, len),
        _ => &[],
    }
}

impl Drop for RawStmt {
    fn drop(&mut self) {
        // SAFETY: the statement is live and never used again.
        let rc = unsafe { sys::sqlite3_finalize(self.as_ptr()) };
        if rc != SQLITE_OK {
            // finalize echoes the error of the last failed step; nobody is
            // positioned to act on it here.
            log::debug!("sqlite3_finalize returned {rc}: {}", errstr(rc));
        }
    }
}
