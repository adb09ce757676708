//! Minimal safe `SQLite` prepared-statement wrapper.
//!
//! This crate provides a small, safe Rust API over the `SQLite` C FFI, linked
//! statically through `libsqlite3-sys` and its bundled amalgamation.
//!
//! The centre of the crate is [`Statement`]: one compiled query with an
//! explicit `Start → HasRow → Finished` state machine, typed binding, cheap
//! borrowed column views, and a [`ResetGuard`] for scope-bound cleanup.
//! [`Connection`] opens databases and compiles statements; each statement
//! keeps a reference-counted share of the connection alive.
//!
//! ```ignore
//! use stmtkit_db::{Connection, StepResult};
//!
//! let conn = Connection::open_in_memory()?;
//! conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY); INSERT INTO t VALUES (5);")?;
//!
//! let mut stmt = conn.prepare("SELECT id FROM t WHERE id = ?")?;
//! stmt.bind_int32(1, 5)?;
//! while stmt.step()? == StepResult::Row {
//!     assert_eq!(stmt.view_int32(0), 5);
//! }
//! ```
//!
//! Consumer code uses only the safe types defined here and never touches raw
//! FFI directly. The `ffi` module is the **only** file that contains `unsafe`
//! code or C types.

mod ffi;

mod connection;
pub mod error;
mod guard;
mod statement;
pub mod value;

pub use connection::Connection;
pub use error::{DbError, DbErrorCode, DbResult, ErrorKind};
pub use guard::ResetGuard;
pub use statement::{Datatype, State, Statement, StepResult};
pub use value::Value;
