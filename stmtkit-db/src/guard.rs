//! Scope-bound reset of a statement.

use std::ops::{Deref, DerefMut};

use super::statement::Statement;

/// Resets the borrowed [`Statement`] when dropped.
///
/// Returned by [`Statement::guard`]. The guard derefs to the statement, so it
/// can be bound and stepped through the guard; whichever way the scope ends
/// (normal exit, `?`, early `return`, or unwinding) the statement is left in
/// [`State::Start`](super::State::Start) with its bindings intact.
///
/// ```ignore
/// let mut stmt = conn.prepare("SELECT name FROM users WHERE id = ?")?;
/// let name = {
///     let mut stmt = stmt.guard();
///     stmt.bind_int64(1, id)?;
///     stmt.step()?;
///     stmt.view_string(0).into_owned()
/// };
/// // `stmt` is ready to run again here.
/// ```
#[must_use = "the statement is reset as soon as the guard is dropped"]
pub struct ResetGuard<'stmt> {
    stmt: &'stmt mut Statement,
}

impl<'stmt> ResetGuard<'stmt> {
    pub(super) fn new(stmt: &'stmt mut Statement) -> Self {
        Self { stmt }
    }
}

impl Deref for ResetGuard<'_> {
    type Target = Statement;

    fn deref(&self) -> &Statement {
        self.stmt
    }
}

impl DerefMut for ResetGuard<'_> {
    fn deref_mut(&mut self) -> &mut Statement {
        self.stmt
    }
}

impl Drop for ResetGuard<'_> {
    fn drop(&mut self) {
        self.stmt.reset();
    }
}

impl std::fmt::Debug for ResetGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ResetGuard").field(&*self.stmt).finish()
    }
}
