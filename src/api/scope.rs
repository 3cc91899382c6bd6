//! Arena marks and nested scopes.
//!
//! A mark is a saved cursor position. Rolling back to it releases every
//! allocation made after it, which gives sub-frame scopes and speculative
//! allocation on top of the arena's bulk reset.

use std::ops::{Deref, DerefMut};

use crate::allocators::arena::Arena;

/// A saved position in an arena.
///
/// Valid until the arena's next full `reset()`, or until a rewind moves the
/// cursor below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaMark {
    cursor: usize,
    epoch: u64,
    rewinds: u64,
}

impl ArenaMark {
    pub(crate) fn new(cursor: usize, epoch: u64, rewinds: u64) -> Self {
        Self { cursor, epoch, rewinds }
    }

    pub(crate) fn rewinds(&self) -> u64 {
        self.rewinds
    }

    /// The saved cursor offset.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Reset generation the mark was taken in.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// A guard over a nested arena scope.
///
/// When dropped, the arena rolls back to where it was when the guard was
/// created, unless the scope was committed. Dereferences to the arena.
///
/// # Example
///
/// ```rust
/// use scopealloc::Arena;
///
/// let mut arena = Arena::new(1024).unwrap();
/// {
///     let mut scope = arena.scope();
///     let _temp = scope.allocate(256, 8).unwrap();
/// } // released here
/// assert_eq!(arena.allocated(), 0);
/// ```
pub struct ArenaScope<'a> {
    arena: &'a mut Arena,
    mark: ArenaMark,
    committed: bool,
}

impl<'a> ArenaScope<'a> {
    pub(crate) fn new(arena: &'a mut Arena) -> Self {
        let mark = arena.mark();
        Self {
            arena,
            mark,
            committed: false,
        }
    }

    /// Keep the scope's allocations instead of rolling back.
    pub fn commit(mut self) {
        self.committed = true;
    }

    /// The mark this scope rolls back to.
    pub fn mark(&self) -> ArenaMark {
        self.mark
    }
}

impl Deref for ArenaScope<'_> {
    type Target = Arena;

    fn deref(&self) -> &Self::Target {
        self.arena
    }
}

impl DerefMut for ArenaScope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.arena
    }
}

impl Drop for ArenaScope<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }

        // A reset inside the scope already released everything past the
        // mark; there is nothing left to roll back.
        if self.arena.is_mark_live(self.mark) {
            self.arena.rewind(self.mark.cursor());
        } else {
            log::debug!(
                target: "scopealloc",
                "arena scope dropped after its mark went stale (mark at {})",
                self.mark.cursor()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_rolls_back() {
        let mut arena = Arena::new(512).unwrap();
        let outer = arena.allocate(8, 8).unwrap();

        {
            let mut scope = arena.scope();
            let inner = scope.allocate(100, 8).unwrap();
            assert_ne!(inner, outer);
            assert_eq!(scope.allocated(), 108);
        }

        assert_eq!(arena.allocated(), 8);
    }

    #[test]
    fn test_committed_scope_keeps_allocations() {
        let mut arena = Arena::new(512).unwrap();

        let mut scope = arena.scope();
        scope.allocate(64, 8).unwrap();
        scope.commit();

        assert_eq!(arena.allocated(), 64);
    }

    #[test]
    fn test_reset_inside_scope_is_quiet_in_strict_mode() {
        use crate::diagnostics::StrictModeGuard;

        let _strict = StrictModeGuard::panic_on_error();
        let mut arena = Arena::new(512).unwrap();
        arena.allocate(64, 8).unwrap();

        {
            let mut scope = arena.scope();
            scope.allocate(32, 8).unwrap();
            scope.reset();
            scope.allocate(16, 8).unwrap();
        }

        // The scope's mark died with the reset, so drop leaves the cursor.
        assert_eq!(arena.allocated(), 16);
    }

    #[test]
    fn test_nested_scopes() {
        let mut arena = Arena::new(512).unwrap();

        let mut outer = arena.scope();
        outer.allocate(32, 8).unwrap();
        {
            let mut inner = outer.scope();
            inner.allocate(32, 8).unwrap();
            assert_eq!(inner.allocated(), 64);
        }
        assert_eq!(outer.allocated(), 32);
        drop(outer);

        assert_eq!(arena.allocated(), 0);
    }
}
