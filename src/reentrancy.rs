//! Debug-only reentrancy guard for the entry table.
//!
//! `EntryTable` calls into user code (`P: Eq + Hash`, `S: Eq + Hash`) while
//! probing its indexes. Some of those probes happen between relinking steps,
//! when the order and sibling lists are not yet consistent. A key whose `Eq`
//! reaches back into the same table at that point would observe torn links,
//! so in debug builds every guarded method bumps a depth counter and a nested
//! entry panics. Release builds compile the guard away.

use core::cell::Cell;
use core::marker::PhantomData;

/// Per-table depth tracker. Guard a method with
/// `let _g = self.reentrancy.enter();`.
#[derive(Debug)]
pub(crate) struct DebugReentrancy {
    #[cfg(debug_assertions)]
    depth: Cell<u32>,
    // Same auto traits in every profile: Send, never Sync.
    _unsync: PhantomData<Cell<()>>,
}

impl DebugReentrancy {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            depth: Cell::new(0),
            _unsync: PhantomData,
        }
    }

    /// Mark the start of a guarded section. Panics in debug builds when a
    /// section is already open on this tracker.
    #[inline]
    pub(crate) fn enter(&self) -> ReentrancyGuard<'_> {
        #[cfg(debug_assertions)]
        {
            let depth = self.depth.get();
            assert!(
                depth == 0,
                "reentrancy detected: key Eq/Hash re-entered the dual-key map"
            );
            self.depth.set(depth + 1);
            ReentrancyGuard { owner: self }
        }

        #[cfg(not(debug_assertions))]
        {
            ReentrancyGuard { _owner: PhantomData }
        }
    }

    #[cfg(all(test, debug_assertions))]
    pub(crate) fn depth(&self) -> u32 {
        self.depth.get()
    }
}

impl Default for DebugReentrancy {
    fn default() -> Self {
        Self::new()
    }
}

/// Closes the section opened by [`DebugReentrancy::enter`] when dropped.
pub(crate) struct ReentrancyGuard<'a> {
    #[cfg(debug_assertions)]
    owner: &'a DebugReentrancy,
    #[cfg(not(debug_assertions))]
    _owner: PhantomData<&'a DebugReentrancy>,
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            let depth = self.owner.depth.get();
            debug_assert!(depth > 0, "guard dropped without a matching enter");
            self.owner.depth.set(depth - 1);
        }
    }
}
