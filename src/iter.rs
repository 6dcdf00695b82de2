//! Borrowing iterators over a `DualKeyMap`, all in enumeration
//! (insertion) order.

use crate::entry_table::Slot;
use core::iter::FusedIterator;
use slotmap::{DefaultKey, SlotMap};

/// Cursor along the global order list.
pub(crate) struct Walk<'a, P, S, V> {
    slots: &'a SlotMap<DefaultKey, Slot<P, S, V>>,
    next: Option<DefaultKey>,
    remaining: usize,
}

impl<'a, P, S, V> Walk<'a, P, S, V> {
    pub(crate) fn new(
        slots: &'a SlotMap<DefaultKey, Slot<P, S, V>>,
        head: Option<DefaultKey>,
        len: usize,
    ) -> Self {
        Self {
            slots,
            next: head,
            remaining: len,
        }
    }
}

impl<P, S, V> Clone for Walk<'_, P, S, V> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots,
            next: self.next,
            remaining: self.remaining,
        }
    }
}

impl<'a, P, S, V> Iterator for Walk<'a, P, S, V> {
    type Item = &'a Slot<P, S, V>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let k = self.next.take()?;
        let slot = self.slots.get(k)?;
        self.next = slot.order.next;
        self.remaining = self.remaining.saturating_sub(1);
        Some(slot)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<P, S, V> ExactSizeIterator for Walk<'_, P, S, V> {}
impl<P, S, V> FusedIterator for Walk<'_, P, S, V> {}

// Every public iterator is a projection of `Walk`.
macro_rules! projection {
    ($(#[$doc:meta])* $name:ident => $item:ty, |$slot:ident| $project:expr) => {
        $(#[$doc])*
        pub struct $name<'a, P, S, V> {
            pub(crate) walk: Walk<'a, P, S, V>,
        }

        impl<P, S, V> Clone for $name<'_, P, S, V> {
            fn clone(&self) -> Self {
                Self {
                    walk: self.walk.clone(),
                }
            }
        }

        impl<'a, P, S, V> Iterator for $name<'a, P, S, V> {
            type Item = $item;

            #[inline]
            fn next(&mut self) -> Option<Self::Item> {
                self.walk.next().map(|$slot| $project)
            }

            fn size_hint(&self) -> (usize, Option<usize>) {
                self.walk.size_hint()
            }
        }

        impl<P, S, V> ExactSizeIterator for $name<'_, P, S, V> {}
        impl<P, S, V> FusedIterator for $name<'_, P, S, V> {}
    };
}

projection! {
    /// Iterator over `(&P, &S, &V)` for every entry.
    Iter => (&'a P, &'a S, &'a V), |e| (&e.primary, &e.secondary, &e.value)
}

projection! {
    /// Iterator over every stored value.
    Values => &'a V, |e| &e.value
}

projection! {
    /// Iterator over `(&P, &V)`, one pair per entry. Entries sharing a
    /// primary key are not collapsed.
    PrimaryPairs => (&'a P, &'a V), |e| (&e.primary, &e.value)
}

/// Iterator over the distinct primary keys, ordered by each key's current
/// first entry.
pub struct PrimaryKeys<'a, P, S, V> {
    pub(crate) walk: Walk<'a, P, S, V>,
    pub(crate) remaining: usize,
}

impl<P, S, V> Clone for PrimaryKeys<'_, P, S, V> {
    fn clone(&self) -> Self {
        Self {
            walk: self.walk.clone(),
            remaining: self.remaining,
        }
    }
}

impl<'a, P, S, V> Iterator for PrimaryKeys<'a, P, S, V> {
    type Item = &'a P;

    fn next(&mut self) -> Option<Self::Item> {
        // Group heads are exactly the entries without an earlier sibling.
        let head = self.walk.find(|e| e.sibling.prev.is_none())?;
        self.remaining = self.remaining.saturating_sub(1);
        Some(&head.primary)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<P, S, V> ExactSizeIterator for PrimaryKeys<'_, P, S, V> {}
impl<P, S, V> FusedIterator for PrimaryKeys<'_, P, S, V> {}
