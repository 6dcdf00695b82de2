//! dual-key-map: a single-threaded map whose entries are addressed by a
//! unique `(primary, secondary)` key pair, or by the primary key alone.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: keep "first entry with this primary" an O(1) average lookup
//!   with a deterministic answer, without giving up hash-map lookups on
//!   the full composite key.
//! - Layers:
//!   - EntryTable<P, S, V, H>: structural layer. Slot storage with stable
//!     generational ids, a composite-key index, a per-primary group index,
//!     and two intrusive linked lists (insertion order; siblings sharing a
//!     primary). Includes a debug-only reentrancy guard.
//!   - DualKeyMap<P, S, V, H>: public API. Adds the default secondary key,
//!     failing (`Result`) and non-failing (`Option`/`bool`) accessors, and
//!     trace logging.
//!
//! Ordering and tie-break
//! - Enumeration order is insertion order of live entries. Replacing a
//!   value in place does not move its entry.
//! - The first entry of a primary is its earliest-inserted live entry.
//!   Every primary-only operation acts on that entry;
//!   removing it promotes the next sibling.
//! - `primary_keys()` yields each distinct primary once, ordered by its
//!   current first entry.
//!
//! Constraints
//! - Composite keys are unique; duplicate inserts fail and leave the map
//!   unchanged.
//! - P and S need `Eq + Hash`. Lookups accept borrowed forms (`&str` for
//!   `String`) through `Borrow`.
//! - Each entry stores its composite and primary hashes; neither `Hash`
//!   impl runs again after insertion.
//! - `Send` when the contents are, never `Sync`. Mutation takes `&mut`.
//!
//! Reentrancy policy
//! - EntryTable methods call user code only through `Eq`/`Hash` while
//!   probing. A debug-only guard panics if that code re-enters the same
//!   table. Entries are unlinked from every index before their keys and
//!   values are dropped.
//!
//! Notes and non-goals
//! - No removal of a whole primary group in one call; `remove_by_primary`
//!   removes one entry at a time.
//! - No persistence, no thread-safety, no multi-key transactions.

mod dual_key_map;
mod entry_table;
#[cfg(test)]
mod entry_table_proptest;
mod error;
mod iter;
mod reentrancy;

// Public surface
pub use dual_key_map::DualKeyMap;
pub use error::{DualKeyError, Result};
pub use iter::{Iter, PrimaryKeys, PrimaryPairs, Values};
