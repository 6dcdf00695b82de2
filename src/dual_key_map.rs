//! DualKeyMap: public API addressing entries by (primary, secondary) or by
//! primary alone.

use crate::entry_table::EntryTable;
use crate::error::{DualKeyError, Result};
use crate::iter::{Iter, PrimaryKeys, PrimaryPairs, Values};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use log::trace;
use std::collections::hash_map::RandomState;

/// A map keyed by a unique `(primary, secondary)` pair that can also be
/// queried by the primary key alone.
///
/// Entries keep their insertion order. A primary-only operation acts on the
/// *first* entry with that primary: the earliest-inserted one still present.
/// Removing it promotes the next sibling.
///
/// ```
/// use dual_key_map::DualKeyMap;
///
/// let mut m: DualKeyMap<u32, String, &str> = DualKeyMap::new();
/// m.insert(1, "asd".to_string(), "gosho").unwrap();
/// m.insert(1, "bsd".to_string(), "pesho").unwrap();
///
/// assert_eq!(m.get_by_primary(&1), Ok(&"gosho"));
/// assert_eq!(m.get(&1, "bsd"), Ok(&"pesho"));
///
/// assert!(m.remove_by_primary(&1));
/// assert_eq!(m.get_by_primary(&1), Ok(&"pesho"));
/// ```
///
/// Entries inserted through [`insert_primary`](Self::insert_primary) take the
/// map's default secondary key, `S::default()` unless one was supplied with
/// [`with_default_secondary`](Self::with_default_secondary).
pub struct DualKeyMap<P, S, V, H = RandomState> {
    table: EntryTable<P, S, V, H>,
    default_secondary: S,
}

impl<P, S, V> DualKeyMap<P, S, V>
where
    P: Eq + Hash,
    S: Eq + Hash,
{
    /// Creates an empty map whose default secondary key is `S::default()`.
    pub fn new() -> Self
    where
        S: Default,
    {
        Self::with_default_secondary(S::default())
    }

    /// Like [`new`](Self::new), with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self
    where
        S: Default,
    {
        Self::with_capacity_and_hasher(capacity, RandomState::new())
    }

    /// Creates an empty map whose primary-only inserts use `default_secondary`.
    pub fn with_default_secondary(default_secondary: S) -> Self {
        Self::with_default_secondary_and_hasher(default_secondary, RandomState::new())
    }
}

impl<P, S, V, H> DualKeyMap<P, S, V, H> {
    /// Number of entries.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    /// Number of distinct primary keys.
    pub fn primary_len(&self) -> usize {
        self.table.primary_len()
    }

    /// Secondary key given to entries inserted with only a primary key.
    pub fn default_secondary(&self) -> &S {
        &self.default_secondary
    }

    /// The map's `BuildHasher`.
    pub fn hasher(&self) -> &H {
        self.table.hasher()
    }

    /// All entries as `(&P, &S, &V)` in insertion order.
    pub fn iter(&self) -> Iter<'_, P, S, V> {
        Iter {
            walk: self.table.walk(),
        }
    }

    /// One `(&P, &V)` pair per entry, in insertion order. Entries that share a
    /// primary key each yield their own pair.
    pub fn iter_by_primary(&self) -> PrimaryPairs<'_, P, S, V> {
        PrimaryPairs {
            walk: self.table.walk(),
        }
    }

    /// Every stored value, in insertion order.
    pub fn values(&self) -> Values<'_, P, S, V> {
        Values {
            walk: self.table.walk(),
        }
    }

    /// The distinct primary keys, ordered by their current first entry.
    pub fn primary_keys(&self) -> PrimaryKeys<'_, P, S, V> {
        PrimaryKeys {
            walk: self.table.walk(),
            remaining: self.table.primary_len(),
        }
    }

    /// Removes every entry. The default secondary key is kept.
    pub fn clear(&mut self) {
        self.table.clear();
    }
}

impl<P, S, V, H> DualKeyMap<P, S, V, H>
where
    P: Eq + Hash,
    S: Eq + Hash,
    H: BuildHasher,
{
    pub fn with_hasher(hasher: H) -> Self
    where
        S: Default,
    {
        Self::with_default_secondary_and_hasher(S::default(), hasher)
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: H) -> Self
    where
        S: Default,
    {
        Self {
            table: EntryTable::with_capacity_and_hasher(capacity, hasher),
            default_secondary: S::default(),
        }
    }

    pub fn with_default_secondary_and_hasher(default_secondary: S, hasher: H) -> Self {
        Self {
            table: EntryTable::with_hasher(hasher),
            default_secondary,
        }
    }

    /// Inserts `value` under `(primary, secondary)`.
    ///
    /// Fails with [`DualKeyError::DuplicateKey`] if the pair is already
    /// present; the map is left unchanged and `value` is dropped. Entries
    /// sharing `primary` under other secondary keys are not affected.
    pub fn insert(&mut self, primary: P, secondary: S, value: V) -> Result<()> {
        match self.table.insert(primary, secondary, value) {
            Ok(_) => Ok(()),
            Err(err) => {
                trace!("dual-key map: rejected insert, composite key already present");
                Err(err)
            }
        }
    }

    /// Inserts `value` under `(primary, default_secondary)`.
    pub fn insert_primary(&mut self, primary: P, value: V) -> Result<()>
    where
        S: Clone,
    {
        let secondary = self.default_secondary.clone();
        self.insert(primary, secondary, value)
    }

    /// Inserts or overwrites. An existing entry keeps its position and its
    /// previous value is returned.
    pub fn replace(&mut self, primary: P, secondary: S, value: V) -> Option<V> {
        self.table.replace(primary, secondary, value).1
    }

    /// Value stored under exactly `(primary, secondary)`.
    pub fn get<QP, QS>(&self, primary: &QP, secondary: &QS) -> Result<&V>
    where
        P: Borrow<QP>,
        S: Borrow<QS>,
        QP: ?Sized + Hash + Eq,
        QS: ?Sized + Hash + Eq,
    {
        self.try_get(primary, secondary)
            .ok_or(DualKeyError::KeyNotFound)
    }

    /// Value of the first entry with `primary`.
    pub fn get_by_primary<QP>(&self, primary: &QP) -> Result<&V>
    where
        P: Borrow<QP>,
        QP: ?Sized + Hash + Eq,
    {
        self.try_get_by_primary(primary)
            .ok_or(DualKeyError::KeyNotFound)
    }

    /// Non-failing form of [`get`](Self::get).
    pub fn try_get<QP, QS>(&self, primary: &QP, secondary: &QS) -> Option<&V>
    where
        P: Borrow<QP>,
        S: Borrow<QS>,
        QP: ?Sized + Hash + Eq,
        QS: ?Sized + Hash + Eq,
    {
        let id = self.table.find(primary, secondary)?;
        self.table.get(id).map(|(_, _, v)| v)
    }

    /// Non-failing form of [`get_by_primary`](Self::get_by_primary).
    pub fn try_get_by_primary<QP>(&self, primary: &QP) -> Option<&V>
    where
        P: Borrow<QP>,
        QP: ?Sized + Hash + Eq,
    {
        let id = self.table.find_first(primary)?;
        self.table.get(id).map(|(_, _, v)| v)
    }

    /// Like [`try_get_by_primary`](Self::try_get_by_primary), but also returns
    /// the keys of the entry that was selected.
    pub fn first_entry<QP>(&self, primary: &QP) -> Option<(&P, &S, &V)>
    where
        P: Borrow<QP>,
        QP: ?Sized + Hash + Eq,
    {
        let id = self.table.find_first(primary)?;
        self.table.get(id)
    }

    /// Mutable access to the value under exactly `(primary, secondary)`.
    pub fn get_mut<QP, QS>(&mut self, primary: &QP, secondary: &QS) -> Option<&mut V>
    where
        P: Borrow<QP>,
        S: Borrow<QS>,
        QP: ?Sized + Hash + Eq,
        QS: ?Sized + Hash + Eq,
    {
        let id = self.table.find(primary, secondary)?;
        self.table.value_mut(id)
    }

    /// Mutable access to the value of the first entry with `primary`.
    pub fn get_by_primary_mut<QP>(&mut self, primary: &QP) -> Option<&mut V>
    where
        P: Borrow<QP>,
        QP: ?Sized + Hash + Eq,
    {
        let id = self.table.find_first(primary)?;
        self.table.value_mut(id)
    }

    /// Whether an entry is stored under exactly `(primary, secondary)`.
    pub fn contains_key<QP, QS>(&self, primary: &QP, secondary: &QS) -> bool
    where
        P: Borrow<QP>,
        S: Borrow<QS>,
        QP: ?Sized + Hash + Eq,
        QS: ?Sized + Hash + Eq,
    {
        self.table.find(primary, secondary).is_some()
    }

    /// Whether any entry has `primary`.
    pub fn contains_primary<QP>(&self, primary: &QP) -> bool
    where
        P: Borrow<QP>,
        QP: ?Sized + Hash + Eq,
    {
        self.table.find_first(primary).is_some()
    }

    /// Whether the first entry with `primary` holds `value`. Later siblings
    /// are not consulted.
    pub fn contains_primary_value<QP>(&self, primary: &QP, value: &V) -> bool
    where
        P: Borrow<QP>,
        QP: ?Sized + Hash + Eq,
        V: PartialEq,
    {
        self.try_get_by_primary(primary)
            .map(|v| v == value)
            .unwrap_or(false)
    }

    /// Number of entries sharing `primary`.
    pub fn primary_count<QP>(&self, primary: &QP) -> usize
    where
        P: Borrow<QP>,
        QP: ?Sized + Hash + Eq,
    {
        self.table.primary_count(primary)
    }

    /// Removes the entry under `(primary, secondary)`. Returns whether one
    /// was removed.
    pub fn remove<QP, QS>(&mut self, primary: &QP, secondary: &QS) -> bool
    where
        P: Borrow<QP>,
        S: Borrow<QS>,
        QP: ?Sized + Hash + Eq,
        QS: ?Sized + Hash + Eq,
    {
        self.remove_entry(primary, secondary).is_ok()
    }

    /// Removes only the first entry with `primary`; its siblings stay.
    /// Returns whether one was removed.
    pub fn remove_by_primary<QP>(&mut self, primary: &QP) -> bool
    where
        P: Borrow<QP>,
        QP: ?Sized + Hash + Eq,
    {
        self.remove_entry_by_primary(primary).is_ok()
    }

    /// Removes the entry under `(primary, secondary)` and returns it.
    pub fn remove_entry<QP, QS>(&mut self, primary: &QP, secondary: &QS) -> Result<(P, S, V)>
    where
        P: Borrow<QP>,
        S: Borrow<QS>,
        QP: ?Sized + Hash + Eq,
        QS: ?Sized + Hash + Eq,
    {
        let id = self
            .table
            .find(primary, secondary)
            .ok_or(DualKeyError::KeyNotFound)?;
        self.table.remove(id).ok_or(DualKeyError::KeyNotFound)
    }

    /// Removes the first entry with `primary` and returns it.
    pub fn remove_entry_by_primary<QP>(&mut self, primary: &QP) -> Result<(P, S, V)>
    where
        P: Borrow<QP>,
        QP: ?Sized + Hash + Eq,
    {
        let id = self
            .table
            .find_first(primary)
            .ok_or(DualKeyError::KeyNotFound)?;
        let removed = self.table.remove(id).ok_or(DualKeyError::KeyNotFound)?;
        if log::log_enabled!(log::Level::Trace) {
            trace!(
                "dual-key map: removed first entry of a primary group, {} sibling(s) left",
                self.table.primary_count(primary)
            );
        }
        Ok(removed)
    }
}

impl<P, S, V, H> Default for DualKeyMap<P, S, V, H>
where
    P: Eq + Hash,
    S: Eq + Hash + Default,
    H: BuildHasher + Default,
{
    fn default() -> Self {
        Self::with_hasher(H::default())
    }
}

impl<P, S, V, H> Clone for DualKeyMap<P, S, V, H>
where
    P: Clone,
    S: Clone,
    V: Clone,
    H: Clone,
{
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            default_secondary: self.default_secondary.clone(),
        }
    }
}

impl<P, S, V, H> fmt::Debug for DualKeyMap<P, S, V, H>
where
    P: fmt::Debug,
    S: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(p, s, v)| ((p, s), v)))
            .finish()
    }
}

impl<'a, P, S, V, H> IntoIterator for &'a DualKeyMap<P, S, V, H> {
    type Item = (&'a P, &'a S, &'a V);
    type IntoIter = Iter<'a, P, S, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
