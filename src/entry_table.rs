//! EntryTable: structural layer keyed by (primary, secondary) with an
//! order-preserving primary index.
//!
//! Storage is a `SlotMap` of entries. Two `HashTable`s index into it: one
//! over the composite key and one over primary groups. Every entry sits on
//! two intrusive doubly-linked lists threaded through the slots: the global
//! insertion order and the list of siblings sharing its primary key. A group
//! records the head and tail of its sibling list, so the "first entry" of a
//! primary is always the group head.

use crate::error::{DualKeyError, Result};
use crate::iter::Walk;
use crate::reentrancy::DebugReentrancy;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_table::{Entry as TableEntry, HashTable};
use slotmap::{DefaultKey, SlotMap};
use std::collections::hash_map::RandomState;

/// Stable handle to a live entry. Generational: a handle to a removed entry
/// never resolves to a later entry that reuses the slot.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct EntryId(DefaultKey);

impl EntryId {
    fn new(k: DefaultKey) -> Self {
        EntryId(k)
    }
    fn raw(&self) -> DefaultKey {
        self.0
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Links {
    pub(crate) prev: Option<DefaultKey>,
    pub(crate) next: Option<DefaultKey>,
}

#[derive(Clone, Debug)]
pub(crate) struct Slot<P, S, V> {
    pub(crate) primary: P,
    pub(crate) secondary: S,
    pub(crate) value: V,
    pair_hash: u64,
    primary_hash: u64,
    pub(crate) order: Links,
    pub(crate) sibling: Links,
}

fn order_links<P, S, V>(slot: &mut Slot<P, S, V>) -> &mut Links {
    &mut slot.order
}

fn sibling_links<P, S, V>(slot: &mut Slot<P, S, V>) -> &mut Links {
    &mut slot.sibling
}

/// All live entries sharing one primary key. `len` is never zero.
#[derive(Copy, Clone, Debug)]
struct Group {
    hash: u64,
    head: DefaultKey,
    tail: DefaultKey,
    len: usize,
}

#[derive(Copy, Clone, Debug, Default)]
struct Ends {
    head: Option<DefaultKey>,
    tail: Option<DefaultKey>,
}

type Slots<P, S, V> = SlotMap<DefaultKey, Slot<P, S, V>>;

pub(crate) struct EntryTable<P, S, V, H = RandomState> {
    hasher: H,
    pairs: HashTable<DefaultKey>,
    groups: HashTable<Group>,
    slots: Slots<P, S, V>,
    order: Ends,
    reentrancy: DebugReentrancy,
}

impl<P, S, V> EntryTable<P, S, V>
where
    P: Eq + Hash,
    S: Eq + Hash,
{
    #[cfg(test)]
    pub(crate) fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }
}

impl<P, S, V, H> EntryTable<P, S, V, H> {
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn primary_len(&self) -> usize {
        self.groups.len()
    }

    pub(crate) fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Walks live entries in insertion order.
    pub(crate) fn walk(&self) -> Walk<'_, P, S, V> {
        Walk::new(&self.slots, self.order.head, self.slots.len())
    }

    pub(crate) fn get(&self, id: EntryId) -> Option<(&P, &S, &V)> {
        let _g = self.reentrancy.enter();
        self.slots
            .get(id.raw())
            .map(|e| (&e.primary, &e.secondary, &e.value))
    }

    pub(crate) fn value_mut(&mut self, id: EntryId) -> Option<&mut V> {
        let _g = self.reentrancy.enter();
        self.slots.get_mut(id.raw()).map(|e| &mut e.value)
    }

    pub(crate) fn clear(&mut self) {
        let _g = self.reentrancy.enter();
        self.pairs.clear();
        self.groups.clear();
        self.order = Ends::default();
        // Entries drop last, once the indexes no longer point at them.
        self.slots.clear();
    }
}

impl<P, S, V, H> EntryTable<P, S, V, H>
where
    P: Eq + Hash,
    S: Eq + Hash,
    H: BuildHasher,
{
    pub(crate) fn with_hasher(hasher: H) -> Self {
        Self::with_capacity_and_hasher(0, hasher)
    }

    pub(crate) fn with_capacity_and_hasher(capacity: usize, hasher: H) -> Self {
        Self {
            hasher,
            pairs: HashTable::with_capacity(capacity),
            groups: HashTable::with_capacity(capacity),
            slots: SlotMap::with_capacity_and_key(capacity),
            order: Ends::default(),
            reentrancy: DebugReentrancy::new(),
        }
    }

    fn pair_hash<QP, QS>(&self, primary: &QP, secondary: &QS) -> u64
    where
        QP: ?Sized + Hash,
        QS: ?Sized + Hash,
    {
        self.hasher.hash_one((primary, secondary))
    }

    fn primary_hash<QP>(&self, primary: &QP) -> u64
    where
        QP: ?Sized + Hash,
    {
        self.hasher.hash_one(primary)
    }

    fn find_pair<QP, QS>(&self, primary: &QP, secondary: &QS) -> Option<DefaultKey>
    where
        P: Borrow<QP>,
        S: Borrow<QS>,
        QP: ?Sized + Hash + Eq,
        QS: ?Sized + Hash + Eq,
    {
        let hash = self.pair_hash(primary, secondary);
        self.pairs
            .find(hash, |&k| {
                self.slots
                    .get(k)
                    .map(|e| e.primary.borrow() == primary && e.secondary.borrow() == secondary)
                    .unwrap_or(false)
            })
            .copied()
    }

    fn find_group<QP>(&self, primary: &QP) -> Option<&Group>
    where
        P: Borrow<QP>,
        QP: ?Sized + Hash + Eq,
    {
        let hash = self.primary_hash(primary);
        self.groups.find(hash, |g| {
            self.slots
                .get(g.head)
                .map(|e| e.primary.borrow() == primary)
                .unwrap_or(false)
        })
    }

    /// Exact composite lookup.
    pub(crate) fn find<QP, QS>(&self, primary: &QP, secondary: &QS) -> Option<EntryId>
    where
        P: Borrow<QP>,
        S: Borrow<QS>,
        QP: ?Sized + Hash + Eq,
        QS: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        self.find_pair(primary, secondary).map(EntryId::new)
    }

    /// Earliest-inserted live entry with this primary key.
    pub(crate) fn find_first<QP>(&self, primary: &QP) -> Option<EntryId>
    where
        P: Borrow<QP>,
        QP: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        self.find_group(primary).map(|g| EntryId::new(g.head))
    }

    /// Number of live entries sharing this primary key.
    pub(crate) fn primary_count<QP>(&self, primary: &QP) -> usize
    where
        P: Borrow<QP>,
        QP: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        self.find_group(primary).map(|g| g.len).unwrap_or(0)
    }

    pub(crate) fn insert(&mut self, primary: P, secondary: S, value: V) -> Result<EntryId> {
        let _g = self.reentrancy.enter();
        let slot = self.new_slot(primary, secondary, value);
        link_new(
            &mut self.pairs,
            &mut self.groups,
            &mut self.slots,
            &mut self.order,
            slot,
        )
        .map(EntryId::new)
        .map_err(|_| DualKeyError::DuplicateKey)
    }

    /// Inserts, or swaps the value of an existing entry in place. The entry
    /// keeps its position in both lists.
    pub(crate) fn replace(&mut self, primary: P, secondary: S, value: V) -> (EntryId, Option<V>) {
        let _g = self.reentrancy.enter();
        let slot = self.new_slot(primary, secondary, value);
        match link_new(
            &mut self.pairs,
            &mut self.groups,
            &mut self.slots,
            &mut self.order,
            slot,
        ) {
            Ok(k) => (EntryId::new(k), None),
            Err((k, value)) => {
                let old = self
                    .slots
                    .get_mut(k)
                    .map(|e| core::mem::replace(&mut e.value, value));
                (EntryId::new(k), old)
            }
        }
    }

    fn new_slot(&self, primary: P, secondary: S, value: V) -> Slot<P, S, V> {
        let pair_hash = self.pair_hash(&primary, &secondary);
        let primary_hash = self.primary_hash(&primary);
        Slot {
            primary,
            secondary,
            value,
            pair_hash,
            primary_hash,
            order: Links::default(),
            sibling: Links::default(),
        }
    }

    pub(crate) fn remove(&mut self, id: EntryId) -> Option<(P, S, V)> {
        let _g = self.reentrancy.enter();
        let k = id.raw();
        let (pair_hash, primary_hash, order, sibling) = {
            let e = self.slots.get(k)?;
            (e.pair_hash, e.primary_hash, e.order, e.sibling)
        };

        match self.pairs.find_entry(pair_hash, |&kk| kk == k) {
            Ok(o) => {
                let _ = o.remove();
            }
            Err(_) => debug_assert!(false, "live slot missing from the pair index"),
        }

        let slots = &self.slots;
        match self
            .groups
            .find_entry(primary_hash, |g| same_primary(slots, g.head, k))
        {
            Ok(mut o) => {
                let group = o.get_mut();
                if group.len == 1 {
                    let _ = o.remove();
                } else {
                    group.len -= 1;
                    if group.head == k {
                        if let Some(next) = sibling.next {
                            group.head = next;
                        }
                    }
                    if group.tail == k {
                        if let Some(prev) = sibling.prev {
                            group.tail = prev;
                        }
                    }
                }
            }
            Err(_) => debug_assert!(false, "live slot missing from its primary group"),
        }

        detach(&mut self.slots, sibling, sibling_links);
        detach(&mut self.slots, order, order_links);
        if self.order.head == Some(k) {
            self.order.head = order.next;
        }
        if self.order.tail == Some(k) {
            self.order.tail = order.prev;
        }

        // Unlinked everywhere; dropping P/S/V may now run arbitrary code.
        self.slots
            .remove(k)
            .map(|e| (e.primary, e.secondary, e.value))
    }
}

impl<P, S, V, H> Clone for EntryTable<P, S, V, H>
where
    P: Clone,
    S: Clone,
    V: Clone,
    H: Clone,
{
    fn clone(&self) -> Self {
        // Slot keys survive a SlotMap clone, so the links stay valid.
        Self {
            hasher: self.hasher.clone(),
            pairs: self.pairs.clone(),
            groups: self.groups.clone(),
            slots: self.slots.clone(),
            order: self.order,
            reentrancy: DebugReentrancy::new(),
        }
    }
}

fn same_primary<P: Eq, S, V>(slots: &Slots<P, S, V>, a: DefaultKey, b: DefaultKey) -> bool {
    if a == b {
        return true;
    }
    match (slots.get(a), slots.get(b)) {
        (Some(x), Some(y)) => x.primary == y.primary,
        _ => false,
    }
}

/// Stores `slot` and links it at the tail of both lists. On a duplicate
/// composite key, hands back the existing slot and the rejected value; the
/// table is untouched.
fn link_new<P: Eq, S: Eq, V>(
    pairs: &mut HashTable<DefaultKey>,
    groups: &mut HashTable<Group>,
    slots: &mut Slots<P, S, V>,
    order: &mut Ends,
    slot: Slot<P, S, V>,
) -> core::result::Result<DefaultKey, (DefaultKey, V)> {
    let vacant = {
        let seen = &*slots;
        match pairs.entry(
            slot.pair_hash,
            |&k| {
                seen.get(k)
                    .map(|e| e.primary == slot.primary && e.secondary == slot.secondary)
                    .unwrap_or(false)
            },
            |&k| seen.get(k).map(|e| e.pair_hash).unwrap_or(0),
        ) {
            TableEntry::Occupied(o) => return Err((*o.get(), slot.value)),
            TableEntry::Vacant(v) => v,
        }
    };

    let primary_hash = slot.primary_hash;
    let k = slots.insert(slot);
    let _ = vacant.insert(k);

    append(slots, order.tail, k, order_links);
    if order.head.is_none() {
        order.head = Some(k);
    }
    order.tail = Some(k);

    join_group(groups, slots, k, primary_hash);
    Ok(k)
}

fn join_group<P: Eq, S, V>(
    groups: &mut HashTable<Group>,
    slots: &mut Slots<P, S, V>,
    k: DefaultKey,
    hash: u64,
) {
    let seen = &*slots;
    let tail = match groups.entry(hash, |g| same_primary(seen, g.head, k), |g| g.hash) {
        TableEntry::Occupied(mut o) => {
            let group = o.get_mut();
            let tail = group.tail;
            group.tail = k;
            group.len += 1;
            Some(tail)
        }
        TableEntry::Vacant(v) => {
            let _ = v.insert(Group {
                hash,
                head: k,
                tail: k,
                len: 1,
            });
            None
        }
    };
    append(slots, tail, k, sibling_links);
}

/// Links `k` after `tail` on the list selected by `links`.
fn append<P, S, V>(
    slots: &mut Slots<P, S, V>,
    tail: Option<DefaultKey>,
    k: DefaultKey,
    links: fn(&mut Slot<P, S, V>) -> &mut Links,
) {
    if let Some(t) = tail {
        if let Some(e) = slots.get_mut(t) {
            links(e).next = Some(k);
        }
    }
    if let Some(e) = slots.get_mut(k) {
        *links(e) = Links {
            prev: tail,
            next: None,
        };
    }
}

/// Bridges the neighbours of an entry whose links were `around`.
fn detach<P, S, V>(
    slots: &mut Slots<P, S, V>,
    around: Links,
    links: fn(&mut Slot<P, S, V>) -> &mut Links,
) {
    if let Some(p) = around.prev {
        if let Some(e) = slots.get_mut(p) {
            links(e).next = around.next;
        }
    }
    if let Some(n) = around.next {
        if let Some(e) = slots.get_mut(n) {
            links(e).prev = around.prev;
        }
    }
}
