// Property tests for EntryTable kept inside the crate so they can reach the
// structural layer directly.

use crate::entry_table::{EntryId, EntryTable};
use crate::error::DualKeyError;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hasher};

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Indices into small primary/secondary pools so that siblings are common and
// shrinking moves toward earlier keys.
#[derive(Clone, Debug)]
enum Op {
    Insert(usize, usize, i32),
    Replace(usize, usize, i32),
    Remove(usize, usize),
    RemoveFirst(usize),
    Find(usize, usize),
    FindFirst(usize),
    ContainsPrimary(String),
    Mutate(usize, usize, i32),
    Iterate,
}

type Scenario = (Vec<String>, Vec<String>, Vec<Op>);

fn arb_scenario() -> impl Strategy<Value = Scenario> {
    (
        proptest::collection::vec("[a-d]{1,2}", 1..=4),
        proptest::collection::vec("[x-z]{0,2}", 1..=3),
    )
        .prop_flat_map(|(prim, sec)| {
            let p = proptest::sample::select((0..prim.len()).collect::<Vec<_>>());
            let s = proptest::sample::select((0..sec.len()).collect::<Vec<_>>());
            let op = prop_oneof![
                (p.clone(), s.clone(), any::<i32>()).prop_map(|(p, s, v)| Op::Insert(p, s, v)),
                (p.clone(), s.clone(), any::<i32>()).prop_map(|(p, s, v)| Op::Replace(p, s, v)),
                (p.clone(), s.clone()).prop_map(|(p, s)| Op::Remove(p, s)),
                p.clone().prop_map(Op::RemoveFirst),
                (p.clone(), s.clone()).prop_map(|(p, s)| Op::Find(p, s)),
                p.clone().prop_map(Op::FindFirst),
                prop_oneof![
                    proptest::sample::select(prim.clone()),
                    "[a-d]{1,2}".prop_map(|s| s)
                ]
                .prop_map(Op::ContainsPrimary),
                (p.clone(), s.clone(), any::<i32>()).prop_map(|(p, s, d)| Op::Mutate(p, s, d)),
                Just(Op::Iterate),
            ];
            proptest::collection::vec(op, 1..80)
                .prop_map(move |ops| (prim.clone(), sec.clone(), ops))
        })
}

fn key(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn model_pos(model: &[(Key, Key, i32)], p: &Key, s: &Key) -> Option<usize> {
    model.iter().position(|(mp, ms, _)| mp == p && ms == s)
}

fn model_first(model: &[(Key, Key, i32)], p: &Key) -> Option<usize> {
    model.iter().position(|(mp, _, _)| mp == p)
}

// State-machine equivalence against an insertion-ordered Vec model.
// Invariants exercised after every operation:
// - Duplicate composite keys are rejected; unique ones get a stable id.
// - `find_first(p)` is the earliest surviving model entry with primary `p`.
// - Removal (exact or first-by-primary) returns the owned entry the model
//   predicts and leaves sibling order intact.
// - `walk` order equals model order; `len`/`primary_len` match the model.
// - Ids of removed entries never resolve again.
fn check_against_model<H: BuildHasher>(
    mut sut: EntryTable<Key, Key, i32, H>,
    (prim, sec, ops): Scenario,
) -> Result<(), TestCaseError> {
    let mut model: Vec<(Key, Key, i32)> = Vec::new();
    let mut live: HashMap<(Key, Key), EntryId> = HashMap::new();
    let mut stale: Vec<EntryId> = Vec::new();

    for op in ops {
        match op {
            Op::Insert(pi, si, v) => {
                let (p, s) = (key(&prim, pi), key(&sec, si));
                let already = model_pos(&model, &p, &s).is_some();
                match sut.insert(p.clone(), s.clone(), v) {
                    Ok(id) => {
                        prop_assert!(!already, "insert must fail on duplicate");
                        prop_assert!(live.insert((p.clone(), s.clone()), id).is_none());
                        model.push((p, s, v));
                    }
                    Err(DualKeyError::DuplicateKey) => {
                        prop_assert!(already, "duplicate error only when pair exists");
                    }
                    Err(other) => prop_assert!(false, "unexpected error {:?}", other),
                }
            }
            Op::Replace(pi, si, v) => {
                let (p, s) = (key(&prim, pi), key(&sec, si));
                let (id, old) = sut.replace(p.clone(), s.clone(), v);
                match model_pos(&model, &p, &s) {
                    Some(i) => {
                        prop_assert_eq!(old, Some(model[i].2));
                        prop_assert_eq!(live.get(&(p, s)), Some(&id));
                        model[i].2 = v;
                    }
                    None => {
                        prop_assert_eq!(old, None);
                        live.insert((p.clone(), s.clone()), id);
                        model.push((p, s, v));
                    }
                }
            }
            Op::Remove(pi, si) => {
                let (p, s) = (key(&prim, pi), key(&sec, si));
                match model_pos(&model, &p, &s) {
                    Some(i) => {
                        let id = sut.find(&p, &s).expect("present pair resolves");
                        let removed = sut.remove(id).expect("live id removes");
                        prop_assert_eq!(removed, model.remove(i));
                        live.remove(&(p, s));
                        stale.push(id);
                    }
                    None => prop_assert!(sut.find(&p, &s).is_none()),
                }
            }
            Op::RemoveFirst(pi) => {
                let p = key(&prim, pi);
                match (sut.find_first(&p), model_first(&model, &p)) {
                    (Some(id), Some(i)) => {
                        let removed = sut.remove(id).expect("live id removes");
                        let expected = model.remove(i);
                        prop_assert_eq!(&removed, &expected);
                        live.remove(&(expected.0, expected.1));
                        stale.push(id);
                    }
                    (None, None) => {}
                    (found, expected) => {
                        prop_assert!(false, "first mismatch: {:?} vs {:?}", found, expected)
                    }
                }
            }
            Op::Find(pi, si) => {
                let (p, s) = (key(&prim, pi), key(&sec, si));
                let found = sut.find(p.0.as_str(), s.0.as_str());
                prop_assert_eq!(found, live.get(&(p, s)).copied());
            }
            Op::FindFirst(pi) => {
                let p = key(&prim, pi);
                let found = sut.find_first(&p).and_then(|id| sut.get(id));
                let expected = model_first(&model, &p).map(|i| &model[i]);
                prop_assert_eq!(
                    found.map(|(p, s, v)| (p.clone(), s.clone(), *v)),
                    expected.cloned()
                );
                let count = model.iter().filter(|(mp, _, _)| *mp == p).count();
                prop_assert_eq!(sut.primary_count(&p), count);
            }
            Op::ContainsPrimary(q) => {
                let has = sut.find_first(q.as_str()).is_some();
                prop_assert_eq!(has, model.iter().any(|(p, _, _)| p.0 == q));
            }
            Op::Mutate(pi, si, d) => {
                let (p, s) = (key(&prim, pi), key(&sec, si));
                if let Some(&id) = live.get(&(p.clone(), s.clone())) {
                    let v = sut.value_mut(id).expect("live id resolves");
                    *v = v.saturating_add(d);
                    let i = model_pos(&model, &p, &s).expect("tracked in model");
                    model[i].2 = model[i].2.saturating_add(d);
                }
            }
            Op::Iterate => {
                let walked: Vec<_> = sut
                    .walk()
                    .map(|e| (e.primary.clone(), e.secondary.clone(), e.value))
                    .collect();
                prop_assert_eq!(&walked, &model);
            }
        }

        for &id in &stale {
            prop_assert!(sut.get(id).is_none(), "stale id must not resolve");
        }
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.walk().len(), model.len());
        let primaries: BTreeSet<_> = model.iter().map(|(p, _, _)| p.clone()).collect();
        prop_assert_eq!(sut.primary_len(), primaries.len());
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine(scenario in arb_scenario()) {
        check_against_model(EntryTable::new(), scenario)?;
    }
}

// Collision variant using a constant hasher to stress equality resolution.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Same state-machine invariants under worst-case collisions: every pair and
// every group shares one bucket, so only Eq tells entries and groups apart.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions(scenario in arb_scenario()) {
        check_against_model(EntryTable::with_hasher(ConstBuildHasher), scenario)?;
    }
}
