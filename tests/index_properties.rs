//! Property-based tests for the mutable index.
//!
//! Differential testing against a `BTreeMap` model and the naive store scan:
//! - every sequence of inserts and removes leaves the trie valid
//! - queries return exactly the matching entries, by non-increasing frequency
//! - a trie built incrementally equals one bulk-built from the same entries

use std::collections::BTreeMap;
use std::time::Duration;

use imtrie::trie::build_trie;
use imtrie::{MemoryStore, MutableIndex, Record, RecordStore};
use proptest::prelude::*;

const PERIOD: Duration = Duration::from_secs(3600);

// ============================================================================
//  Strategies
// ============================================================================

/// Short codes over a tiny alphabet so prefixes overlap heavily.
fn code() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(vec!['a', 'b', 'c']), 1..=4)
        .prop_map(|chars| chars.into_iter().collect())
}

fn prefix() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(vec!['a', 'b', 'c']), 0..=3)
        .prop_map(|chars| chars.into_iter().collect())
}

fn name() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["x", "y", "好", "好耶"]).prop_map(|s| s.to_string())
}

/// Small frequencies so ties are common.
fn frequency() -> impl Strategy<Value = u32> {
    0u32..20
}

#[derive(Debug, Clone)]
enum Op {
    Insert(String, String, u32),
    Remove(String, String),
}

fn operations(max_ops: usize) -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        prop_oneof![
            3 => (code(), name(), frequency()).prop_map(|(c, n, f)| Op::Insert(c, n, f)),
            2 => (code(), name()).prop_map(|(c, n)| Op::Remove(c, n)),
        ],
        0..=max_ops,
    )
}

// ============================================================================
//  Helpers
// ============================================================================

type Model = BTreeMap<(String, String), u32>;

fn apply(index: &mut MutableIndex, model: &mut Model, op: &Op) {
    match op {
        Op::Insert(code, name, freq) => {
            index.insert(code, name, *freq).unwrap();
            model.insert((code.clone(), name.clone()), *freq);
        }
        Op::Remove(code, name) => {
            let existed = model.remove(&(code.clone(), name.clone())).is_some();
            let pending = index.pending_mutations();
            index.remove(code, name).unwrap();
            let logged = index.pending_mutations() - pending;
            assert_eq!(logged, usize::from(existed), "remove logged iff present");
        }
    }
}

fn records(model: &Model) -> Vec<Record> {
    model
        .iter()
        .map(|((code, name), freq)| Record::new(code.as_str(), name.as_str(), *freq))
        .collect()
}

// ============================================================================
//  Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Invariants hold after every single mutation.
    #[test]
    fn invariants_hold_after_each_op(ops in operations(60)) {
        let mut index = MutableIndex::new(PERIOD);
        let mut model = Model::new();

        for op in &ops {
            apply(&mut index, &mut model, op);
            prop_assert!(index.validate().is_ok(), "invalid after {:?}: {:?}", op, index.validate());
            prop_assert_eq!(index.len(), model.len());
        }
        for ((code, name), freq) in &model {
            prop_assert_eq!(index.get(code, name), Some(*freq));
        }
    }

    /// Unbounded queries return exactly the matching entries, best first.
    #[test]
    fn query_matches_naive_scan(ops in operations(60), prefix in prefix()) {
        let mut index = MutableIndex::new(PERIOD);
        let mut model = Model::new();
        for op in &ops {
            apply(&mut index, &mut model, op);
        }

        let hits = index.query(&prefix, usize::MAX);
        for pair in hits.windows(2) {
            prop_assert!(pair[0].frequency >= pair[1].frequency);
        }

        let mut got: Vec<(String, String, u32)> =
            hits.into_iter().map(|h| (h.code, h.name, h.frequency)).collect();
        got.sort();
        let expected: Vec<(String, String, u32)> = model
            .iter()
            .filter(|((code, _), _)| code.starts_with(&prefix))
            .map(|((code, name), freq)| (code.clone(), name.clone(), *freq))
            .collect();
        prop_assert_eq!(got, expected);
    }

    /// Bounded queries agree with the store scan up to tie order.
    #[test]
    fn bounded_query_agrees_with_store_scan(
        ops in operations(60),
        prefix in prefix(),
        limit in 1usize..8,
    ) {
        let mut index = MutableIndex::new(PERIOD);
        let mut model = Model::new();
        for op in &ops {
            apply(&mut index, &mut model, op);
        }
        let mut store = MemoryStore::with_records(records(&model));

        let hits = index.query(&prefix, limit);
        let scanned = store.scan_prefix(&prefix, limit).unwrap();

        let got: Vec<u32> = hits.iter().map(|h| h.frequency).collect();
        let expected: Vec<u32> = scanned.iter().map(|r| r.frequency).collect();
        prop_assert_eq!(got, expected);

        // Anything strictly better than the cutoff must be present in both.
        if let Some(cutoff) = scanned.last().map(|r| r.frequency) {
            let mut above_got: Vec<(&str, &str)> = hits
                .iter()
                .filter(|h| h.frequency > cutoff)
                .map(|h| (h.code.as_str(), h.name.as_str()))
                .collect();
            let mut above_expected: Vec<(&str, &str)> = scanned
                .iter()
                .filter(|r| r.frequency > cutoff)
                .map(|r| (r.code.as_str(), r.name.as_str()))
                .collect();
            above_got.sort();
            above_expected.sort();
            prop_assert_eq!(above_got, above_expected);
        }
    }

    /// Incremental mutation and bulk build reach the same tree.
    #[test]
    fn incremental_equals_rebuild(ops in operations(60)) {
        let mut index = MutableIndex::new(PERIOD);
        let mut model = Model::new();
        for op in &ops {
            apply(&mut index, &mut model, op);
        }

        let rebuilt = build_trie(records(&model));
        prop_assert_eq!(index.root(), &rebuilt);

        let from_records = MutableIndex::with_records(records(&model), PERIOD);
        for prefix in ["", "a", "b", "ab", "cc"] {
            prop_assert_eq!(index.query(prefix, usize::MAX), from_records.query(prefix, usize::MAX));
        }
    }

    /// Removing twice changes nothing the second time.
    #[test]
    fn remove_is_idempotent(ops in operations(30), code in code(), name in name()) {
        let mut index = MutableIndex::new(PERIOD);
        let mut model = Model::new();
        for op in &ops {
            apply(&mut index, &mut model, op);
        }

        index.remove(&code, &name).unwrap();
        let root = index.root().clone();
        let pending = index.pending_mutations();

        prop_assert!(!index.remove(&code, &name).unwrap());
        prop_assert_eq!(index.root(), &root);
        prop_assert_eq!(index.pending_mutations(), pending);
    }
}

// ============================================================================
//  Scenarios
// ============================================================================

#[test]
fn homophones_rank_by_frequency() {
    let mut index = MutableIndex::new(PERIOD);
    index.insert("shi", "是", 900).unwrap();
    index.insert("shi", "时", 400).unwrap();
    index.insert("shi", "事", 650).unwrap();
    index.insert("shijian", "时间", 500).unwrap();

    let names: Vec<String> = index.query("shi", 6).into_iter().map(|h| h.name).collect();
    assert_eq!(names, vec!["是", "事", "时间", "时"]);

    index.insert("shi", "时", 1000).unwrap();
    let names: Vec<String> = index.query("sh", 2).into_iter().map(|h| h.name).collect();
    assert_eq!(names, vec!["时", "是"]);
    index.validate().unwrap();
}

#[test]
fn name_never_matches_as_code() {
    let mut index = MutableIndex::new(PERIOD);
    index.insert("a", "b", 5).unwrap();

    assert!(index.query("ab", 6).is_empty());
    assert_eq!(index.query("a", 6).len(), 1);
}

#[test]
fn lazy_enumeration_stops_early() {
    let mut index = MutableIndex::new(PERIOD);
    for i in 0..500u32 {
        index.insert(&format!("k{}", i), "w", i).unwrap();
    }

    let top: Vec<u32> = index.completions("k").take(3).map(|h| h.frequency).collect();
    assert_eq!(top, vec![499, 498, 497]);
}
