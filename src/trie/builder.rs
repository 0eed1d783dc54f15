//! One-pass trie construction from a full record dump.
//!
//! Records are partitioned by their next code symbol; records whose code is
//! exhausted become `Name` leaves. Each partition is built recursively, then
//! the finished children are sorted by stat once and bulk-loaded into the
//! node's [`SortedChildIndex`]. No node is ever repositioned, so this is the
//! cheap path for (re)initialising the whole index. Single incremental
//! changes go through [`PriorityTrieNode::modify`] instead.

use std::collections::HashMap;

use super::{Frequency, PriorityTrieNode, Segment, SortedChildIndex, Stat};
use crate::record::Record;

struct Staged {
    symbols: Vec<char>,
    name: String,
    frequency: Frequency,
}

/// Build a clean trie (no pending stats) holding every record.
///
/// A repeated `(code, name)` pair keeps the frequency of its last occurrence.
///
/// Complexity: O(N * L) to partition plus O(K log K) per node to order its K
/// children, where L is the code length.
pub fn build_trie<I>(records: I) -> PriorityTrieNode
where
    I: IntoIterator<Item = Record>,
{
    let staged: Vec<Staged> = records
        .into_iter()
        .map(|r| Staged {
            symbols: r.code.chars().collect(),
            name: r.name,
            frequency: r.frequency,
        })
        .collect();
    build_level(staged, 0)
}

fn build_level(staged: Vec<Staged>, depth: usize) -> PriorityTrieNode {
    let mut terminals: HashMap<String, Frequency> = HashMap::new();
    let mut groups: HashMap<char, Vec<Staged>> = HashMap::new();

    for entry in staged {
        match entry.symbols.get(depth) {
            None => {
                terminals.insert(entry.name, entry.frequency);
            }
            Some(&symbol) => groups.entry(symbol).or_default().push(entry),
        }
    }

    let mut built: Vec<(Stat, Segment, PriorityTrieNode)> =
        Vec::with_capacity(terminals.len() + groups.len());

    for (name, frequency) in terminals {
        let leaf = PriorityTrieNode::leaf(frequency);
        built.push((leaf.stat, Segment::Name(name), leaf));
    }
    for (symbol, group) in groups {
        let child = build_level(group, depth + 1);
        built.push((child.stat, Segment::Code(symbol), child));
    }

    built.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));

    let mut order = Vec::with_capacity(built.len());
    let mut children = HashMap::with_capacity(built.len());
    for (stat, segment, child) in built {
        order.push((stat, segment.clone()));
        children.insert(segment, child);
    }

    let stat = order.first().map_or(0, |(best, _)| (*best).min(0));
    PriorityTrieNode {
        terminal: None,
        children,
        ranked: SortedChildIndex::from_sorted(order),
        stat,
        pending: None,
    }
}
