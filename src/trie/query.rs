//! Lazy prefix enumeration in priority order.
//!
//! From the node spelled by the prefix, a frontier of subtrees is kept in a
//! min-heap keyed by each subtree's stat. Popping a subtree pushes its own
//! terminal (as a finished hit) and its ranked children; popping a hit
//! yields it. Because no descendant can beat its subtree's stat, hits come
//! out by non-increasing frequency, and work done is proportional to the
//! number of hits consumed rather than to the subtree size.
//!
//! A node's terminal is ordered after children with an equal stat and
//! before the first strictly worse one.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::{stat_of, Frequency, PriorityTrieNode, Segment, Stat};

/// One completion: full code, entry name and frequency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub code: String,
    pub name: String,
    pub frequency: Frequency,
}

enum Item<'a> {
    Subtree {
        node: &'a PriorityTrieNode,
        code: String,
        name: Option<&'a str>,
    },
    Hit(Hit),
}

struct Queued<'a> {
    stat: Stat,
    seq: u64,
    item: Item<'a>,
}

impl PartialEq for Queued<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.stat == other.stat && self.seq == other.seq
    }
}

impl Eq for Queued<'_> {}

impl PartialOrd for Queued<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued<'_> {
    // Reversed: BinaryHeap is a max-heap, we want lowest stat, then FIFO.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .stat
            .cmp(&self.stat)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Iterator over every entry under a prefix, best first.
///
/// Finite and lazy: taking the first N hits expands only the subtrees needed
/// to prove their order. Calling [`Completions::new`] again restarts.
pub struct Completions<'a> {
    frontier: BinaryHeap<Queued<'a>>,
    seq: u64,
}

impl<'a> Completions<'a> {
    /// Enumerate entries whose code starts with `prefix`. An absent prefix
    /// yields nothing.
    pub fn new(root: &'a PriorityTrieNode, prefix: &str) -> Self {
        let mut completions = Self {
            frontier: BinaryHeap::new(),
            seq: 0,
        };
        let path: Vec<Segment> = prefix.chars().map(Segment::Code).collect();
        if let Some(start) = root.descend(&path) {
            completions.push(
                start.stat(),
                Item::Subtree {
                    node: start,
                    code: prefix.to_string(),
                    name: None,
                },
            );
        }
        completions
    }

    fn push(&mut self, stat: Stat, item: Item<'a>) {
        self.frontier.push(Queued {
            stat,
            seq: self.seq,
            item,
        });
        self.seq += 1;
    }

    fn expand(&mut self, node: &'a PriorityTrieNode, code: String, name: Option<&'a str>) {
        for (segment, child) in node.ranked_children() {
            let item = match segment {
                Segment::Code(symbol) => {
                    let mut child_code = String::with_capacity(code.len() + symbol.len_utf8());
                    child_code.push_str(&code);
                    child_code.push(*symbol);
                    Item::Subtree {
                        node: child,
                        code: child_code,
                        name: None,
                    }
                }
                Segment::Name(child_name) => Item::Subtree {
                    node: child,
                    code: code.clone(),
                    name: Some(child_name.as_str()),
                },
            };
            self.push(child.stat(), item);
        }

        if let (Some(frequency), Some(name)) = (node.terminal(), name) {
            self.push(
                stat_of(Some(frequency)),
                Item::Hit(Hit {
                    code,
                    name: name.to_string(),
                    frequency,
                }),
            );
        }
    }
}

impl Iterator for Completions<'_> {
    type Item = Hit;

    fn next(&mut self) -> Option<Hit> {
        while let Some(Queued { item, .. }) = self.frontier.pop() {
            match item {
                Item::Hit(hit) => return Some(hit),
                Item::Subtree { node, code, name } => self.expand(node, code, name),
            }
        }
        None
    }
}
