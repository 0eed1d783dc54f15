//! Per-node child ordering by priority statistic.
//!
//! Entries are `(stat, segment)` pairs. The segment is unique among the
//! children of one node, so it doubles as the identity handle: two children
//! with equal stats never collide, and removal by `(stat, segment)` always
//! targets exactly one child.

use std::collections::btree_set::{self, BTreeSet};

use super::{Segment, Stat};

/// Children of one node in ascending `stat` order (best first).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortedChildIndex {
    entries: BTreeSet<(Stat, Segment)>,
}

impl SortedChildIndex {
    pub fn new() -> Self {
        Self { entries: BTreeSet::new() }
    }

    /// Build from pairs already sorted ascending.
    ///
    /// `BTreeSet` bulk-loads sorted input without rebalancing, which is what
    /// the bulk builder relies on.
    pub fn from_sorted(sorted: Vec<(Stat, Segment)>) -> Self {
        debug_assert!(sorted.windows(2).all(|w| w[0] <= w[1]));
        Self { entries: sorted.into_iter().collect() }
    }

    /// O(log n). Equal stats are fine; ties are ordered by segment.
    pub fn insert(&mut self, stat: Stat, segment: Segment) {
        self.entries.insert((stat, segment));
    }

    /// Remove the child ranked under `stat`. Returns false if it was not
    /// ranked (a freshly created child, or one already detached).
    pub fn remove(&mut self, stat: Stat, segment: &Segment) -> bool {
        // BTreeSet::remove needs an owned key for tuple elements.
        self.entries.remove(&(stat, segment.clone()))
    }

    pub fn contains(&self, stat: Stat, segment: &Segment) -> bool {
        self.entries.contains(&(stat, segment.clone()))
    }

    /// Best (lowest) stat among ranked children.
    pub fn best(&self) -> Option<Stat> {
        self.entries.first().map(|(stat, _)| *stat)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_set::Iter<'_, (Stat, Segment)> {
        self.entries.iter()
    }
}
