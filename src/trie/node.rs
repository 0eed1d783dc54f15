//! Trie node and the incremental mutation protocol.
//!
//! A node's `stat` is the value its parent ranked it under. When a mutation
//! changes a node's aggregate, the new value is parked in `pending` and the
//! parent commits it while repositioning the node in its
//! [`SortedChildIndex`]: remove under the old stat, commit, reinsert. This
//! keeps ranked membership in step with the committed stat and touches each
//! ancestor exactly once per call.
//!
//! Ownership is one-directional (parent owns children). Upward propagation
//! travels through the return path of [`PriorityTrieNode::modify`].

use std::collections::HashMap;

use super::{render_path, stat_of, Frequency, Segment, SortedChildIndex, Stat};
use crate::error::{IndexError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorityTrieNode {
    pub(crate) terminal: Option<Frequency>,
    pub(crate) children: HashMap<Segment, PriorityTrieNode>,
    pub(crate) ranked: SortedChildIndex,
    /// Committed aggregate; the key this node is ranked under in its parent.
    pub(crate) stat: Stat,
    /// Recomputed aggregate not yet committed by the parent.
    pub(crate) pending: Option<Stat>,
}

impl PriorityTrieNode {
    /// Empty root.
    pub fn new() -> Self {
        Self::default()
    }

    /// Terminal-only node, already clean.
    pub(crate) fn leaf(frequency: Frequency) -> Self {
        Self {
            terminal: Some(frequency),
            stat: stat_of(Some(frequency)),
            ..Self::default()
        }
    }

    pub fn stat(&self) -> Stat {
        self.stat
    }

    pub fn terminal(&self) -> Option<Frequency> {
        self.terminal
    }

    pub fn is_dirty(&self) -> bool {
        self.pending.is_some()
    }

    /// Neither children nor a terminal; such a node must be pruned.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.terminal.is_none()
    }

    pub fn child(&self, segment: &Segment) -> Option<&PriorityTrieNode> {
        self.children.get(segment)
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Walk `path` from this node.
    pub fn descend<'a, I>(&self, path: I) -> Option<&PriorityTrieNode>
    where
        I: IntoIterator<Item = &'a Segment>,
    {
        path.into_iter().try_fold(self, |node, segment| node.child(segment))
    }

    /// Children best-first, paired with their labels.
    pub fn ranked_children(&self) -> impl Iterator<Item = (&Segment, &PriorityTrieNode)> + '_ {
        self.ranked
            .iter()
            .filter_map(move |(_, segment)| self.children.get(segment).map(|c| (segment, c)))
    }

    /// Number of terminals in this subtree. O(subtree).
    pub fn count_terminals(&self) -> usize {
        usize::from(self.terminal.is_some())
            + self.children.values().map(|c| c.count_terminals()).sum::<usize>()
    }

    /// Fold own terminal with the direct children's committed stats.
    ///
    /// O(log branching): the ranked index already holds every child's
    /// committed stat, best first. Correct only while all children are clean.
    pub(crate) fn recompute_stat(&self) -> Stat {
        let own = stat_of(self.terminal);
        match self.ranked.best() {
            Some(best) => own.min(best),
            None => own,
        }
    }

    /// Adopt the pending stat, if any. Returns the committed stat.
    pub(crate) fn commit(&mut self) -> Stat {
        if let Some(stat) = self.pending.take() {
            self.stat = stat;
        }
        self.stat
    }

    /// Apply `update` to the terminal at the end of `path`, creating missing
    /// nodes on the way down and pruning emptied ones on the way back up.
    ///
    /// `update` sees `None` for "no entry". Returns whether the terminal, the
    /// shape of the tree, or this node's stat changed. On return this node may
    /// carry a pending stat; the caller (its parent, or the index for the
    /// root) commits it.
    pub fn modify<F>(&mut self, path: &[Segment], update: &mut F) -> bool
    where
        F: FnMut(Option<Frequency>) -> Option<Frequency>,
    {
        let mut changed = false;

        let new_stat = match path.split_first() {
            None => {
                let previous = self.terminal;
                self.terminal = update(previous);
                changed = previous != self.terminal;
                self.recompute_stat()
            }
            Some((segment, rest)) => {
                let child = self.children.entry(segment.clone()).or_default();
                let ranked_stat = child.stat;
                changed |= child.modify(rest, update);

                if child.is_empty() {
                    // Detach before re-deriving our own stat.
                    self.children.remove(segment);
                    if self.ranked.remove(ranked_stat, segment) {
                        changed = true;
                    }
                    if ranked_stat == self.stat {
                        self.recompute_stat()
                    } else {
                        self.stat
                    }
                } else {
                    let child_stat = child.commit();
                    self.ranked.remove(ranked_stat, segment);
                    self.ranked.insert(child_stat, segment.clone());

                    if child_stat <= self.stat {
                        child_stat
                    } else if ranked_stat == self.stat {
                        // The child that held our best just got worse.
                        self.recompute_stat()
                    } else {
                        self.stat
                    }
                }
            }
        };

        if new_stat != self.stat {
            self.pending = Some(new_stat);
            changed = true;
        }
        changed
    }

    /// Check every invariant of this subtree against a from-scratch
    /// recomputation. Returns the true stat of the subtree.
    pub fn validate(&self) -> Result<Stat> {
        let mut path = Vec::new();
        self.validate_at(&mut path)
    }

    fn validate_at(&self, path: &mut Vec<Segment>) -> Result<Stat> {
        let fail = |path: &[Segment], reason: String| IndexError::Invariant {
            path: render_path(path),
            reason,
        };

        if self.pending.is_some() {
            return Err(fail(path, "uncommitted pending stat".to_string()));
        }
        if self.ranked.len() != self.children.len() {
            return Err(fail(
                path,
                format!(
                    "{} children but {} ranked entries",
                    self.children.len(),
                    self.ranked.len()
                ),
            ));
        }

        let mut truth = stat_of(self.terminal);
        for (segment, child) in &self.children {
            path.push(segment.clone());
            if child.is_empty() {
                return Err(fail(path, "dead leaf".to_string()));
            }
            let child_truth = child.validate_at(path)?;
            path.pop();

            if !self.ranked.contains(child.stat, segment) {
                return Err(fail(
                    path,
                    format!("child {} not ranked under its stat {}", segment, child.stat),
                ));
            }
            truth = truth.min(child_truth);
        }

        if truth != self.stat {
            return Err(fail(
                path,
                format!("cached stat {} but subtree max gives {}", self.stat, truth),
            ));
        }
        Ok(truth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::entry_path;

    fn put(root: &mut PriorityTrieNode, code: &str, name: &str, freq: Frequency) -> bool {
        let changed = root.modify(&entry_path(code, name), &mut |_| Some(freq));
        root.commit();
        changed
    }

    fn clear(root: &mut PriorityTrieNode, code: &str, name: &str) -> bool {
        let changed = root.modify(&entry_path(code, name), &mut |_| None);
        root.commit();
        changed
    }

    #[test]
    fn test_insert_sets_stats_along_path() {
        let mut root = PriorityTrieNode::new();
        assert!(put(&mut root, "ab", "x", 7));

        assert_eq!(root.stat(), -7);
        let a = root.child(&Segment::Code('a')).unwrap();
        assert_eq!(a.stat(), -7);
        assert!(!a.is_dirty());
        root.validate().unwrap();
    }

    #[test]
    fn test_children_follow_priority() {
        let mut root = PriorityTrieNode::new();
        put(&mut root, "a", "low", 1);
        put(&mut root, "b", "high", 9);
        put(&mut root, "c", "mid", 5);

        let order: Vec<&Segment> = root.ranked_children().map(|(s, _)| s).collect();
        assert_eq!(
            order,
            vec![&Segment::Code('b'), &Segment::Code('c'), &Segment::Code('a')]
        );
        root.validate().unwrap();
    }

    #[test]
    fn test_lowering_best_frequency_recomputes_parent() {
        let mut root = PriorityTrieNode::new();
        put(&mut root, "a", "x", 100);
        put(&mut root, "a", "y", 40);
        assert_eq!(root.stat(), -100);

        put(&mut root, "a", "x", 10);
        assert_eq!(root.stat(), -40);
        root.validate().unwrap();
    }

    #[test]
    fn test_remove_prunes_whole_branch() {
        let mut root = PriorityTrieNode::new();
        put(&mut root, "hao", "好", 100);
        put(&mut root, "he", "和", 10);

        assert!(clear(&mut root, "hao", "好"));
        let h = root.child(&Segment::Code('h')).unwrap();
        assert!(h.child(&Segment::Code('a')).is_none());
        assert_eq!(root.stat(), -10);
        root.validate().unwrap();

        assert!(clear(&mut root, "he", "和"));
        assert_eq!(root.child_count(), 0);
        assert_eq!(root.stat(), 0);
        root.validate().unwrap();
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut root = PriorityTrieNode::new();
        put(&mut root, "ni", "你", 3);
        let before = root.clone();

        assert!(!clear(&mut root, "nihao", "你好"));
        assert!(!clear(&mut root, "ni", "泥"));
        assert_eq!(root, before);
        root.validate().unwrap();
    }

    #[test]
    fn test_overwrite_same_value_reports_no_change() {
        let mut root = PriorityTrieNode::new();
        put(&mut root, "wo", "我", 12);
        assert!(!put(&mut root, "wo", "我", 12));
    }

    #[test]
    fn test_validate_detects_stale_stat() {
        let mut root = PriorityTrieNode::new();
        put(&mut root, "a", "x", 5);
        root.stat = -99;

        let err = root.validate().unwrap_err();
        assert!(matches!(err, IndexError::Invariant { .. }));
    }

    #[test]
    fn test_count_terminals() {
        let mut root = PriorityTrieNode::new();
        put(&mut root, "a", "x", 1);
        put(&mut root, "a", "y", 2);
        put(&mut root, "ab", "z", 3);
        assert_eq!(root.count_terminals(), 3);
    }
}
