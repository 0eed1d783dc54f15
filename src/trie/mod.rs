//! Dirty sorted trie: prefix trie with per-subtree priority aggregates.
//!
//! Every node caches `stat`, the negated maximum frequency found anywhere in
//! its subtree, and keeps its children ordered by that value. Ascending stat
//! is descending priority, so the best completion under any prefix is always
//! reachable through the first child of each node, and a merge-ordered walk
//! yields entries by non-increasing frequency without scanning the subtree.

pub mod builder;
pub mod node;
pub mod query;
pub mod ranked;

use std::fmt;

pub use builder::build_trie;
pub use node::PriorityTrieNode;
pub use query::{Completions, Hit};
pub use ranked::SortedChildIndex;

/// Entry frequency. Higher ranks first.
pub type Frequency = u32;

/// Negated maximum frequency over a subtree. `0` when nothing contributes.
pub type Stat = i64;

/// Sort key of a terminal value. Absent terminals contribute `0`, the worst
/// possible stat.
#[inline]
pub fn stat_of(frequency: Option<Frequency>) -> Stat {
    frequency.map_or(0, |f| -Stat::from(f))
}

/// Trie edge label.
///
/// Entry paths are the code symbols followed by one `Name` segment, so
/// homophones sharing a code land on distinct terminal nodes and a name can
/// never be mistaken for a code symbol during a prefix walk.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    Code(char),
    Name(String),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Code(c) => write!(f, "{}", c),
            Segment::Name(name) => write!(f, "[{}]", name),
        }
    }
}

/// Trie path for an entry: code symbols, then the name.
pub fn entry_path(code: &str, name: &str) -> Vec<Segment> {
    let mut path: Vec<Segment> = code.chars().map(Segment::Code).collect();
    path.push(Segment::Name(name.to_string()));
    path
}

pub(crate) fn render_path(path: &[Segment]) -> String {
    path.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_of() {
        assert_eq!(stat_of(None), 0);
        assert_eq!(stat_of(Some(0)), 0);
        assert_eq!(stat_of(Some(100)), -100);
        assert_eq!(stat_of(Some(u32::MAX)), -(u32::MAX as i64));
    }

    #[test]
    fn test_entry_path_appends_name() {
        let path = entry_path("hao", "好");
        assert_eq!(
            path,
            vec![
                Segment::Code('h'),
                Segment::Code('a'),
                Segment::Code('o'),
                Segment::Name("好".to_string()),
            ]
        );
        assert_eq!(render_path(&path), "hao[好]");
    }

    #[test]
    fn test_single_char_name_differs_from_code_symbol() {
        assert_ne!(Segment::Code('b'), Segment::Name("b".to_string()));
    }
}
