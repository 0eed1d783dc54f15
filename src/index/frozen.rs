//! Read-only completion index built once from a full record dump.

use crate::error::Result;
use crate::record::Record;
use crate::store::RecordStore;
use crate::trie::{build_trie, Completions, Hit, PriorityTrieNode};

/// Bulk-built trie that is never mutated after construction.
pub struct FrozenIndex {
    root: PriorityTrieNode,
    entries: usize,
}

impl FrozenIndex {
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = Record>,
    {
        let root = build_trie(records.into_iter().filter(|r| !r.code.is_empty()));
        let entries = root.count_terminals();
        Self { root, entries }
    }

    pub fn from_store(store: &mut dyn RecordStore) -> Result<Self> {
        let index = Self::from_records(store.fetch_all()?);
        tracing::info!(entries = index.entries, "frozen index built from store");
        Ok(index)
    }

    pub fn query(&self, prefix: &str, limit: usize) -> Vec<Hit> {
        Completions::new(&self.root, prefix).take(limit).collect()
    }

    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    pub fn root(&self) -> &PriorityTrieNode {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_carries_frequency() {
        let index = FrozenIndex::from_records(vec![
            Record::new("ni", "你", 80),
            Record::new("nihao", "你好", 90),
            Record::new("", "skip", 1),
        ]);

        assert_eq!(index.len(), 2);
        let hits = index.query("ni", 6);
        assert_eq!(hits[0], Hit { code: "nihao".into(), name: "你好".into(), frequency: 90 });
        assert_eq!(hits[1].frequency, 80);
        index.root().validate().unwrap();
    }
}
