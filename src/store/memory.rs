//! Ephemeral in-memory store

use std::collections::BTreeMap;

use super::RecordStore;
use crate::error::Result;
use crate::record::Record;
use crate::trie::Frequency;

/// Table keyed by `(word, code)`. Contents are lost on drop.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    table: BTreeMap<(String, String), Frequency>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = Record>,
    {
        let table = records
            .into_iter()
            .map(|r| ((r.name, r.code), r.frequency))
            .collect();
        Self { table }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn get(&self, code: &str, name: &str) -> Option<Frequency> {
        self.table.get(&(name.to_string(), code.to_string())).copied()
    }
}

impl RecordStore for MemoryStore {
    fn fetch_all(&mut self) -> Result<Vec<Record>> {
        Ok(self
            .table
            .iter()
            .map(|((name, code), freq)| Record::new(code.as_str(), name.as_str(), *freq))
            .collect())
    }

    fn add(&mut self, record: &Record) -> Result<()> {
        self.table
            .insert((record.name.clone(), record.code.clone()), record.frequency);
        Ok(())
    }

    fn remove(&mut self, code: &str, name: &str) -> Result<()> {
        self.table.remove(&(name.to_string(), code.to_string()));
        Ok(())
    }
}
