//! Read-write completion index with a pending-mutation log.

use std::time::{Duration, Instant};

use crate::error::{IndexError, Result};
use crate::mutation_log::{FlushStats, Mutation, MutationLog};
use crate::record::Record;
use crate::store::RecordStore;
use crate::trie::{build_trie, entry_path, Completions, Frequency, Hit, PriorityTrieNode};

/// Trie facade for insert/remove/prefix-query.
///
/// Writes apply to the trie immediately and are queued in a [`MutationLog`];
/// the log reaches the store only through [`MutableIndex::flush_if_due`] or
/// [`MutableIndex::flush`]. There is no background timer: the caller decides
/// when to give the cadence a chance to fire.
pub struct MutableIndex {
    root: PriorityTrieNode,
    log: MutationLog,
    entries: usize,
}

impl MutableIndex {
    /// Empty index.
    pub fn new(flush_period: Duration) -> Self {
        Self {
            root: PriorityTrieNode::new(),
            log: MutationLog::new(flush_period),
            entries: 0,
        }
    }

    /// Bulk-build from `records`. Nothing is logged: the records are assumed
    /// to already be in the store.
    pub fn with_records<I>(records: I, flush_period: Duration) -> Self
    where
        I: IntoIterator<Item = Record>,
    {
        let root = build_trie(records.into_iter().filter(|r| {
            if r.code.is_empty() {
                tracing::warn!(name = %r.name, "skipping record with empty code");
                false
            } else {
                true
            }
        }));
        let entries = root.count_terminals();
        Self {
            root,
            log: MutationLog::new(flush_period),
            entries,
        }
    }

    /// Seed from the store's full record set.
    pub fn from_store(store: &mut dyn RecordStore, flush_period: Duration) -> Result<Self> {
        let started = Instant::now();
        let records = store.fetch_all()?;
        let index = Self::with_records(records, flush_period);
        tracing::info!(
            entries = index.entries,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "index built from store"
        );
        Ok(index)
    }

    // -- Writes ---------------------------------------------------------------

    /// Set the frequency of `(code, name)`, adding the entry if needed.
    /// Returns whether the trie changed.
    pub fn insert(&mut self, code: &str, name: &str, frequency: Frequency) -> Result<bool> {
        if code.is_empty() {
            return Err(IndexError::EmptyCode);
        }
        let mut previous = None;
        let changed = self.modify(code, name, |old| {
            previous = old;
            Some(frequency)
        });
        if previous.is_none() {
            self.entries += 1;
        }
        self.log.push(Mutation::Insert(Record::new(code, name, frequency)));
        Ok(changed)
    }

    /// Drop `(code, name)`. Removing an absent entry changes nothing and
    /// logs nothing.
    pub fn remove(&mut self, code: &str, name: &str) -> Result<bool> {
        if code.is_empty() {
            return Err(IndexError::EmptyCode);
        }
        let mut previous = None;
        let changed = self.modify(code, name, |old| {
            previous = old;
            None
        });
        if previous.is_some() {
            self.entries -= 1;
            self.log.push(Mutation::Remove {
                code: code.to_string(),
                name: name.to_string(),
            });
        }
        Ok(changed)
    }

    fn modify<F>(&mut self, code: &str, name: &str, mut update: F) -> bool
    where
        F: FnMut(Option<Frequency>) -> Option<Frequency>,
    {
        let path = entry_path(code, name);
        let changed = self.root.modify(&path, &mut update);
        // The root has no parent to commit its stat.
        self.root.commit();
        changed
    }

    // -- Reads ----------------------------------------------------------------

    /// At most `limit` entries under `prefix`, best first.
    pub fn query(&self, prefix: &str, limit: usize) -> Vec<Hit> {
        self.completions(prefix).take(limit).collect()
    }

    /// Unbounded lazy enumeration under `prefix`.
    pub fn completions(&self, prefix: &str) -> Completions<'_> {
        Completions::new(&self.root, prefix)
    }

    /// Frequency of exactly `(code, name)`, if present.
    pub fn get(&self, code: &str, name: &str) -> Option<Frequency> {
        self.root
            .descend(&entry_path(code, name))
            .and_then(|n| n.terminal())
    }

    // -- Flush ----------------------------------------------------------------

    /// Drain the log into `store` if the flush period has elapsed at `now`.
    pub fn flush_if_due(
        &mut self,
        now: Instant,
        store: &mut dyn RecordStore,
    ) -> Result<Option<FlushStats>> {
        let flushed = self.log.flush_if_due(now, store)?;
        if let Some(stats) = flushed {
            if stats.total() > 0 {
                tracing::debug!(
                    inserted = stats.inserted,
                    removed = stats.removed,
                    "mutation log flushed"
                );
            }
        }
        Ok(flushed)
    }

    /// Drain the log regardless of the cadence.
    pub fn flush(&mut self, store: &mut dyn RecordStore) -> Result<FlushStats> {
        self.log.drain_into(store, Instant::now())
    }

    // -- Inspection -----------------------------------------------------------

    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    pub fn pending_mutations(&self) -> usize {
        self.log.len()
    }

    pub fn root(&self) -> &PriorityTrieNode {
        &self.root
    }

    /// Recompute every stat from scratch and check it against the cache,
    /// plus the root-specific invariants.
    pub fn validate(&self) -> Result<()> {
        if self.root.terminal().is_some() {
            return Err(IndexError::Invariant {
                path: String::new(),
                reason: "root carries a terminal".to_string(),
            });
        }
        self.root.validate()?;
        let counted = self.root.count_terminals();
        if counted != self.entries {
            return Err(IndexError::Invariant {
                path: String::new(),
                reason: format!("entry count {} but {} terminals", self.entries, counted),
            });
        }
        Ok(())
    }
}
