//! Backing record store.
//!
//! A keyed table of `(word, code, frequency)` unique on `(word, code)`. The
//! index only needs a full dump at startup and per-entry writes when the
//! mutation log drains; everything else about the store is opaque to it.

pub mod journal;
pub mod memory;

pub use journal::JournalStore;
pub use memory::MemoryStore;

use crate::error::Result;
use crate::record::Record;

/// Send is required so the index can sit behind the server's mutex.
pub trait RecordStore: Send {
    /// Every stored record.
    fn fetch_all(&mut self) -> Result<Vec<Record>>;

    /// Upsert one record. Re-adding an existing `(word, code)` replaces its
    /// frequency, so replayed log entries are idempotent.
    fn add(&mut self, record: &Record) -> Result<()>;

    /// Delete `(word, code)`. Deleting a missing pair is not an error.
    fn remove(&mut self, code: &str, name: &str) -> Result<()>;

    /// Upsert a batch.
    fn add_many(&mut self, records: &[Record]) -> Result<()> {
        for record in records {
            self.add(record)?;
        }
        Ok(())
    }

    /// Records whose code starts with `prefix`, by descending frequency
    /// (ties by code, then word), at most `limit`.
    ///
    /// Full scan; serves the direct-from-store backend and doubles as the
    /// reference ordering for the trie.
    fn scan_prefix(&mut self, prefix: &str, limit: usize) -> Result<Vec<Record>> {
        let mut matches: Vec<Record> = self
            .fetch_all()?
            .into_iter()
            .filter(|r| r.code.starts_with(prefix))
            .collect();
        matches.sort_by(|a, b| {
            b.frequency
                .cmp(&a.frequency)
                .then_with(|| a.code.cmp(&b.code))
                .then_with(|| a.name.cmp(&b.name))
        });
        matches.truncate(limit);
        Ok(matches)
    }
}
