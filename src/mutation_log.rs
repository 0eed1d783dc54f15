//! Pending-mutation log drained into the backing store on a time cadence.
//!
//! Ordered, append-only between flushes. The owning index is the single
//! writer.
//!
//! Draining is at-least-once: entries are replayed in log order and only
//! discarded after every store call succeeded. A failed drain leaves the log
//! as it was, so a later drain replays entries the store may already hold;
//! store writes are upserts, which makes the replay harmless.

use std::time::{Duration, Instant};

use crate::error::Result;
use crate::record::Record;
use crate::store::RecordStore;

/// One logged write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Insert(Record),
    Remove { code: String, name: String },
}

/// Outcome of one drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlushStats {
    pub inserted: usize,
    pub removed: usize,
}

impl FlushStats {
    pub fn total(&self) -> usize {
        self.inserted + self.removed
    }
}

pub struct MutationLog {
    entries: Vec<Mutation>,
    period: Duration,
    last_flush: Instant,
}

impl MutationLog {
    // -- Constructors ---------------------------------------------------------

    /// Empty log whose cadence starts now.
    pub fn new(period: Duration) -> Self {
        Self::starting_at(period, Instant::now())
    }

    /// Empty log whose cadence starts at `start`.
    pub fn starting_at(period: Duration, start: Instant) -> Self {
        Self {
            entries: Vec::new(),
            period,
            last_flush: start,
        }
    }

    // -- Write Operations -----------------------------------------------------

    pub fn push(&mut self, mutation: Mutation) {
        self.entries.push(mutation);
    }

    // -- Flush ----------------------------------------------------------------

    /// True once at least one period has elapsed since the last drain.
    pub fn is_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_flush) >= self.period
    }

    /// Drain if due. Returns `None` when not due.
    pub fn flush_if_due(
        &mut self,
        now: Instant,
        store: &mut dyn RecordStore,
    ) -> Result<Option<FlushStats>> {
        if !self.is_due(now) {
            return Ok(None);
        }
        self.drain_into(store, now).map(Some)
    }

    /// Replay every entry into `store` in log order, then clear the log and
    /// restart the cadence at `now`. On error the log is untouched.
    pub fn drain_into(&mut self, store: &mut dyn RecordStore, now: Instant) -> Result<FlushStats> {
        let mut stats = FlushStats::default();
        for mutation in &self.entries {
            match mutation {
                Mutation::Insert(record) => {
                    store.add(record)?;
                    stats.inserted += 1;
                }
                Mutation::Remove { code, name } => {
                    store.remove(code, name)?;
                    stats.removed += 1;
                }
            }
        }
        self.entries.clear();
        self.last_flush = now;
        Ok(stats)
    }

    // -- Inspection -----------------------------------------------------------

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mutation> {
        self.entries.iter()
    }
}

// -- Tests --------------------------------------------------------------------
