//! Engine - one completion backend plus the store behind it
//!
//! Translates decoded requests into index calls. The server holds the engine
//! behind a single mutex and keeps it locked for a whole request, so index
//! operations never interleave.

use std::time::Instant;

use crate::config::{BackendKind, ServerConfig};
use crate::error::Result;
use crate::index::{FrozenIndex, MutableIndex};
use crate::mutation_log::FlushStats;
use crate::protocol::{Reply, Request};
use crate::store::RecordStore;
use crate::trie::Hit;

pub enum Backend {
    Mutable(MutableIndex),
    Frozen(FrozenIndex),
    /// Answer straight from the store.
    Store,
}

impl Backend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Mutable(_) => BackendKind::Mutable,
            Backend::Frozen(_) => BackendKind::Frozen,
            Backend::Store => BackendKind::Store,
        }
    }
}

pub struct Engine {
    backend: Backend,
    store: Box<dyn RecordStore>,
    max_completions: usize,
}

impl Engine {
    /// Build the configured backend from the store's contents.
    pub fn open(mut store: Box<dyn RecordStore>, config: &ServerConfig) -> Result<Self> {
        let backend = match config.backend {
            BackendKind::Mutable => {
                Backend::Mutable(MutableIndex::from_store(store.as_mut(), config.flush_period())?)
            }
            BackendKind::Frozen => Backend::Frozen(FrozenIndex::from_store(store.as_mut())?),
            BackendKind::Store => Backend::Store,
        };
        Ok(Self {
            backend,
            store,
            max_completions: config.max_completions,
        })
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Entries held by the index; `None` for the store backend.
    pub fn entry_count(&self) -> Option<usize> {
        match &self.backend {
            Backend::Mutable(index) => Some(index.len()),
            Backend::Frozen(index) => Some(index.len()),
            Backend::Store => None,
        }
    }

    /// Handle one request. `Ok(None)` means the request is dropped without
    /// a response.
    pub fn handle(&mut self, request: Request) -> Result<Option<Reply>> {
        if request.input().is_empty() {
            tracing::debug!(kind = request.kind(), "ignoring request with empty input");
            return Ok(None);
        }

        let limit = self.max_completions;
        match (request, &mut self.backend) {
            (Request::Completion { input }, Backend::Mutable(index)) => {
                Ok(Some(Reply::Pairs(index.query(&input, limit))))
            }
            (Request::Completion { input }, Backend::Frozen(index)) => {
                Ok(Some(Reply::Records(index.query(&input, limit))))
            }
            (Request::Completion { input }, Backend::Store) => {
                let hits = self
                    .store
                    .scan_prefix(&input, limit)?
                    .into_iter()
                    .map(|r| Hit { code: r.code, name: r.name, frequency: r.frequency })
                    .collect();
                Ok(Some(Reply::Pairs(hits)))
            }
            (Request::Insert { input, name, frequency }, Backend::Mutable(index)) => {
                Ok(Some(Reply::Changed(index.insert(&input, &name, frequency)?)))
            }
            (Request::Remove { input, name }, Backend::Mutable(index)) => {
                Ok(Some(Reply::Changed(index.remove(&input, &name)?)))
            }
            (request, backend) => {
                tracing::warn!(
                    kind = request.kind(),
                    backend = ?backend.kind(),
                    "write request refused by read-only backend"
                );
                Ok(None)
            }
        }
    }

    /// Give the flush cadence a chance to fire.
    pub fn flush_if_due(&mut self, now: Instant) -> Result<Option<FlushStats>> {
        match &mut self.backend {
            Backend::Mutable(index) => index.flush_if_due(now, self.store.as_mut()),
            _ => Ok(None),
        }
    }

    /// Drain pending mutations unconditionally.
    pub fn flush(&mut self) -> Result<FlushStats> {
        match &mut self.backend {
            Backend::Mutable(index) => index.flush(self.store.as_mut()),
            _ => Ok(FlushStats::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use crate::store::MemoryStore;

    fn engine(kind: BackendKind) -> Engine {
        let store = MemoryStore::with_records(vec![
            Record::new("hao", "好", 100),
            Record::new("haoye", "好耶", 50),
            Record::new("he", "和", 10),
        ]);
        let config = ServerConfig { backend: kind, ..ServerConfig::default() };
        Engine::open(Box::new(store), &config).unwrap()
    }

    fn completion(input: &str) -> Request {
        Request::Completion { input: input.to_string() }
    }

    #[test]
    fn test_backends_agree_on_order() {
        let mut expected = None;
        for kind in [BackendKind::Mutable, BackendKind::Frozen, BackendKind::Store] {
            let mut engine = engine(kind);
            let hits = match engine.handle(completion("h")).unwrap() {
                Some(Reply::Pairs(hits)) | Some(Reply::Records(hits)) => hits,
                other => panic!("unexpected reply {:?}", other),
            };
            let names: Vec<String> = hits.into_iter().map(|h| h.name).collect();
            match &expected {
                None => expected = Some(names),
                Some(e) => assert_eq!(&names, e, "backend {:?}", kind),
            }
        }
        assert_eq!(expected.unwrap(), vec!["好", "好耶", "和"]);
    }

    #[test]
    fn test_frozen_replies_with_records() {
        let mut engine = engine(BackendKind::Frozen);
        let reply = engine.handle(completion("hao")).unwrap().unwrap();
        assert!(matches!(reply, Reply::Records(ref hits) if hits.len() == 2));
    }

    #[test]
    fn test_empty_input_dropped() {
        let mut engine = engine(BackendKind::Mutable);
        assert_eq!(engine.handle(completion("")).unwrap(), None);
    }

    #[test]
    fn test_writes_only_on_mutable() {
        let insert = Request::Insert { input: "ha".into(), name: "哈".into(), frequency: 70 };

        let mut frozen = engine(BackendKind::Frozen);
        assert_eq!(frozen.handle(insert.clone()).unwrap(), None);

        let mut mutable = engine(BackendKind::Mutable);
        assert_eq!(mutable.handle(insert).unwrap(), Some(Reply::Changed(true)));
        assert_eq!(mutable.entry_count(), Some(4));

        let stats = mutable.flush().unwrap();
        assert_eq!(stats.inserted, 1);
    }
}
