//! imtrie - frequency-ranked prefix completion for input methods
//!
//! Entries are `(code, name, frequency)` triples. Typing a prefix of a code
//! returns the matching names, most frequent first. The core structure is a
//! dirty sorted trie: every node carries the best frequency in its subtree
//! and children are kept ordered by it, so a query reads only as much of the
//! tree as the caller consumes.
//!
//! Layers, bottom up:
//!   - [`trie`]: node, per-node child ordering, bulk builder, ranked query
//!   - [`index`]: mutable index with a mutation log, and a frozen one
//!   - [`store`]: the record table the index is loaded from and flushed to
//!   - [`protocol`], [`server`], [`client`]: length-prefixed JSON over TCP

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod mutation_log;
pub mod protocol;
pub mod record;
pub mod server;
pub mod session;
pub mod store;
pub mod trie;

pub use client::Client;
pub use config::{BackendKind, ResponseEncoding, ServerConfig};
pub use engine::Engine;
pub use error::{IndexError, Result};
pub use index::{FrozenIndex, MutableIndex};
pub use record::Record;
pub use server::QueryServer;
pub use store::{JournalStore, MemoryStore, RecordStore};
pub use trie::{Frequency, Hit};
