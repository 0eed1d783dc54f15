//! Server configuration
//!
//! Defaults match the historical deployment: loopback-only on port 51515,
//! six completions per query, half-second flush cadence, GBK responses.
//! A YAML file may override any subset of fields; CLI flags override the file.

use std::fs::File;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const DEFAULT_PORT: u16 = 51515;
pub const DEFAULT_MAX_COMPLETIONS: usize = 6;
pub const DEFAULT_FLUSH_PERIOD_MS: u64 = 500;

/// Which structure answers completion requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Dirty sorted trie, accepts insert/remove.
    #[default]
    Mutable,
    /// Bulk-built read-only trie; answers carry frequencies.
    Frozen,
    /// No index: scan the store on every request.
    Store,
}

/// Text encoding of response payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResponseEncoding {
    #[default]
    Gbk,
    Utf8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Peers allowed to connect. Everyone else is closed on accept.
    pub allow: Vec<IpAddr>,
    pub max_completions: usize,
    pub flush_period_ms: u64,
    pub backend: BackendKind,
    pub encoding: ResponseEncoding,
    /// Journal file. `None` serves from an ephemeral in-memory store.
    pub store: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let loopback = IpAddr::V4(Ipv4Addr::LOCALHOST);
        Self {
            bind: SocketAddr::new(loopback, DEFAULT_PORT),
            allow: vec![loopback],
            max_completions: DEFAULT_MAX_COMPLETIONS,
            flush_period_ms: DEFAULT_FLUSH_PERIOD_MS,
            backend: BackendKind::default(),
            encoding: ResponseEncoding::default(),
            store: None,
        }
    }
}

impl ServerConfig {
    /// Read a YAML config. Missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let config = serde_yaml::from_reader(file)?;
        Ok(config)
    }

    pub fn flush_period(&self) -> Duration {
        Duration::from_millis(self.flush_period_ms)
    }

    pub fn is_allowed(&self, peer: &IpAddr) -> bool {
        self.allow.contains(peer)
    }
}
