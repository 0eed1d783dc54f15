//! Error types for the completion index and its boundaries

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("Code must contain at least one symbol")]
    EmptyCode,

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Trie invariant violated at '{path}': {reason}")]
    Invariant { path: String, reason: String },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl IndexError {
    /// Short, stable name for log fields
    pub fn kind(&self) -> &'static str {
        match self {
            IndexError::Io(_) => "io",
            IndexError::Json(_) => "json",
            IndexError::Config(_) => "config",
            IndexError::EmptyCode => "empty_code",
            IndexError::InvalidRecord(_) => "invalid_record",
            IndexError::Invariant { .. } => "invariant",
            IndexError::Store(_) => "store",
            IndexError::Protocol(_) => "protocol",
        }
    }
}
