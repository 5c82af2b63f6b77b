use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

/// Which half of a persisted index pair could not be found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    Index,
    Metadata,
}

impl fmt::Display for Missing {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Missing::Index => f.write_str("vector index"),
            Missing::Metadata => f.write_str("chunk metadata"),
        }
    }
}

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(Missing),

    #[error("Embedding model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Index invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Malformed upstream output: {0}")]
    MalformedUpstream(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl RagError {
    /// True when nothing has been ingested yet (or the persisted pair is incomplete)
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, RagError::NotFound(_))
    }
}

impl From<serde_json::Error> for RagError {
    #[inline]
    fn from(err: serde_json::Error) -> Self {
        RagError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for RagError {
    #[inline]
    fn from(err: bincode::Error) -> Self {
        RagError::Serialization(err.to_string())
    }
}

pub mod commands;
pub mod config;
pub mod database;
pub mod embeddings;
pub mod generation;
pub mod indexer;
pub mod logging;
pub mod retrieval;
