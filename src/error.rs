//! Crate error type

use std::path::PathBuf;

use thiserror::Error;

use crate::sim::entity::EntityKind;

#[derive(Debug, Error)]
pub enum BreakoutError {
    /// A consumer was handed an entity kind it has no representation for
    #[error("don't know how to handle a {kind:?} entity")]
    UnsupportedEntity { kind: EntityKind },

    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("failed to spawn simulation thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("simulation thread panicked")]
    EngineThread,
}

pub type Result<T> = std::result::Result<T, BreakoutError>;
