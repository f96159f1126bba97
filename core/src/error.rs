use thiserror::Error;

use crate::types::ChunkPos;

#[derive(Error, Debug)]
pub enum MapError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("World '{world}' not found")]
    WorldNotFound { world: String },

    #[error("Chunk {chunk} in world '{world}' is unavailable")]
    ChunkUnavailable { world: String, chunk: ChunkPos },

    #[error("Audit service unavailable: {reason}")]
    AuditUnavailable { reason: String },

    #[error("A scan of world '{world}' is already in flight")]
    ScanInProgress { world: String },

    #[error("Background executor has stopped")]
    ExecutorStopped,

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type MapResult<T> = Result<T, MapError>;
