use std::path::PathBuf;

use ekn_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShardError {
    #[error("Not a shard directory: {0}")]
    NotAShard(PathBuf),

    #[error("Malformed record {hash} in {}: {reason}", path.display())]
    BadRecord { path: PathBuf, hash: String, reason: String },

    #[error("Malformed link table: {0}")]
    BadLinkTable(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Shard task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ShardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotAShard(_) => ErrorKind::NotFound,
            Self::BadRecord { .. } | Self::BadLinkTable(_) | Self::Json(_) => ErrorKind::Format,
            Self::Io(_) | Self::Task(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, ShardError>;
