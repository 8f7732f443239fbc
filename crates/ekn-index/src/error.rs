use std::path::PathBuf;

use ekn_core::ErrorKind;
use tantivy::TantivyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Index is empty: {0}")]
    EmptyIndex(PathBuf),

    #[error("Manifest {0} lists no index")]
    NoIndex(PathBuf),

    #[error("Cannot open index at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: TantivyError,
    },

    #[error("Malformed query string {query:?}: {reason}")]
    Parse { query: String, reason: String },

    #[error("No value slot {0}")]
    UnknownSortValue(u32),

    #[error("Indexed document has no id")]
    MissingId,

    #[error(transparent)]
    Manifest(#[from] ekn_core::Error),

    #[error(transparent)]
    Tantivy(#[from] TantivyError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl IndexError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyIndex(_) | Self::NoIndex(_) | Self::Open { .. } => ErrorKind::NotFound,
            Self::Parse { .. } | Self::MissingId | Self::Json(_) => ErrorKind::Format,
            Self::UnknownSortValue(_) => ErrorKind::Config,
            Self::Manifest(err) => err.kind(),
            Self::Tantivy(_) | Self::Io(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;
