use std::path::PathBuf;

use ekn_core::ErrorKind;
use ekn_index::IndexError;
use ekn_shard::ShardError;
use thiserror::Error;

use crate::gather::Cancelled;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("No application id given and no default configured")]
    AppIdNotSet,

    #[error("Path does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("No content installed for {0}")]
    ContentDirNotFound(String),

    #[error("Unsupported content version {found:?} in {}", path.display())]
    UnsupportedVersion { path: PathBuf, found: String },

    #[error("Malformed subscriptions file {}: {reason}", path.display())]
    BadSubscriptions { path: PathBuf, reason: String },

    #[error("No manifest in {0}")]
    ManifestMissing(PathBuf),

    #[error("Malformed manifest: {0}")]
    BadManifest(String),

    #[error("Not a valid content id: {0}")]
    IdNotValid(String),

    #[error("No record for {0}")]
    IdNotFound(String),

    #[error("Malformed metadata for {id}: {reason}")]
    BadFormat { id: String, reason: String },

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Shard(#[from] ShardError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Domain task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<Cancelled> for DomainError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AppIdNotSet | Self::PathNotFound(_) => ErrorKind::Config,
            Self::ContentDirNotFound(_) | Self::ManifestMissing(_) | Self::IdNotFound(_) => ErrorKind::NotFound,
            Self::UnsupportedVersion { .. }
            | Self::BadSubscriptions { .. }
            | Self::BadManifest(_)
            | Self::IdNotValid(_)
            | Self::BadFormat { .. } => ErrorKind::Format,
            Self::Index(err) => err.kind(),
            Self::Shard(err) => err.kind(),
            Self::Io(_) | Self::Task(_) => ErrorKind::Io,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;

/// Treats "already exists" as success.
pub(crate) fn ignore_exists(result: std::io::Result<()>) -> std::io::Result<()> {
    match result {
        Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        other => other,
    }
}
