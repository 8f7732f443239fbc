use thiserror::Error;

/// Coarse classification shared by every error in the workspace.
///
/// Callers use it to decide how to surface a failure: configuration
/// problems are the caller's to fix, not-found means content is not
/// installed, format errors point at a corrupt install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    NotFound,
    Format,
    Io,
    Cancelled,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not a valid content id: {0}")]
    InvalidId(String),

    #[error("Malformed manifest: {0}")]
    BadManifest(String),

    #[error("Malformed content metadata: {0}")]
    BadFormat(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfig(_) => ErrorKind::Config,
            Self::InvalidId(_) | Self::BadManifest(_) | Self::BadFormat(_) | Self::Json(_) => {
                ErrorKind::Format
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
