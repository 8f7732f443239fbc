#![deny(unused_imports)]

pub mod config;
pub mod content_id;
pub mod error;
pub mod manifest;
pub mod object_model;
pub mod types;

pub use content_id::ContentId;
pub use error::{Error, ErrorKind, Result};
pub use manifest::Manifest;
pub use object_model::ContentObject;
pub use types::{BlobContents, FixedQuery, ResultBatch};
