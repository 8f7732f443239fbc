//! ekn-domain
//!
//! A [`Domain`] is the content of one application: the shards listed by its
//! manifest, the link tables they carry and the full-text index over them.
//! It resolves ids to objects (one at a time or as an ordered batch), runs
//! queries and reads blobs. The [`Engine`] maps application ids to domains.
pub mod domain;
pub mod engine;
pub mod error;
pub mod gather;
pub mod setup;

pub use domain::Domain;
pub use engine::Engine;
pub use error::{DomainError, Result};
pub use gather::{gather_ordered, Cancelled, GatherPolicy};
pub use setup::Layout;
