//! ekn-shard
//!
//! Content-addressed record store: [`ShardFile`] opens a shard directory and
//! resolves records and their blobs by hash, [`ShardWriter`] produces one,
//! and [`LinkTable`] reads the link → id dictionary a shard may carry.
pub mod error;
pub mod link_table;
pub mod shard;
pub mod writer;

pub use error::{Result, ShardError};
pub use link_table::{LinkTable, LINK_TABLE_ID};
pub use shard::{Blob, Record, ShardFile};
pub use writer::{NewRecord, ShardWriter};
