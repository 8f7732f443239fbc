//! ekn-query
//!
//! The immutable [`Query`] value and the [`QueryBuilder`] that renders it
//! into the index query language (query string, filter, filter-out, sort
//! slot and relevance cutoff). Pure functions, no I/O.
pub mod builder;
pub mod prefixes;
pub mod query;
pub mod terms;

pub use builder::{QueryBuilder, SearchRequest};
pub use prefixes::FieldPrefixes;
pub use query::{MatchMode, MatchScope, Query, SortKey, SortOrder};
