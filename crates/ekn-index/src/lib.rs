//! ekn-index
//!
//! Tantivy-backed full-text index of a domain. [`ContentIndexer`] builds an
//! index directory, [`IndexManager`] opens the indexes a manifest lists and
//! runs [`SearchRequest`](ekn_query::SearchRequest)s and query fixes against
//! them. See `parser` for the query language.
pub mod error;
pub mod manager;
pub mod parser;
pub mod spelling;
pub mod stemmer;
pub mod tantivy_utils;
pub mod writer;

pub use error::{IndexError, Result};
pub use manager::{IndexManager, SearchResults};
pub use stemmer::{LanguageStemmer, StemmerCache, NO_STEMMER};
pub use writer::{ContentIndexer, IndexDocument, PREFIXES_KEY, STOPWORDS_KEY};
