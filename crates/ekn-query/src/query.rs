//! The immutable query value.
//!
//! A [`Query`] is built by chaining consuming `with_*` calls on an owned
//! value; each call returns a new query that differs only in the field it
//! names.
//!
//! ```
//! use ekn_query::{MatchScope, Query};
//!
//! let query = Query::search("dragon ball").with_match(MatchScope::TitleSynopsis).with_limit(10);
//! let page_two = query.clone().with_offset(10);
//! assert_eq!(query.offset(), 0);
//! assert_eq!(page_two.offset(), 10);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// How the last term of the search text is matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// The text may still be typed: the last term also matches as a prefix.
    #[default]
    Incremental,
    /// Whole words only.
    Delimited,
}

/// Which parts of a record the search text is matched against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchScope {
    #[default]
    TitleOnly,
    TitleSynopsis,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Relevance,
    SequenceNumber,
    Date,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    app_id: Option<String>,
    search_terms: Option<String>,
    corrected_terms: Option<String>,
    stopword_free_terms: Option<String>,
    literal_query: Option<String>,
    content_type: Option<String>,
    mode: MatchMode,
    match_scope: MatchScope,
    sort: SortKey,
    order: SortOrder,
    limit: Option<usize>,
    offset: usize,
    tags_match_all: Vec<String>,
    tags_match_any: Vec<String>,
    ids: Vec<String>,
    excluded_ids: Vec<String>,
    excluded_tags: Vec<String>,
}

impl Query {
    /// A match-all query with every field at its default.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(text: impl Into<String>) -> Self {
        Self::new().with_search_terms(text)
    }

    pub fn with_app_id(self, app_id: impl Into<String>) -> Self {
        Self { app_id: Some(app_id.into()), ..self }
    }

    pub fn with_search_terms(self, text: impl Into<String>) -> Self {
        Self { search_terms: Some(text.into()), ..self }
    }

    pub fn with_corrected_terms(self, text: impl Into<String>) -> Self {
        Self { corrected_terms: Some(text.into()), ..self }
    }

    pub fn with_stopword_free_terms(self, text: impl Into<String>) -> Self {
        Self { stopword_free_terms: Some(text.into()), ..self }
    }

    /// Query string used verbatim, bypassing term processing.
    pub fn with_literal_query(self, literal: impl Into<String>) -> Self {
        Self { literal_query: Some(literal.into()), ..self }
    }

    pub fn with_content_type(self, content_type: impl Into<String>) -> Self {
        Self { content_type: Some(content_type.into()), ..self }
    }

    pub fn with_mode(self, mode: MatchMode) -> Self {
        Self { mode, ..self }
    }

    pub fn with_match(self, match_scope: MatchScope) -> Self {
        Self { match_scope, ..self }
    }

    pub fn with_sort(self, sort: SortKey) -> Self {
        Self { sort, ..self }
    }

    pub fn with_order(self, order: SortOrder) -> Self {
        Self { order, ..self }
    }

    pub fn with_limit(self, limit: usize) -> Self {
        Self { limit: Some(limit), ..self }
    }

    pub fn unlimited(self) -> Self {
        Self { limit: None, ..self }
    }

    pub fn with_offset(self, offset: usize) -> Self {
        Self { offset, ..self }
    }

    pub fn with_tags_match_all<I, S>(self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { tags_match_all: collect(tags), ..self }
    }

    pub fn with_tags_match_any<I, S>(self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { tags_match_any: collect(tags), ..self }
    }

    pub fn with_ids<I, S>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { ids: collect(ids), ..self }
    }

    pub fn with_excluded_ids<I, S>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { excluded_ids: collect(ids), ..self }
    }

    pub fn with_excluded_tags<I, S>(self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { excluded_tags: collect(tags), ..self }
    }

    pub fn app_id(&self) -> Option<&str> {
        self.app_id.as_deref()
    }

    pub fn search_terms(&self) -> Option<&str> {
        self.search_terms.as_deref()
    }

    pub fn corrected_terms(&self) -> Option<&str> {
        self.corrected_terms.as_deref()
    }

    pub fn stopword_free_terms(&self) -> Option<&str> {
        self.stopword_free_terms.as_deref()
    }

    pub fn literal_query(&self) -> Option<&str> {
        self.literal_query.as_deref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn match_scope(&self) -> MatchScope {
        self.match_scope
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    /// `None` means no limit.
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn tags_match_all(&self) -> &[String] {
        &self.tags_match_all
    }

    pub fn tags_match_any(&self) -> &[String] {
        &self.tags_match_any
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn excluded_ids(&self) -> &[String] {
        &self.excluded_ids
    }

    pub fn excluded_tags(&self) -> &[String] {
        &self.excluded_tags
    }

    /// No search text at all: only filters select results.
    pub fn is_match_all(&self) -> bool {
        self.search_terms.is_none()
    }

    /// Search text that is worth sending through query correction.
    pub fn has_search_text(&self) -> bool {
        self.search_terms.as_deref().is_some_and(|text| !text.trim().is_empty())
    }
}

fn collect<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

impl fmt::Display for Query {
    /// Only fields that differ from their default are shown.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields: Vec<String> = Vec::new();
        let mut text = |name: &str, value: &Option<String>| {
            if let Some(value) = value {
                fields.push(format!("{name}: {value:?}"));
            }
        };
        text("app_id", &self.app_id);
        text("search_terms", &self.search_terms);
        text("corrected_terms", &self.corrected_terms);
        text("stopword_free_terms", &self.stopword_free_terms);
        text("literal_query", &self.literal_query);
        text("content_type", &self.content_type);

        if self.mode != MatchMode::default() {
            fields.push(format!("mode: {:?}", self.mode));
        }
        if self.match_scope != MatchScope::default() {
            fields.push(format!("match: {:?}", self.match_scope));
        }
        if self.sort != SortKey::default() {
            fields.push(format!("sort: {:?}", self.sort));
        }
        if self.order != SortOrder::default() {
            fields.push(format!("order: {:?}", self.order));
        }
        if let Some(limit) = self.limit {
            fields.push(format!("limit: {limit}"));
        }
        if self.offset != 0 {
            fields.push(format!("offset: {}", self.offset));
        }

        let mut list = |name: &str, values: &[String]| {
            if !values.is_empty() {
                fields.push(format!("{name}: {values:?}"));
            }
        };
        list("tags_match_all", &self.tags_match_all);
        list("tags_match_any", &self.tags_match_any);
        list("ids", &self.ids);
        list("excluded_ids", &self.excluded_ids);
        list("excluded_tags", &self.excluded_tags);

        write!(f, "Query({{{}}})", fields.join(", "))
    }
}
