use tracing::warn;

use ekn_core::ContentId;

use crate::prefixes::FieldPrefixes;
use crate::query::{MatchMode, MatchScope, Query, SortKey, SortOrder};
use crate::terms::split_terms;

/// Relevance cutoff (percent of the best score) when synopses are searched.
pub const MATCH_SYNOPSIS_CUTOFF: u32 = 20;
/// Relevance cutoff for title-only searches.
pub const DEFAULT_CUTOFF: u32 = 10;

/// Value slot holding the record's sequence number.
pub const SEQUENCE_NUMBER_VALUE_NO: u32 = 0;
/// Value slot holding the record's publication date.
pub const PUBLISHED_DATE_VALUE_NO: u32 = 1;

/// Everything the index needs to run one query.
///
/// - `query_string`: `None` matches every document
/// - `filter`: documents must also match this
/// - `filter_out`: documents matching this are dropped
/// - `sort_value`: value slot to order by, `None` for relevance
/// - `cutoff`: percent of the best score a hit needs when ranked by relevance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query_string: Option<String>,
    pub filter: Option<String>,
    pub filter_out: Option<String>,
    pub sort_value: Option<u32>,
    pub order: SortOrder,
    pub cutoff: u32,
    pub offset: usize,
    pub limit: Option<usize>,
}

/// Renders a [`Query`] into the index query language using a prefix table.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    prefixes: FieldPrefixes,
}

impl QueryBuilder {
    pub fn new(prefixes: FieldPrefixes) -> Self {
        Self { prefixes }
    }

    pub fn prefixes(&self) -> &FieldPrefixes {
        &self.prefixes
    }

    pub fn build(&self, query: &Query) -> SearchRequest {
        SearchRequest {
            query_string: self.query_string(query),
            filter: self.filter_string(query),
            filter_out: self.filter_out_string(query),
            sort_value: sort_value(query.sort()),
            order: query.order(),
            cutoff: cutoff(query.match_scope()),
            offset: query.offset(),
            limit: query.limit(),
        }
    }

    pub fn query_string(&self, query: &Query) -> Option<String> {
        if let Some(literal) = query.literal_query() {
            return Some(literal.to_string());
        }

        let raw_terms = split_terms(query.search_terms()?);
        if raw_terms.is_empty() {
            return None;
        }

        // Wildcards on a single character are too expensive to expand.
        if let [term] = raw_terms.as_slice() {
            if term.chars().count() == 1 {
                return Some(token(self.prefixes.exact_title(), term));
            }
        }

        let exact_title = self.exact_title_clause(&raw_terms, query.mode());
        let corrected = query
            .corrected_terms()
            .map(split_terms)
            .filter(|terms| !terms.is_empty());
        let title = self.title_clause(&raw_terms, corrected.as_deref(), query.mode());

        let mut clauses = vec![format!("({exact_title}) OR ({title})")];
        if query.match_scope() == MatchScope::TitleSynopsis {
            clauses.push(format!("({})", raw_terms.join(" ")));
            if let Some(corrected) = &corrected {
                clauses.push(format!("({})", corrected.join(" ")));
            }
        }
        Some(clauses.join(" OR "))
    }

    fn exact_title_clause(&self, terms: &[String], mode: MatchMode) -> String {
        let joined = terms.join("_");
        let prefix = self.prefixes.exact_title();
        match mode {
            MatchMode::Incremental => format!("{} OR {}", token(prefix, &joined), wildcard(prefix, &joined)),
            MatchMode::Delimited => token(prefix, &joined),
        }
    }

    fn title_clause(&self, terms: &[String], corrected: Option<&[String]>, mode: MatchMode) -> String {
        let corrected = corrected.unwrap_or_default();
        let positions = terms.len().max(corrected.len());
        let prefix = self.prefixes.title();

        (0..positions)
            .map(|i| {
                let raw = terms.get(i);
                let fixed = corrected.get(i).filter(|fixed| Some(*fixed) != raw);
                let partial = mode == MatchMode::Incremental && i + 1 == positions;

                let mut alternatives = Vec::new();
                for term in raw.into_iter().chain(fixed) {
                    alternatives.push(token(prefix, term));
                    if partial {
                        alternatives.push(wildcard(prefix, term));
                    }
                }
                match alternatives.len() {
                    1 => alternatives.remove(0),
                    _ if positions == 1 => alternatives.join(" OR "),
                    _ => format!("({})", alternatives.join(" OR ")),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn filter_string(&self, query: &Query) -> Option<String> {
        let tag = self.prefixes.tag();
        let mut groups = Vec::new();
        groups.extend(group(query.tags_match_any().iter().map(|t| token(tag, t)), "OR"));
        groups.extend(group(query.tags_match_all().iter().map(|t| token(tag, t)), "AND"));
        groups.extend(group(query.ids().iter().map(|id| self.id_token(id)), "OR"));
        if let Some(content_type) = query.content_type() {
            groups.push(format!("({})", wildcard(self.prefixes.content_type(), content_type)));
        }
        join_groups(groups)
    }

    pub fn filter_out_string(&self, query: &Query) -> Option<String> {
        let tag = self.prefixes.tag();
        let mut groups = Vec::new();
        groups.extend(group(query.excluded_tags().iter().map(|t| token(tag, t)), "OR"));
        groups.extend(group(query.excluded_ids().iter().map(|id| self.id_token(id)), "OR"));
        join_groups(groups)
    }

    fn id_token(&self, id: &str) -> String {
        match id.parse::<ContentId>() {
            Ok(id) => token(self.prefixes.id(), id.hash()),
            Err(err) => {
                warn!(%id, error = %err, "malformed id in query filter");
                token(self.prefixes.id(), "")
            }
        }
    }
}

pub fn sort_value(sort: SortKey) -> Option<u32> {
    match sort {
        SortKey::Relevance => None,
        SortKey::SequenceNumber => Some(SEQUENCE_NUMBER_VALUE_NO),
        SortKey::Date => Some(PUBLISHED_DATE_VALUE_NO),
    }
}

pub fn cutoff(scope: MatchScope) -> u32 {
    match scope {
        MatchScope::TitleSynopsis => MATCH_SYNOPSIS_CUTOFF,
        MatchScope::TitleOnly => DEFAULT_CUTOFF,
    }
}

/// `PREFIX"value"`, doubling embedded quotes.
pub fn token(prefix: &str, value: &str) -> String {
    format!("{prefix}\"{}\"", value.replace('"', "\"\""))
}

pub fn wildcard(prefix: &str, value: &str) -> String {
    format!("{}*", token(prefix, value))
}

fn group(tokens: impl Iterator<Item = String>, op: &str) -> Option<String> {
    let tokens: Vec<String> = tokens.collect();
    if tokens.is_empty() {
        return None;
    }
    Some(format!("({})", tokens.join(&format!(" {op} "))))
}

fn join_groups(groups: Vec<String>) -> Option<String> {
    if groups.is_empty() { None } else { Some(groups.join(" AND ")) }
}
