use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tantivy::collector::{Count, TopDocs};
use tantivy::query::{AllQuery, BooleanQuery, ConstScoreQuery, Occur, Query};
use tantivy::schema::{Field, Value};
use tantivy::{DocAddress, Index, IndexReader, ReloadPolicy, Searcher, TantivyDocument};
use tracing::{debug, info, warn};

use ekn_core::config::resolve_with_base;
use ekn_core::manifest::resolve_manifest_dir;
use ekn_core::{FixedQuery, Manifest};
use ekn_query::{FieldPrefixes, SearchRequest, SortOrder};

use crate::error::{IndexError, Result};
use crate::parser::QueryParser;
use crate::spelling;
use crate::stemmer::{LanguageStemmer, StemmerCache};
use crate::tantivy_utils::{register_tokenizer, value_field_name, IndexFields};
use crate::writer::{PREFIXES_KEY, STOPWORDS_KEY};

/// Ranked ids of one page plus the estimated number of matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResults {
	pub upper_bound: u64,
	pub ids: Vec<String>,
}

struct OpenIndex {
	path: PathBuf,
	reader: IndexReader,
	fields: IndexFields,
}

struct OpenIndexes {
	indexes: Vec<OpenIndex>,
	prefixes: FieldPrefixes,
	stopwords: Option<HashSet<String>>,
}

struct Hit {
	score: f32,
	value: i64,
	id: String,
}

/// Owns the full-text indexes of one domain. Nothing is read from disk until
/// the first query.
pub struct IndexManager {
	manifest_path: PathBuf,
	state: Option<OpenIndexes>,
	stemmers: StemmerCache,
}

impl IndexManager {
	pub fn new(manifest_path: impl Into<PathBuf>) -> Self {
		Self { manifest_path: manifest_path.into(), state: None, stemmers: StemmerCache::new() }
	}

	pub fn manifest_path(&self) -> &Path {
		&self.manifest_path
	}

	pub fn is_open(&self) -> bool {
		self.state.is_some()
	}

	pub fn stemmer_for(&mut self, language: Option<&str>) -> Arc<LanguageStemmer> {
		self.stemmers.stemmer_for(language)
	}

	pub fn stemmers(&self) -> &StemmerCache {
		&self.stemmers
	}

	/// Prefix table of the opened indexes.
	pub fn prefixes(&mut self) -> Result<FieldPrefixes> {
		Ok(self.ensure_open()?.prefixes.clone())
	}

	pub fn stopwords(&mut self) -> Result<Option<HashSet<String>>> {
		Ok(self.ensure_open()?.stopwords.clone())
	}

	fn ensure_open(&mut self) -> Result<&mut OpenIndexes> {
		let state = match self.state.take() {
			Some(state) => state,
			None => self.open()?,
		};
		Ok(self.state.insert(state))
	}

	fn open(&self) -> Result<OpenIndexes> {
		let manifest = Manifest::from_file(&self.manifest_path)?;
		if manifest.indexes.is_empty() {
			return Err(IndexError::NoIndex(self.manifest_path.clone()));
		}
		let base = resolve_manifest_dir(&self.manifest_path)?;

		let mut indexes = Vec::with_capacity(manifest.indexes.len());
		let mut metadata = None;
		for entry in &manifest.indexes {
			let path = resolve_with_base(&base, &entry.path);
			let index = Index::open_in_dir(&path).map_err(|source| IndexError::Open { path: path.clone(), source })?;
			register_tokenizer(&index);
			let fields = IndexFields::from_schema(&index.schema())?;
			if metadata.is_none() {
				metadata = Some(read_metadata(&index, &path));
			}
			let reader: IndexReader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into()?;
			debug!(path = %path.display(), "opened index");
			indexes.push(OpenIndex { path, reader, fields });
		}

		let metadata = metadata.unwrap_or_default();
		let prefixes = prefixes_from(&metadata);
		let stopwords = stopwords_from(&metadata);
		info!(manifest = %self.manifest_path.display(), indexes = indexes.len(), stopwords = stopwords.is_some(), "index ready");
		Ok(OpenIndexes { indexes, prefixes, stopwords })
	}

	/// Stopword-free and spell-corrected variants of `text`.
	pub fn fix(&mut self, text: &str) -> Result<FixedQuery> {
		let state = self.ensure_open()?;
		let stop_word_corrected = state.stopwords.as_ref().map(|stopwords| {
			text.split_whitespace()
				.filter(|word| !stopwords.contains(&word.to_lowercase()))
				.collect::<Vec<_>>()
				.join(" ")
		});
		let sources: Vec<(Searcher, Field)> = state.indexes.iter().map(|index| (index.reader.searcher(), index.fields.body)).collect();
		let spell_corrected = spelling::suggest(&sources, text)?;
		Ok(FixedQuery { stop_word_corrected, spell_corrected })
	}

	/// Runs one request over every index and returns the requested page.
	pub fn execute(&mut self, request: &SearchRequest, language: Option<&str>) -> Result<SearchResults> {
		let stemmer = self.stemmers.stemmer_for(language);
		let manifest_path = self.manifest_path.clone();
		let state = self.ensure_open()?;

		let total: u64 = state.indexes.iter().map(|index| index.reader.searcher().num_docs()).sum();
		if total == 0 {
			return Err(IndexError::EmptyIndex(manifest_path));
		}
		let total = usize::try_from(total).unwrap_or(usize::MAX);
		let fetch = request.limit.map_or(total, |limit| request.offset.saturating_add(limit)).min(total);
		let sort_field = request
			.sort_value
			.map(|slot| value_field_name(slot).ok_or(IndexError::UnknownSortValue(slot)))
			.transpose()?;

		let mut upper_bound = 0u64;
		let mut hits = Vec::new();
		for index in &state.indexes {
			let searcher = index.reader.searcher();
			let parser = QueryParser::new(index.fields, &state.prefixes, &stemmer);
			let query = compose(&parser, request)?;
			if fetch == 0 {
				upper_bound += searcher.search(query.as_ref(), &Count)? as u64;
				continue;
			}
			match sort_field {
				None => {
					let (count, top) = searcher.search(query.as_ref(), &(Count, TopDocs::with_limit(fetch)))?;
					upper_bound += count as u64;
					for (score, address) in top {
						hits.push(Hit { score, value: 0, id: stored_id(&searcher, address, index.fields.id)? });
					}
				}
				Some(field) => {
					let order = match request.order {
						SortOrder::Ascending => tantivy::Order::Asc,
						SortOrder::Descending => tantivy::Order::Desc,
					};
					let collector = TopDocs::with_limit(fetch).order_by_fast_field::<i64>(field, order);
					let (count, top) = searcher.search(query.as_ref(), &(Count, collector))?;
					upper_bound += count as u64;
					for (value, address) in top {
						hits.push(Hit { score: 0.0, value, id: stored_id(&searcher, address, index.fields.id)? });
					}
				}
			}
			debug!(path = %index.path.display(), upper_bound, "searched index");
		}

		match sort_field {
			None => {
				hits.sort_by(|a, b| b.score.total_cmp(&a.score));
				if let Some(best) = hits.first().map(|hit| hit.score) {
					let floor = best * request.cutoff as f32 / 100.0;
					hits.retain(|hit| hit.score >= floor);
				}
			}
			Some(_) => match request.order {
				SortOrder::Ascending => hits.sort_by_key(|hit| hit.value),
				SortOrder::Descending => hits.sort_by_key(|hit| std::cmp::Reverse(hit.value)),
			},
		}

		let ids = hits.into_iter().skip(request.offset).take(request.limit.unwrap_or(usize::MAX)).map(|hit| hit.id).collect();
		Ok(SearchResults { upper_bound, ids })
	}
}

/// The query string, narrowed by the filter (which does not affect scores)
/// and with filter-out matches removed.
fn compose(parser: &QueryParser<'_>, request: &SearchRequest) -> Result<Box<dyn Query>> {
	let main = match &request.query_string {
		Some(query_string) => parser.parse(query_string)?,
		None => None,
	};
	let main = main.unwrap_or_else(|| Box::new(AllQuery) as Box<dyn Query>);
	let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
	if let Some(filter) = &request.filter {
		if let Some(filter) = parser.parse(filter)? {
			clauses.push((Occur::Must, Box::new(ConstScoreQuery::new(filter, 0.0)) as Box<dyn Query>));
		}
	}
	if let Some(filter_out) = &request.filter_out {
		if let Some(filter_out) = parser.parse(filter_out)? {
			clauses.push((Occur::MustNot, filter_out));
		}
	}
	if clauses.is_empty() {
		return Ok(main);
	}
	clauses.insert(0, (Occur::Must, main));
	Ok(Box::new(BooleanQuery::new(clauses)))
}

fn stored_id(searcher: &Searcher, address: DocAddress, field: Field) -> Result<String> {
	let doc: TantivyDocument = searcher.doc(address)?;
	doc.get_first(field).and_then(|v| v.as_str()).map(str::to_string).ok_or(IndexError::MissingId)
}

fn read_metadata(index: &Index, path: &Path) -> BTreeMap<String, String> {
	let payload = match index.load_metas() {
		Ok(metas) => metas.payload,
		Err(err) => {
			warn!(path = %path.display(), error = %err, "cannot read index metadata");
			None
		}
	};
	let Some(payload) = payload else { return BTreeMap::new() };
	serde_json::from_str(&payload).unwrap_or_else(|err| {
		warn!(path = %path.display(), error = %err, "malformed index metadata");
		BTreeMap::new()
	})
}

fn prefixes_from(metadata: &BTreeMap<String, String>) -> FieldPrefixes {
	match metadata.get(PREFIXES_KEY) {
		Some(json) => FieldPrefixes::from_json(json).unwrap_or_else(|err| {
			warn!(error = %err, "malformed prefix table, using defaults");
			FieldPrefixes::standard()
		}),
		None => {
			warn!("index has no prefix table, using defaults");
			FieldPrefixes::standard()
		}
	}
}

/// Older index builds left a newline on every stopword.
fn stopwords_from(metadata: &BTreeMap<String, String>) -> Option<HashSet<String>> {
	let json = metadata.get(STOPWORDS_KEY)?;
	match serde_json::from_str::<Vec<String>>(json) {
		Ok(words) => Some(words.into_iter().map(|w| w.trim_end_matches('\n').to_string()).collect()),
		Err(err) => {
			warn!(error = %err, "malformed stopword list, not removing stopwords");
			None
		}
	}
}
