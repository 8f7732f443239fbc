use chrono::{DateTime, NaiveDate};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tantivy::{Index, IndexWriter, TantivyDocument};
use tracing::{debug, info};

use ekn_core::ContentObject;
use ekn_query::terms::{exact_title, split_terms};
use ekn_query::FieldPrefixes;

use crate::error::Result;
use crate::stemmer::{LanguageStemmer, StemmerCache};
use crate::tantivy_utils::{build_schema, register_tokenizer, text_words, IndexFields, STEM_PREFIX};

/// Metadata key holding the prefix table.
pub const PREFIXES_KEY: &str = "XbPrefixes";
/// Metadata key holding the JSON stopword list.
pub const STOPWORDS_KEY: &str = "XbStopwords";

const WRITER_HEAP_BYTES: usize = 50_000_000;

/// What gets indexed for one record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexDocument {
	pub id: String,
	pub title: String,
	pub synopsis: String,
	/// Extra full-text beyond title and synopsis.
	pub body: Option<String>,
	pub tags: Vec<String>,
	pub content_type: String,
	pub sequence_number: Option<i64>,
	pub published: Option<i64>,
}

impl IndexDocument {
	pub fn from_object(object: &ContentObject) -> Self {
		let content = object.content();
		let published = match object {
			ContentObject::Article(article) => parse_published(&article.published),
			_ => None,
		};
		Self {
			id: content.id.to_string(),
			title: content.title.clone(),
			synopsis: content.synopsis.clone(),
			body: None,
			tags: content.tags.clone(),
			content_type: content.content_type.clone(),
			sequence_number: None,
			published,
		}
	}

	pub fn with_sequence_number(mut self, sequence_number: i64) -> Self {
		self.sequence_number = Some(sequence_number);
		self
	}

	pub fn with_body(mut self, body: impl Into<String>) -> Self {
		self.body = Some(body.into());
		self
	}
}

/// Seconds since the epoch for an RFC 3339 timestamp or a bare `YYYY-MM-DD` date.
pub fn parse_published(text: &str) -> Option<i64> {
	let text = text.trim();
	if text.is_empty() { return None; }
	if let Ok(date) = DateTime::parse_from_rfc3339(text) { return Some(date.timestamp()); }
	NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
		.and_then(|date| date.and_hms_opt(0, 0, 0))
		.map(|midnight| midnight.and_utc().timestamp())
}

/// Builds one index directory. Metadata set here lands in the commit payload.
pub struct ContentIndexer {
	dir: PathBuf,
	writer: IndexWriter,
	fields: IndexFields,
	prefixes: FieldPrefixes,
	stemmer: Arc<LanguageStemmer>,
	metadata: BTreeMap<String, String>,
	added: usize,
}

impl ContentIndexer {
	/// Replaces whatever is at `dir` with an empty index.
	pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
		let dir = dir.as_ref().to_path_buf();
		let schema = build_schema();
		if dir.exists() { std::fs::remove_dir_all(&dir)?; }
		std::fs::create_dir_all(&dir)?;
		let index = Index::create_in_dir(&dir, schema.clone())?;
		register_tokenizer(&index);
		let fields = IndexFields::from_schema(&schema)?;
		let writer: IndexWriter = index.writer(WRITER_HEAP_BYTES)?;
		let prefixes = FieldPrefixes::standard();
		let mut metadata = BTreeMap::new();
		metadata.insert(PREFIXES_KEY.to_string(), prefixes.to_json());
		debug!(dir = %dir.display(), "created index");
		Ok(Self { dir, writer, fields, prefixes, stemmer: Arc::new(LanguageStemmer::none()), metadata, added: 0 })
	}

	/// Index terms with `prefixes` and record them under [`PREFIXES_KEY`].
	pub fn with_prefixes(mut self, prefixes: FieldPrefixes) -> Self {
		self.metadata.insert(PREFIXES_KEY.to_string(), prefixes.to_json());
		self.prefixes = prefixes;
		self
	}

	/// Also index body word stems for `language`.
	pub fn with_language(mut self, language: &str) -> Self {
		self.stemmer = StemmerCache::new().stemmer_for(Some(language));
		self
	}

	pub fn set_metadata(&mut self, key: &str, value: impl Into<String>) {
		self.metadata.insert(key.to_string(), value.into());
	}

	pub fn remove_metadata(&mut self, key: &str) {
		self.metadata.remove(key);
	}

	pub fn set_stopwords<I, S>(&mut self, stopwords: I) -> Result<()>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let stopwords: Vec<String> = stopwords.into_iter().map(Into::into).collect();
		self.metadata.insert(STOPWORDS_KEY.to_string(), serde_json::to_string(&stopwords)?);
		Ok(())
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	pub fn add(&mut self, document: &IndexDocument) -> Result<()> {
		let mut doc = TantivyDocument::default();
		doc.add_text(self.fields.id, &document.id);

		for term in self.terms_for(document) {
			doc.add_text(self.fields.terms, &term);
		}

		let mut body = format!("{}\n{}", document.title, document.synopsis);
		if let Some(extra) = &document.body {
			body.push('\n');
			body.push_str(extra);
		}
		for stem in self.stems(&body) {
			doc.add_text(self.fields.terms, &format!("{STEM_PREFIX}{stem}"));
		}
		doc.add_text(self.fields.body, &body);

		doc.add_i64(self.fields.sequence_number, document.sequence_number.unwrap_or_default());
		doc.add_i64(self.fields.published, document.published.unwrap_or_default());
		self.writer.add_document(doc)?;
		self.added += 1;
		Ok(())
	}

	fn terms_for(&self, document: &IndexDocument) -> Vec<String> {
		let mut terms = Vec::new();
		let title = self.prefixes.title();
		let mut words: Vec<String> = text_words(&document.title).collect();
		// query terms keep intra-word punctuation out, so "spider-man" is also "spiderman"
		words.extend(split_terms(&document.title).iter().map(|word| word.to_lowercase()));
		words.sort();
		words.dedup();
		terms.extend(words.iter().map(|word| format!("{title}{word}")));
		let exact = exact_title(&document.title);
		if !exact.is_empty() {
			terms.push(format!("{}{exact}", self.prefixes.exact_title()));
		}
		let tag = self.prefixes.tag();
		terms.extend(document.tags.iter().map(|t| format!("{tag}{t}")));
		if let Ok(id) = document.id.parse::<ekn_core::ContentId>() {
			terms.push(format!("{}{}", self.prefixes.id(), id.hash()));
		}
		if !document.content_type.is_empty() {
			terms.push(format!("{}{}", self.prefixes.content_type(), document.content_type.to_lowercase()));
		}
		terms
	}

	/// Distinct stems of the body words, none without a language.
	fn stems(&self, body: &str) -> Vec<String> {
		if !self.stemmer.is_stemming() { return Vec::new(); }
		let mut stems: Vec<String> = text_words(body).map(|word| self.stemmer.stem(&word).into_owned()).collect();
		stems.sort();
		stems.dedup();
		stems
	}

	/// Commits documents and metadata; returns the number of documents added.
	pub fn commit(mut self) -> Result<usize> {
		let payload = serde_json::to_string(&self.metadata)?;
		let mut prepared = self.writer.prepare_commit()?;
		prepared.set_payload(&payload);
		prepared.commit()?;
		self.writer.wait_merging_threads()?;
		info!(dir = %self.dir.display(), documents = self.added, "committed index");
		Ok(self.added)
	}
}
