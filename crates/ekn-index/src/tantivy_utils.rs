use tantivy::schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, FAST, STORED, STRING};
use tantivy::tokenizer::{LowerCaser, RemoveLongFilter, SimpleTokenizer, TextAnalyzer};
use tantivy::Index;

use ekn_query::builder::{PUBLISHED_DATE_VALUE_NO, SEQUENCE_NUMBER_VALUE_NO};
use ekn_query::terms::MAX_TERM_LENGTH;

pub const ID_FIELD: &str = "id";
pub const TERMS_FIELD: &str = "terms";
pub const BODY_FIELD: &str = "body";
pub const SEQUENCE_NUMBER_FIELD: &str = "sequence_number";
pub const PUBLISHED_FIELD: &str = "published";

pub const TEXT_ANALYZER: &str = "ekn_text";

/// Prefix of the stemmed body words kept in the `terms` field.
pub const STEM_PREFIX: &str = "Z";

/// `id` holds the record's content id, `terms` the prefixed boolean and
/// title terms verbatim, `body` free text. The two fast fields are the
/// sortable value slots.
pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	schema_builder.add_text_field(ID_FIELD, STRING | STORED);
	schema_builder.add_text_field(TERMS_FIELD, STRING);
	let body_indexing = TextFieldIndexing::default().set_tokenizer(TEXT_ANALYZER).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	schema_builder.add_text_field(BODY_FIELD, TextOptions::default().set_indexing_options(body_indexing));
	schema_builder.add_i64_field(SEQUENCE_NUMBER_FIELD, FAST);
	schema_builder.add_i64_field(PUBLISHED_FIELD, FAST);
	schema_builder.build()
}

pub fn register_tokenizer(index: &Index) {
	let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(RemoveLongFilter::limit(MAX_TERM_LENGTH))
		.filter(LowerCaser)
		.build();
	index.tokenizers().register(TEXT_ANALYZER, tokenizer);
}

/// Body words the way [`TEXT_ANALYZER`] cuts them.
pub fn text_words(text: &str) -> impl Iterator<Item = String> + '_ {
	text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty() && w.len() <= MAX_TERM_LENGTH).map(str::to_lowercase)
}

/// Fast field backing a sort value slot.
pub fn value_field_name(slot: u32) -> Option<&'static str> {
	match slot {
		SEQUENCE_NUMBER_VALUE_NO => Some(SEQUENCE_NUMBER_FIELD),
		PUBLISHED_DATE_VALUE_NO => Some(PUBLISHED_FIELD),
		_ => None,
	}
}

#[derive(Debug, Clone, Copy)]
pub struct IndexFields {
	pub id: Field,
	pub terms: Field,
	pub body: Field,
	pub sequence_number: Field,
	pub published: Field,
}

impl IndexFields {
	pub fn from_schema(schema: &Schema) -> tantivy::Result<Self> {
		Ok(Self {
			id: schema.get_field(ID_FIELD)?,
			terms: schema.get_field(TERMS_FIELD)?,
			body: schema.get_field(BODY_FIELD)?,
			sequence_number: schema.get_field(SEQUENCE_NUMBER_FIELD)?,
			published: schema.get_field(PUBLISHED_FIELD)?,
		})
	}
}
