//! Content objects decoded from shard metadata documents.
//!
//! Every metadata document carries an `@type` discriminator. The
//! discriminator selects one entry of [`KINDS`], whose decoder reads exactly
//! the fields that kind defines from the parsed JSON tree. Fields absent
//! from the document take their empty value; fields of the wrong JSON type
//! are rejected.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::content_id::ContentId;
use crate::error::{Error, Result};

pub const CONTENT_OBJECT_TYPE: &str = "ekn://_vocab/ContentObject";
pub const ARTICLE_OBJECT_TYPE: &str = "ekn://_vocab/ArticleObject";
pub const IMAGE_OBJECT_TYPE: &str = "ekn://_vocab/ImageObject";
pub const VIDEO_OBJECT_TYPE: &str = "ekn://_vocab/VideoObject";
pub const AUDIO_OBJECT_TYPE: &str = "ekn://_vocab/AudioObject";
pub const DICTIONARY_OBJECT_TYPE: &str = "ekn://_vocab/DictionaryObject";
pub const QUOTE_OBJECT_TYPE: &str = "ekn://_vocab/QuoteObject";
pub const WORD_OBJECT_TYPE: &str = "ekn://_vocab/WordObject";
pub const SET_OBJECT_TYPE: &str = "ekn://_vocab/SetObject";

type Decoder = fn(&Fields<'_>) -> Result<ContentObject>;

/// `@type` → decoder.
const KINDS: &[(&str, Decoder)] = &[
    (CONTENT_OBJECT_TYPE, decode_generic),
    (ARTICLE_OBJECT_TYPE, decode_article),
    (IMAGE_OBJECT_TYPE, decode_image),
    (VIDEO_OBJECT_TYPE, decode_video),
    (AUDIO_OBJECT_TYPE, decode_audio),
    (DICTIONARY_OBJECT_TYPE, decode_dictionary),
    (QUOTE_OBJECT_TYPE, decode_quote),
    (WORD_OBJECT_TYPE, decode_word),
    (SET_OBJECT_TYPE, decode_set),
];

fn decode_generic(f: &Fields<'_>) -> Result<ContentObject> {
    ContentFields::decode(f).map(ContentObject::Generic)
}

fn decode_article(f: &Fields<'_>) -> Result<ContentObject> {
    ArticleObject::decode(f).map(ContentObject::Article)
}

fn decode_image(f: &Fields<'_>) -> Result<ContentObject> {
    ImageObject::decode(f).map(ContentObject::Image)
}

fn decode_video(f: &Fields<'_>) -> Result<ContentObject> {
    VideoObject::decode(f).map(ContentObject::Video)
}

fn decode_audio(f: &Fields<'_>) -> Result<ContentObject> {
    AudioObject::decode(f).map(ContentObject::Audio)
}

fn decode_dictionary(f: &Fields<'_>) -> Result<ContentObject> {
    DictionaryObject::decode(f).map(ContentObject::DictionaryWord)
}

fn decode_quote(f: &Fields<'_>) -> Result<ContentObject> {
    QuoteObject::decode(f).map(ContentObject::QuoteOfDay)
}

fn decode_word(f: &Fields<'_>) -> Result<ContentObject> {
    WordObject::decode(f).map(ContentObject::WordOfDay)
}

fn decode_set(f: &Fields<'_>) -> Result<ContentObject> {
    SetObject::decode(f).map(ContentObject::Set)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentObject {
    Generic(ContentFields),
    Article(ArticleObject),
    Image(ImageObject),
    Video(VideoObject),
    Audio(AudioObject),
    DictionaryWord(DictionaryObject),
    QuoteOfDay(QuoteObject),
    WordOfDay(WordObject),
    Set(SetObject),
}

impl ContentObject {
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_json(&value)
    }

    pub fn from_json(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| Error::BadFormat("metadata is not a JSON object".into()))?;
        let type_name = object
            .get("@type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::BadFormat("metadata has no @type".into()))?;
        let (_, decode) = KINDS
            .iter()
            .find(|(name, _)| *name == type_name)
            .ok_or_else(|| Error::BadFormat(format!("unknown @type {type_name}")))?;
        decode(&Fields { object })
    }

    /// Fields common to every kind.
    pub fn content(&self) -> &ContentFields {
        match self {
            Self::Generic(content) => content,
            Self::Article(o) => &o.content,
            Self::Image(o) => &o.media.content,
            Self::Video(o) => &o.media.content,
            Self::Audio(o) => &o.media.content,
            Self::DictionaryWord(o) => &o.content,
            Self::QuoteOfDay(o) => &o.content,
            Self::WordOfDay(o) => &o.content,
            Self::Set(o) => &o.content,
        }
    }

    pub fn id(&self) -> &ContentId {
        &self.content().id
    }

    pub fn title(&self) -> &str {
        &self.content().title
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Generic(_) => CONTENT_OBJECT_TYPE,
            Self::Article(_) => ARTICLE_OBJECT_TYPE,
            Self::Image(_) => IMAGE_OBJECT_TYPE,
            Self::Video(_) => VIDEO_OBJECT_TYPE,
            Self::Audio(_) => AUDIO_OBJECT_TYPE,
            Self::DictionaryWord(_) => DICTIONARY_OBJECT_TYPE,
            Self::QuoteOfDay(_) => QUOTE_OBJECT_TYPE,
            Self::WordOfDay(_) => WORD_OBJECT_TYPE,
            Self::Set(_) => SET_OBJECT_TYPE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentFields {
    pub id: ContentId,
    pub title: String,
    pub original_title: String,
    pub original_uri: String,
    pub thumbnail_uri: String,
    pub language: String,
    pub copyright_holder: String,
    pub source_uri: String,
    pub content_type: String,
    pub synopsis: String,
    pub last_modified_date: String,
    pub license: String,
    pub featured: bool,
    pub tags: Vec<String>,
    pub resources: Vec<String>,
    pub discovery_feed_content: Option<Value>,
}

impl ContentFields {
    fn decode(f: &Fields<'_>) -> Result<Self> {
        let raw_id = f.string("@id")?;
        if raw_id.is_empty() {
            return Err(Error::BadFormat("metadata has no @id".into()));
        }
        Ok(Self {
            id: raw_id.parse()?,
            title: f.string("title")?,
            original_title: f.string("originalTitle")?,
            original_uri: f.string("originalURI")?,
            thumbnail_uri: f.string("thumbnail")?,
            language: f.string("language")?,
            copyright_holder: f.string("copyrightHolder")?,
            source_uri: f.string("sourceURI")?,
            content_type: f.string("contentType")?,
            synopsis: f.string("synopsis")?,
            last_modified_date: f.string("lastModifiedDate")?,
            license: f.string("license")?,
            featured: f.boolean("featured")?,
            tags: f.strings("tags")?,
            resources: f.strings("resources")?,
            discovery_feed_content: f.object("discoveryFeedContent")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableOfContentsEntry {
    pub index: i64,
    pub index_label: String,
    pub label: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleObject {
    pub content: ContentFields,
    pub source: String,
    pub source_name: String,
    pub published: String,
    pub word_count: u32,
    pub is_server_templated: bool,
    pub authors: Vec<String>,
    pub temporal_coverage: Vec<String>,
    pub outgoing_links: Vec<String>,
    pub table_of_contents: Vec<TableOfContentsEntry>,
}

impl ArticleObject {
    fn decode(f: &Fields<'_>) -> Result<Self> {
        Ok(Self {
            content: ContentFields::decode(f)?,
            source: f.string("source")?,
            source_name: f.string("sourceName")?,
            published: f.string("published")?,
            word_count: f.uint("wordCount")?,
            is_server_templated: f.boolean("isServerTemplated")?,
            authors: f.strings("authors")?,
            temporal_coverage: f.strings("temporalCoverage")?,
            outgoing_links: f.strings("outgoingLinks")?,
            table_of_contents: f.table_of_contents("tableOfContents")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaFields {
    pub content: ContentFields,
    pub caption: String,
    pub width: u32,
    pub height: u32,
    pub parent_uri: String,
}

impl MediaFields {
    fn decode(f: &Fields<'_>) -> Result<Self> {
        Ok(Self {
            content: ContentFields::decode(f)?,
            caption: f.string("caption")?,
            width: f.uint("width")?,
            height: f.uint("height")?,
            parent_uri: f.string("parent")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageObject {
    pub media: MediaFields,
}

impl ImageObject {
    fn decode(f: &Fields<'_>) -> Result<Self> {
        Ok(Self { media: MediaFields::decode(f)? })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoObject {
    pub media: MediaFields,
    pub duration: u32,
    pub transcript: String,
    pub poster_uri: String,
}

impl VideoObject {
    fn decode(f: &Fields<'_>) -> Result<Self> {
        Ok(Self {
            media: MediaFields::decode(f)?,
            duration: f.uint("duration")?,
            transcript: f.string("transcript")?,
            poster_uri: f.string("poster")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioObject {
    pub media: MediaFields,
    pub duration: u32,
    pub transcript: String,
}

impl AudioObject {
    fn decode(f: &Fields<'_>) -> Result<Self> {
        Ok(Self {
            media: MediaFields::decode(f)?,
            duration: f.uint("duration")?,
            transcript: f.string("transcript")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DictionaryObject {
    pub content: ContentFields,
    pub word: String,
    pub definition: String,
    pub part_of_speech: String,
}

impl DictionaryObject {
    fn decode(f: &Fields<'_>) -> Result<Self> {
        Ok(Self {
            content: ContentFields::decode(f)?,
            word: f.string("word")?,
            definition: f.string("definition")?,
            part_of_speech: f.string("partOfSpeech")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteObject {
    pub content: ContentFields,
    pub quote: String,
    pub author: String,
}

impl QuoteObject {
    fn decode(f: &Fields<'_>) -> Result<Self> {
        Ok(Self {
            content: ContentFields::decode(f)?,
            quote: f.string("quote")?,
            author: f.string("author")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordObject {
    pub content: ContentFields,
    pub word: String,
    pub definition: String,
    pub word_type: String,
}

impl WordObject {
    fn decode(f: &Fields<'_>) -> Result<Self> {
        Ok(Self {
            content: ContentFields::decode(f)?,
            word: f.string("word")?,
            definition: f.string("definition")?,
            word_type: f.string("type")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetObject {
    pub content: ContentFields,
    pub child_tags: Vec<String>,
}

impl SetObject {
    fn decode(f: &Fields<'_>) -> Result<Self> {
        Ok(Self {
            content: ContentFields::decode(f)?,
            child_tags: f.strings("childTags")?,
        })
    }
}

/// Typed accessors over one metadata object. `null` counts as absent.
struct Fields<'a> {
    object: &'a Map<String, Value>,
}

impl Fields<'_> {
    fn get(&self, key: &str) -> Option<&Value> {
        self.object.get(key).filter(|v| !v.is_null())
    }

    fn mismatch(key: &str, expected: &str) -> Error {
        Error::BadFormat(format!("expected {expected} for {key}"))
    }

    fn string(&self, key: &str) -> Result<String> {
        match self.get(key) {
            None => Ok(String::new()),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(Self::mismatch(key, "a string")),
        }
    }

    fn boolean(&self, key: &str) -> Result<bool> {
        match self.get(key) {
            None => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(_) => Err(Self::mismatch(key, "a boolean")),
        }
    }

    fn uint(&self, key: &str) -> Result<u32> {
        match self.get(key) {
            None => Ok(0),
            Some(v) => v
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| Self::mismatch(key, "an unsigned integer")),
        }
    }

    fn strings(&self, key: &str) -> Result<Vec<String>> {
        match self.get(key) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| Self::mismatch(key, "an array of strings"))
                })
                .collect(),
            Some(_) => Err(Self::mismatch(key, "an array of strings")),
        }
    }

    fn object(&self, key: &str) -> Result<Option<Value>> {
        match self.get(key) {
            None => Ok(None),
            Some(v @ Value::Object(_)) => Ok(Some(v.clone())),
            Some(_) => Err(Self::mismatch(key, "an object")),
        }
    }

    fn table_of_contents(&self, key: &str) -> Result<Vec<TableOfContentsEntry>> {
        let Some(value) = self.get(key) else { return Ok(Vec::new()) };
        let items = value.as_array().ok_or_else(|| Self::mismatch(key, "an array"))?;
        items
            .iter()
            .map(|item| {
                let entry = item.as_object().ok_or_else(|| Self::mismatch(key, "an array of objects"))?;
                let entry = Fields { object: entry };
                let index = entry
                    .get("hasIndex")
                    .and_then(Value::as_i64)
                    .ok_or_else(|| Self::mismatch("hasIndex", "an integer"))?;
                Ok(TableOfContentsEntry {
                    index,
                    index_label: entry.string("hasIndexLabel")?,
                    label: entry.string("hasLabel")?,
                    content: entry.string("hasContent")?,
                })
            })
            .collect()
    }
}
