//! Field name → term prefix table.
//!
//! Indexes record the prefixes they were built with under the `XbPrefixes`
//! metadata key as
//! `{"prefixes": [{"field", "prefix"}], "booleanPrefixes": [{"field", "prefix"}]}`.
//! Free-text prefixes index lower-cased words; boolean prefixes index
//! values verbatim.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const TITLE_PREFIX: &str = "S";
pub const EXACT_TITLE_PREFIX: &str = "XEXACTS";
pub const TAG_PREFIX: &str = "K";
pub const ID_PREFIX: &str = "Q";
pub const CONTENT_TYPE_PREFIX: &str = "T";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPrefixes {
    free_text: BTreeMap<String, String>,
    boolean: BTreeMap<String, String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PrefixTable {
    #[serde(default)]
    prefixes: Vec<PrefixEntry>,
    #[serde(rename = "booleanPrefixes", default)]
    boolean_prefixes: Vec<PrefixEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PrefixEntry {
    field: String,
    prefix: String,
}

impl Default for FieldPrefixes {
    fn default() -> Self {
        Self::standard()
    }
}

impl FieldPrefixes {
    pub fn empty() -> Self {
        Self { free_text: BTreeMap::new(), boolean: BTreeMap::new() }
    }

    /// title→S, exact_title→XEXACTS, boolean tag→K, boolean id→Q.
    pub fn standard() -> Self {
        Self::empty()
            .with_free_text("title", TITLE_PREFIX)
            .with_free_text("exact_title", EXACT_TITLE_PREFIX)
            .with_boolean("tag", TAG_PREFIX)
            .with_boolean("id", ID_PREFIX)
    }

    pub fn with_free_text(mut self, field: &str, prefix: &str) -> Self {
        self.free_text.insert(field.to_string(), prefix.to_string());
        self
    }

    pub fn with_boolean(mut self, field: &str, prefix: &str) -> Self {
        self.boolean.insert(field.to_string(), prefix.to_string());
        self
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let table: PrefixTable = serde_json::from_str(json)?;
        let mut prefixes = Self::empty();
        for entry in table.prefixes {
            prefixes.free_text.insert(entry.field, entry.prefix);
        }
        for entry in table.boolean_prefixes {
            prefixes.boolean.insert(entry.field, entry.prefix);
        }
        Ok(prefixes)
    }

    pub fn to_json(&self) -> String {
        let entries = |map: &BTreeMap<String, String>| {
            map.iter()
                .map(|(field, prefix)| PrefixEntry { field: field.clone(), prefix: prefix.clone() })
                .collect()
        };
        let table = PrefixTable { prefixes: entries(&self.free_text), boolean_prefixes: entries(&self.boolean) };
        serde_json::to_string(&table).unwrap_or_default()
    }

    /// Prefix registered for `field`, free-text or boolean.
    pub fn prefix_for(&self, field: &str) -> Option<&str> {
        self.free_text.get(field).or_else(|| self.boolean.get(field)).map(String::as_str)
    }

    pub fn is_boolean_field(&self, field: &str) -> bool {
        self.boolean.contains_key(field)
    }

    pub fn is_boolean_prefix(&self, prefix: &str) -> bool {
        self.boolean.values().any(|p| p == prefix)
    }

    pub fn title(&self) -> &str {
        self.prefix_for("title").unwrap_or(TITLE_PREFIX)
    }

    pub fn exact_title(&self) -> &str {
        self.prefix_for("exact_title").unwrap_or(EXACT_TITLE_PREFIX)
    }

    pub fn tag(&self) -> &str {
        self.prefix_for("tag").unwrap_or(TAG_PREFIX)
    }

    pub fn id(&self) -> &str {
        self.prefix_for("id").unwrap_or(ID_PREFIX)
    }

    pub fn content_type(&self) -> &str {
        self.prefix_for("content_type").unwrap_or(CONTENT_TYPE_PREFIX)
    }
}
