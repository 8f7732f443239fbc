//! Result types shared by the index, domain and engine layers.

use serde::{Deserialize, Serialize};

use crate::object_model::ContentObject;

/// One page of query results.
///
/// - `upper_bound`: estimated total number of matches, may exceed `objects.len()`
/// - `objects`: hydrated objects in the index's rank order
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResultBatch {
    pub upper_bound: u64,
    pub objects: Vec<ContentObject>,
}

impl ResultBatch {
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Corrected variants of a search text. Either may be missing; neither
/// missing is not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedQuery {
    #[serde(rename = "stopWordCorrectedQuery", default, skip_serializing_if = "Option::is_none")]
    pub stop_word_corrected: Option<String>,
    #[serde(rename = "spellCorrectedQuery", default, skip_serializing_if = "Option::is_none")]
    pub spell_corrected: Option<String>,
}

impl FixedQuery {
    pub fn is_empty(&self) -> bool {
        self.stop_word_corrected.is_none() && self.spell_corrected.is_none()
    }
}

/// Contents of a blob read through an `ekn://` uri.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobContents {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}
