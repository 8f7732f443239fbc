use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

use ekn_core::ContentId;

use crate::error::{Result, ShardError};
use crate::shard::Record;

/// Hash of the record that holds a shard's link table.
pub const LINK_TABLE_ID: &str = "4dba9091495e8f277893e0d400e9e092f9f6f551";

/// External link → content id, read from a shard's link-table record.
#[derive(Debug, Clone, Default)]
pub struct LinkTable {
    links: HashMap<String, ContentId>,
}

impl LinkTable {
    /// Table held by `record`'s data blob; `None` when it has no data.
    pub async fn load(record: &Record) -> Result<Option<Self>> {
        let Some(data) = record.data() else { return Ok(None) };
        let bytes = data.load_contents().await?;
        Self::from_slice(&bytes).map(Some)
    }

    /// Entries whose target is not a valid id are dropped with a warning.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)?;
        let Value::Object(entries) = value else {
            return Err(ShardError::BadLinkTable("expected a JSON object".into()));
        };
        let mut links = HashMap::with_capacity(entries.len());
        for (link, target) in entries {
            match target.as_str().map(str::parse::<ContentId>) {
                Some(Ok(id)) => { links.insert(link, id); }
                _ => warn!(%link, "skipping link with malformed target"),
            }
        }
        Ok(Self { links })
    }

    pub fn lookup(&self, link: &str) -> Option<&ContentId> {
        self.links.get(link)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}
