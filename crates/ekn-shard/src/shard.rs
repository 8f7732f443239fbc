//! Read side of the shard directory format.
//!
//! ```text
//! <shard>/<hash>/metadata.json   record metadata
//! <shard>/<hash>/record.json     optional blob table
//! <shard>/<hash>/<file>          blob payloads
//! ```
//!
//! A directory is a record iff it holds `metadata.json`. Opening a shard
//! scans the record table once; blob payloads are read on demand.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use ekn_core::content_id::is_valid_hash;

use crate::error::{Result, ShardError};

pub const METADATA_FILE: &str = "metadata.json";
pub const RECORD_FILE: &str = "record.json";
pub const METADATA_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct RecordTable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) data: Option<BlobEntry>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub(crate) blobs: BTreeMap<String, BlobEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct BlobEntry {
    pub(crate) file: String,
    #[serde(rename = "contentType", default, skip_serializing_if = "Option::is_none")]
    pub(crate) content_type: Option<String>,
}

/// Blob payload files live directly in the record directory.
pub(crate) fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    path: PathBuf,
    content_type: String,
}

impl Blob {
    fn new(path: PathBuf, content_type: Option<String>) -> Self {
        let content_type = content_type
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| mime_guess::from_path(&path).first_or_octet_stream().to_string());
        Self { path, content_type }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub async fn load_contents(&self) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(&self.path).await?)
    }
}

#[derive(Debug, Clone)]
pub struct Record {
    hash: String,
    metadata: Blob,
    data: Option<Blob>,
    blobs: HashMap<String, Blob>,
}

impl Record {
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn metadata(&self) -> &Blob {
        &self.metadata
    }

    pub fn data(&self) -> Option<&Blob> {
        self.data.as_ref()
    }

    pub fn lookup_blob(&self, name: &str) -> Option<&Blob> {
        self.blobs.get(name)
    }

    pub fn blob_names(&self) -> impl Iterator<Item = &str> {
        self.blobs.keys().map(String::as_str)
    }
}

/// An opened shard: the record table of one shard directory.
#[derive(Debug)]
pub struct ShardFile {
    path: PathBuf,
    records: HashMap<String, Record>,
}

impl ShardFile {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let scan_path = path.clone();
        let records = tokio::task::spawn_blocking(move || scan(&scan_path)).await??;
        debug!(path = %path.display(), records = records.len(), "opened shard");
        Ok(Self { path, records })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn find_record(&self, hash: &str) -> Option<&Record> {
        self.records.get(hash)
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn scan(path: &Path) -> Result<HashMap<String, Record>> {
    if !path.is_dir() {
        return Err(ShardError::NotAShard(path.to_path_buf()));
    }
    let mut records = HashMap::new();
    for entry in WalkDir::new(path).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let Some(hash) = entry.file_name().to_str() else { continue };
        let dir = entry.path();
        if !dir.join(METADATA_FILE).is_file() {
            continue;
        }
        if !is_valid_hash(hash) {
            warn!(shard = %path.display(), entry = hash, "skipping record with malformed hash");
            continue;
        }
        let record = read_record(path, hash, dir)?;
        records.insert(hash.to_string(), record);
    }
    Ok(records)
}

fn read_record(shard: &Path, hash: &str, dir: &Path) -> Result<Record> {
    let bad = |reason: String| ShardError::BadRecord { path: shard.to_path_buf(), hash: hash.to_string(), reason };
    let metadata = Blob::new(dir.join(METADATA_FILE), Some(METADATA_CONTENT_TYPE.to_string()));

    let record_file = dir.join(RECORD_FILE);
    let table: RecordTable = if record_file.is_file() {
        let bytes = std::fs::read(&record_file)?;
        serde_json::from_slice(&bytes).map_err(|e| bad(e.to_string()))?
    } else {
        RecordTable::default()
    };

    let blob = |entry: BlobEntry| {
        if is_plain_file_name(&entry.file) {
            Ok(Blob::new(dir.join(&entry.file), entry.content_type))
        } else {
            Err(bad(format!("blob file {:?} escapes the record", entry.file)))
        }
    };
    let data = table.data.map(&blob).transpose()?;
    let mut blobs = HashMap::with_capacity(table.blobs.len());
    for (name, entry) in table.blobs {
        blobs.insert(name, blob(entry)?);
    }
    Ok(Record { hash: hash.to_string(), metadata, data, blobs })
}
