use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use ekn_core::content_id::is_valid_hash;

use crate::error::{Result, ShardError};
use crate::shard::{is_plain_file_name, BlobEntry, RecordTable, METADATA_FILE, RECORD_FILE};

#[derive(Debug, Clone)]
pub struct NewBlob {
    pub file: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// A record to be written: metadata plus an optional data blob and named blobs.
#[derive(Debug, Clone)]
pub struct NewRecord {
    hash: String,
    metadata: Vec<u8>,
    data: Option<NewBlob>,
    blobs: Vec<(String, NewBlob)>,
}

impl NewRecord {
    pub fn new(hash: impl Into<String>, metadata: impl Into<Vec<u8>>) -> Self {
        Self { hash: hash.into(), metadata: metadata.into(), data: None, blobs: Vec::new() }
    }

    pub fn with_data(mut self, file: &str, content_type: Option<&str>, bytes: impl Into<Vec<u8>>) -> Self {
        self.data = Some(NewBlob { file: file.to_string(), content_type: content_type.map(str::to_string), bytes: bytes.into() });
        self
    }

    pub fn with_blob(mut self, name: &str, file: &str, content_type: Option<&str>, bytes: impl Into<Vec<u8>>) -> Self {
        let blob = NewBlob { file: file.to_string(), content_type: content_type.map(str::to_string), bytes: bytes.into() };
        self.blobs.push((name.to_string(), blob));
        self
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }
}

/// Writes records in the layout [`ShardFile`](crate::ShardFile) reads.
#[derive(Debug)]
pub struct ShardWriter {
    path: PathBuf,
    written: usize,
}

impl ShardWriter {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;
        Ok(Self { path, written: 0 })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn add(&mut self, record: &NewRecord) -> Result<()> {
        let bad = |reason: String| ShardError::BadRecord { path: self.path.clone(), hash: record.hash.clone(), reason };
        if !is_valid_hash(&record.hash) {
            return Err(bad("not a content hash".into()));
        }
        let dir = self.path.join(&record.hash);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(METADATA_FILE), &record.metadata)?;

        let mut table = RecordTable::default();
        let write_blob = |blob: &NewBlob| -> Result<BlobEntry> {
            if !is_plain_file_name(&blob.file) || blob.file == METADATA_FILE || blob.file == RECORD_FILE {
                return Err(bad(format!("unusable blob file name {:?}", blob.file)));
            }
            fs::write(dir.join(&blob.file), &blob.bytes)?;
            Ok(BlobEntry { file: blob.file.clone(), content_type: blob.content_type.clone() })
        };
        table.data = record.data.as_ref().map(&write_blob).transpose()?;
        for (name, blob) in &record.blobs {
            table.blobs.insert(name.clone(), write_blob(blob)?);
        }
        if table.data.is_some() || !table.blobs.is_empty() {
            fs::write(dir.join(RECORD_FILE), serde_json::to_vec_pretty(&table)?)?;
        }
        self.written += 1;
        debug!(shard = %self.path.display(), hash = %record.hash, "wrote record");
        Ok(())
    }

    /// Number of records written so far.
    pub fn finish(self) -> usize {
        self.written
    }
}
