//! `manifest.json`: the shard and index layout of one domain.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Path relative to the directory holding the manifest.
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub shards: Vec<ManifestEntry>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub indexes: Vec<ManifestEntry>,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<ManifestEntry>, D::Error> {
    Ok(Option::deserialize(deserializer)?.unwrap_or_default())
}

impl Manifest {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let manifest: Self = serde_json::from_slice(bytes).map_err(|e| Error::BadManifest(e.to_string()))?;
        for (list, entries) in [("shards", &manifest.shards), ("indexes", &manifest.indexes)] {
            if entries.iter().any(|entry| entry.path.is_empty()) {
                return Err(Error::BadManifest(format!("empty path in {list}")));
            }
        }
        Ok(manifest)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| Error::BadManifest(format!("{}: {e}", path.display())))?;
        Self::from_slice(&bytes)
    }
}

/// Follow the manifest symlink (if any) and return the directory the real
/// file lives in. Relative manifest entries resolve against it.
pub fn resolve_manifest_dir(manifest_path: &Path) -> std::io::Result<PathBuf> {
    let real = std::fs::canonicalize(manifest_path)?;
    Ok(real.parent().map(Path::to_path_buf).unwrap_or_default())
}
