//! Resolution and preparation of a domain's subscription directory.
//!
//! Installed content lives read-only under
//! `<data_dir>/ekn/data/<app_id>/com.endlessm.subscriptions/<id>` (the
//! bundle). The engine works from a writable copy of that layout under the
//! user data dir, made of symlinks into the bundle, so that updates can
//! replace single shards without touching the bundle.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use ekn_core::config::EngineConfig;
use ekn_core::manifest::MANIFEST_FILE;
use ekn_core::Manifest;

use crate::error::{ignore_exists, DomainError, Result};

pub const SUBSCRIPTIONS_DIR: &str = "com.endlessm.subscriptions";
pub const SUBSCRIPTIONS_FILE: &str = "subscriptions.json";
pub const VERSION_FILE: &str = "EKN_VERSION";
pub const SUPPORTED_VERSION: &str = "3";

/// Where a domain's manifest and shards are found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub subscription_id: Option<String>,
    /// Directory holding `manifest.json`; shard paths resolve against it.
    pub dir: PathBuf,
    /// Read-only copy to link missing files from.
    pub bundle_dir: Option<PathBuf>,
}

#[derive(Deserialize)]
struct SubscriptionsFile {
    subscriptions: Vec<Subscription>,
}

#[derive(Deserialize)]
struct Subscription {
    id: String,
}

/// Layout of the content installed for `app_id`.
pub async fn resolve_app(config: &EngineConfig, app_id: &str) -> Result<Layout> {
    let content_dir = config
        .content_dir_for(app_id)
        .ok_or_else(|| DomainError::ContentDirNotFound(app_id.to_string()))?;
    check_version(&content_dir).await?;
    let subscription_id = read_subscription_id(&content_dir.join(SUBSCRIPTIONS_FILE)).await?;
    let dir = config.user_data_dir.join(SUBSCRIPTIONS_DIR).join(&subscription_id);
    let bundle_dir = content_dir.join(SUBSCRIPTIONS_DIR).join(&subscription_id);
    debug!(app_id, subscription_id = %subscription_id, dir = %dir.display(), "resolved subscription");
    Ok(Layout { subscription_id: Some(subscription_id), dir, bundle_dir: Some(bundle_dir) })
}

/// Layout of a domain served straight from `path`.
pub async fn resolve_path(path: &Path) -> Result<Layout> {
    if !tokio::fs::try_exists(path).await? {
        return Err(DomainError::PathNotFound(path.to_path_buf()));
    }
    Ok(Layout { subscription_id: None, dir: path.to_path_buf(), bundle_dir: None })
}

async fn check_version(content_dir: &Path) -> Result<()> {
    let path = content_dir.join(VERSION_FILE);
    let found = match tokio::fs::read_to_string(&path).await {
        Ok(found) => found,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err.into()),
    };
    if found.trim() != SUPPORTED_VERSION {
        return Err(DomainError::UnsupportedVersion { path, found: found.trim().to_string() });
    }
    Ok(())
}

async fn read_subscription_id(path: &Path) -> Result<String> {
    let bad = |reason: String| DomainError::BadSubscriptions { path: path.to_path_buf(), reason };
    let bytes = tokio::fs::read(path).await.map_err(|e| bad(e.to_string()))?;
    let file: SubscriptionsFile = serde_json::from_slice(&bytes).map_err(|e| bad(e.to_string()))?;
    // only the first subscription is served
    file.subscriptions
        .into_iter()
        .next()
        .map(|subscription| subscription.id)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| bad("no subscriptions".to_string()))
}

/// Brings `layout.dir` to a usable state and returns its parsed manifest
/// together with the manifest path.
///
/// Safe to run again on a prepared directory.
pub async fn prepare(layout: &Layout) -> Result<(Manifest, PathBuf)> {
    ignore_exists(tokio::fs::create_dir_all(&layout.dir).await)?;
    let manifest_path = layout.dir.join(MANIFEST_FILE);
    ensure_manifest(layout, &manifest_path).await?;

    let bytes = tokio::fs::read(&manifest_path).await?;
    let manifest = Manifest::from_slice(&bytes).map_err(|err| match err {
        ekn_core::Error::BadManifest(reason) => DomainError::BadManifest(reason),
        other => DomainError::BadManifest(other.to_string()),
    })?;

    remove_dangling_links(&layout.dir).await?;
    if let Some(bundle_dir) = &layout.bundle_dir {
        for entry in &manifest.shards {
            link_bundle_file(&bundle_dir.join(&entry.path), &layout.dir.join(&entry.path)).await?;
        }
    }
    Ok((manifest, manifest_path))
}

async fn ensure_manifest(layout: &Layout, manifest_path: &Path) -> Result<()> {
    if is_dangling_link(manifest_path).await? {
        warn!(path = %manifest_path.display(), "removing dangling manifest link");
        remove_if_present(manifest_path).await?;
    }
    if tokio::fs::try_exists(manifest_path).await? {
        return Ok(());
    }
    let bundled = layout.bundle_dir.as_ref().map(|dir| dir.join(MANIFEST_FILE));
    match bundled {
        Some(bundled) if tokio::fs::try_exists(&bundled).await? => {
            info!(manifest = %bundled.display(), "bootstrapping subscription from bundle");
            ignore_exists(symlink(&bundled, manifest_path).await)?;
            Ok(())
        }
        _ => Err(DomainError::ManifestMissing(layout.dir.clone())),
    }
}

/// Points `local` at `bundled` unless `local` is already a real file or the
/// right link.
async fn link_bundle_file(bundled: &Path, local: &Path) -> Result<()> {
    if !tokio::fs::try_exists(bundled).await? {
        return Ok(());
    }
    match tokio::fs::symlink_metadata(local).await {
        Ok(meta) if meta.file_type().is_symlink() => {
            if tokio::fs::read_link(local).await? == bundled {
                return Ok(());
            }
            debug!(link = %local.display(), "replacing stale shard link");
            remove_if_present(local).await?;
        }
        Ok(_) => return Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(err.into()),
    }
    if let Some(parent) = local.parent() {
        ignore_exists(tokio::fs::create_dir_all(parent).await)?;
    }
    ignore_exists(symlink(bundled, local).await)?;
    debug!(link = %local.display(), target = %bundled.display(), "linked bundled shard");
    Ok(())
}

/// Links left behind by an interrupted install or update.
async fn remove_dangling_links(dir: &Path) -> Result<()> {
    let dir = dir.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<()> {
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.path_is_symlink() || entry.path().exists() {
                continue;
            }
            debug!(link = %entry.path().display(), "removing dangling link");
            match std::fs::remove_file(entry.path()) {
                Err(err) if err.kind() != std::io::ErrorKind::NotFound => return Err(err.into()),
                _ => {}
            }
        }
        Ok(())
    })
    .await?
}

async fn is_dangling_link(path: &Path) -> Result<bool> {
    match tokio::fs::symlink_metadata(path).await {
        Ok(meta) if meta.file_type().is_symlink() => Ok(!tokio::fs::try_exists(path).await?),
        Ok(_) => Ok(false),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}

async fn remove_if_present(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
        _ => Ok(()),
    }
}

#[cfg(unix)]
async fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    tokio::fs::symlink(target, link).await
}

#[cfg(windows)]
async fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    if tokio::fs::metadata(target).await?.is_dir() {
        tokio::fs::symlink_dir(target, link).await
    } else {
        tokio::fs::symlink_file(target, link).await
    }
}
