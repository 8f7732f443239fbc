//! Configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `EKN_*` env vars
//! (nested keys with `__`, e.g. `EKN_ENGINE__DEFAULT_APP_ID`). Provides the
//! [`EngineConfig`] consumed by the domain engine and helpers to expand `~`
//! and `${VAR}` in paths.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("EKN_").split("__"));

        Ok(Self { figment })
    }

    /// Wrap an already assembled figment (tests, embedding applications).
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Engine settings from the `[engine]` table. A missing table yields the
    /// XDG defaults; present paths are expanded.
    pub fn engine(&self) -> Result<EngineConfig> {
        let raw: RawEngineConfig = if self.figment.contains("engine") {
            self.figment
                .extract_inner("engine")
                .map_err(|e| Error::InvalidConfig(format!("engine: {e}")))?
        } else {
            RawEngineConfig::default()
        };
        Ok(raw.resolve())
    }
}

/// Where the engine looks for installed content and where it keeps the
/// per-user subscription state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// Writable base directory; subscriptions live in
    /// `<user_data_dir>/com.endlessm.subscriptions/<id>`.
    pub user_data_dir: PathBuf,
    /// Read-only data directories searched for `ekn/data/<app_id>`.
    pub data_dirs: Vec<PathBuf>,
    pub default_app_id: Option<String>,
    pub language: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        RawEngineConfig::default().resolve()
    }
}

impl EngineConfig {
    /// First `<data_dir>/ekn/data/<app_id>` that exists on disk.
    pub fn content_dir_for(&self, app_id: &str) -> Option<PathBuf> {
        self.data_dirs
            .iter()
            .map(|dir| dir.join("ekn").join("data").join(app_id))
            .find(|dir| dir.is_dir())
    }

    pub fn with_default_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.default_app_id = Some(app_id.into());
        self
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawEngineConfig {
    user_data_dir: Option<String>,
    data_dirs: Option<Vec<String>>,
    default_app_id: Option<String>,
    language: Option<String>,
}

impl RawEngineConfig {
    fn resolve(self) -> EngineConfig {
        let user_data_dir = self.user_data_dir.map_or_else(default_user_data_dir, expand_path);
        let data_dirs = self
            .data_dirs
            .map(|dirs| dirs.iter().map(expand_path).collect())
            .unwrap_or_else(default_data_dirs);
        EngineConfig {
            user_data_dir,
            data_dirs,
            default_app_id: self.default_app_id.filter(|id| !id.is_empty()),
            language: self.language.filter(|lang| !lang.is_empty()),
        }
    }
}

fn default_user_data_dir() -> PathBuf {
    match env::var("XDG_DATA_HOME") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => expand_path("~/.local/share"),
    }
}

fn default_data_dirs() -> Vec<PathBuf> {
    let dirs = match env::var("XDG_DATA_DIRS") {
        Ok(dirs) if !dirs.is_empty() => dirs,
        _ => "/usr/local/share:/usr/share".to_string(),
    };
    dirs.split(':').filter(|d| !d.is_empty()).map(expand_path).collect()
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
