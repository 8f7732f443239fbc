//! Shared plumbing of the `ekn-*` binaries.
use anyhow::{bail, Context};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ekn_core::config::Config;
use ekn_domain::Engine;

/// App id used for content opened with `--path` and no `--app`.
pub const LOCAL_APP_ID: &str = "local";

/// `RUST_LOG` wins; otherwise `info`.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Which content a command works on: `--path DIR` and/or `--app ID`.
#[derive(Debug, Default)]
pub struct Target {
    pub app_id: Option<String>,
    pub path: Option<PathBuf>,
}

impl Target {
    /// Consumes `--path`/`--app` at `args[*i]`; returns whether it did.
    pub fn parse_flag(&mut self, args: &[String], i: &mut usize) -> anyhow::Result<bool> {
        let flag = args[*i].as_str();
        if flag != "--path" && flag != "--app" { return Ok(false); }
        let Some(value) = args.get(*i + 1) else { bail!("{flag} requires a value") };
        if flag == "--path" { self.path = Some(PathBuf::from(value)); } else { self.app_id = Some(value.clone()); }
        *i += 1;
        Ok(true)
    }

    /// An engine serving this target, and the app id to address it by.
    pub async fn engine(&self, cancel: &CancellationToken) -> anyhow::Result<(Engine, String)> {
        let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?.engine()?;
        let engine = Engine::new(config);
        if let Some(path) = &self.path {
            let app_id = self.app_id.clone().unwrap_or_else(|| LOCAL_APP_ID.to_string());
            engine.add_domain_for_path(&app_id, path, cancel).await.with_context(|| format!("opening {}", path.display()))?;
            return Ok((engine, app_id));
        }
        let app_id = match self.app_id.clone().or_else(|| engine.default_app_id().map(str::to_string)) {
            Some(app_id) => app_id,
            None => bail!("give --path DIR or --app ID (or set engine.default_app_id)"),
        };
        Ok((engine, app_id))
    }
}
