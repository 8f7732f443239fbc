use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use ekn_core::config::EngineConfig;
use ekn_core::{BlobContents, ContentId, ContentObject, ResultBatch};
use ekn_query::Query;

use crate::domain::Domain;
use crate::error::{DomainError, Result};

type DomainSlot = Arc<OnceCell<Arc<Domain>>>;

/// Routes requests to the [`Domain`] of each application, building domains
/// on first use.
///
/// The map lock only guards slot lookup; each domain builds inside its own
/// slot.
pub struct Engine {
    config: EngineConfig,
    domains: Mutex<HashMap<String, DomainSlot>>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config, domains: Mutex::new(HashMap::new()) }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn default_app_id(&self) -> Option<&str> {
        self.config.default_app_id.as_deref()
    }

    fn resolve_app_id<'a>(&'a self, app_id: Option<&'a str>) -> Result<&'a str> {
        app_id
            .filter(|id| !id.is_empty())
            .or_else(|| self.default_app_id())
            .ok_or(DomainError::AppIdNotSet)
    }

    async fn slot(&self, app_id: &str) -> DomainSlot {
        let mut domains = self.domains.lock().await;
        Arc::clone(domains.entry(app_id.to_string()).or_default())
    }

    /// A failed build is not cached; the next call tries again.
    pub async fn get_domain_for_app(&self, app_id: &str, cancel: &CancellationToken) -> Result<Arc<Domain>> {
        if app_id.is_empty() {
            return Err(DomainError::AppIdNotSet);
        }
        let slot = self.slot(app_id).await;
        let domain = slot
            .get_or_try_init(|| async {
                debug!(app_id, "building domain");
                Domain::for_app(app_id, &self.config, cancel).await.map(Arc::new)
            })
            .await?;
        Ok(Arc::clone(domain))
    }

    pub async fn get_domain(&self, cancel: &CancellationToken) -> Result<Arc<Domain>> {
        let app_id = self.resolve_app_id(None)?;
        self.get_domain_for_app(app_id, cancel).await
    }

    /// Serves `app_id` from the content at `path`. Keeps the existing domain
    /// if `app_id` already has one.
    pub async fn add_domain_for_path(
        &self,
        app_id: &str,
        path: impl AsRef<Path>,
        cancel: &CancellationToken,
    ) -> Result<Arc<Domain>> {
        let slot = self.slot(app_id).await;
        let domain = slot
            .get_or_try_init(|| async {
                debug!(app_id, path = %path.as_ref().display(), "building domain");
                Domain::for_path(app_id, path.as_ref(), &self.config, cancel).await.map(Arc::new)
            })
            .await?;
        Ok(Arc::clone(domain))
    }

    /// Runs `query` in the domain of its app id, or of the default app.
    pub async fn query(&self, query: &Query, cancel: &CancellationToken) -> Result<ResultBatch> {
        let app_id = self.resolve_app_id(query.app_id())?;
        self.get_domain_for_app(app_id, cancel).await?.query(query, cancel).await
    }

    pub async fn get_object(&self, id: &str, cancel: &CancellationToken) -> Result<ContentObject> {
        self.get_object_for_app(id, None, cancel).await
    }

    pub async fn get_object_for_app(
        &self,
        id: &str,
        app_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<ContentObject> {
        let app_id = self.resolve_app_id(app_id)?;
        self.get_domain_for_app(app_id, cancel).await?.get_object(id).await
    }

    pub async fn test_link(&self, link: &str, cancel: &CancellationToken) -> Result<Option<ContentId>> {
        self.test_link_for_app(link, None, cancel).await
    }

    pub async fn test_link_for_app(
        &self,
        link: &str,
        app_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Option<ContentId>> {
        let app_id = self.resolve_app_id(app_id)?;
        Ok(self.get_domain_for_app(app_id, cancel).await?.test_link(link))
    }

    pub async fn read_blob(&self, uri: &str, cancel: &CancellationToken) -> Result<Option<BlobContents>> {
        self.read_blob_for_app(uri, None, cancel).await
    }

    pub async fn read_blob_for_app(
        &self,
        uri: &str,
        app_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Option<BlobContents>> {
        let app_id = self.resolve_app_id(app_id)?;
        self.get_domain_for_app(app_id, cancel).await?.read_blob(uri).await
    }
}
