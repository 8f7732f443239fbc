use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ekn_core::config::{resolve_with_base, EngineConfig};
use ekn_core::{BlobContents, ContentId, ContentObject, ResultBatch};
use ekn_index::IndexManager;
use ekn_query::{Query, QueryBuilder};
use ekn_shard::{LinkTable, Record, ShardFile, LINK_TABLE_ID};

use crate::error::{DomainError, Result};
use crate::gather::{gather_ordered, GatherPolicy};
use crate::setup::{self, Layout};

/// The content of one application: its shards, their link tables and the
/// full-text index over them.
///
/// Shards and link tables are fixed once the domain is built. Index access
/// is serialized per domain; object reads are not.
pub struct Domain {
    app_id: String,
    language: Option<String>,
    subscription_id: Option<String>,
    subscription_dir: PathBuf,
    shards: Vec<ShardFile>,
    link_tables: Vec<LinkTable>,
    index: Arc<Mutex<IndexManager>>,
}

impl std::fmt::Debug for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Domain")
            .field("app_id", &self.app_id)
            .field("subscription_dir", &self.subscription_dir)
            .field("shards", &self.shards.len())
            .field("link_tables", &self.link_tables.len())
            .finish_non_exhaustive()
    }
}

impl Domain {
    /// Domain of the content installed for `app_id`.
    pub async fn for_app(app_id: &str, config: &EngineConfig, cancel: &CancellationToken) -> Result<Self> {
        Self::new(app_id, None, config, cancel).await
    }

    /// Domain served from the manifest in `path`.
    pub async fn for_path(
        app_id: &str,
        path: impl AsRef<Path>,
        config: &EngineConfig,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        Self::new(app_id, Some(path.as_ref()), config, cancel).await
    }

    /// An explicit non-empty `path` wins over the installed content of `app_id`.
    pub async fn new(
        app_id: &str,
        path: Option<&Path>,
        config: &EngineConfig,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let layout = match path.filter(|p| !p.as_os_str().is_empty()) {
            Some(path) => setup::resolve_path(path).await?,
            None if !app_id.is_empty() => setup::resolve_app(config, app_id).await?,
            None => return Err(DomainError::AppIdNotSet),
        };
        Self::open(app_id, layout, config, cancel).await
    }

    async fn open(app_id: &str, layout: Layout, config: &EngineConfig, cancel: &CancellationToken) -> Result<Self> {
        let (manifest, manifest_path) = setup::prepare(&layout).await?;

        let opens = manifest.shards.iter().map(|entry| {
            let path = resolve_with_base(&layout.dir, &entry.path);
            async move { Ok::<_, DomainError>(ShardFile::open(path).await?) }
        });
        let shards = gather_ordered(opens, cancel, GatherPolicy::AbortOnError).await?;

        let mut link_tables = Vec::new();
        for shard in &shards {
            let Some(record) = shard.find_record(LINK_TABLE_ID) else { continue };
            match LinkTable::load(record).await {
                Ok(Some(table)) => link_tables.push(table),
                Ok(None) => {}
                Err(err) => warn!(shard = %shard.path().display(), error = %err, "skipping unreadable link table"),
            }
        }

        info!(
            app_id,
            dir = %layout.dir.display(),
            shards = shards.len(),
            link_tables = link_tables.len(),
            "domain ready"
        );
        Ok(Self {
            app_id: app_id.to_string(),
            language: config.language.clone(),
            subscription_id: layout.subscription_id,
            subscription_dir: layout.dir,
            shards,
            link_tables,
            index: Arc::new(Mutex::new(IndexManager::new(manifest_path))),
        })
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn subscription_id(&self) -> Option<&str> {
        self.subscription_id.as_deref()
    }

    pub fn subscription_dir(&self) -> &Path {
        &self.subscription_dir
    }

    pub fn shard_paths(&self) -> impl Iterator<Item = &Path> {
        self.shards.iter().map(ShardFile::path)
    }

    pub fn shards(&self) -> &[ShardFile] {
        &self.shards
    }

    /// In-domain id a link points at, from the first link table knowing it.
    pub fn test_link(&self, link: &str) -> Option<ContentId> {
        self.link_tables.iter().find_map(|table| table.lookup(link)).cloned()
    }

    fn find_record(&self, hash: &str) -> Option<&Record> {
        self.shards.iter().find_map(|shard| shard.find_record(hash))
    }

    pub async fn get_object(&self, id: &str) -> Result<ContentObject> {
        let content_id: ContentId = id.parse().map_err(|_| DomainError::IdNotValid(id.to_string()))?;
        let record = self
            .find_record(content_id.hash())
            .ok_or_else(|| DomainError::IdNotFound(id.to_string()))?;
        let bytes = record.metadata().load_contents().await.map_err(DomainError::from)?;
        ContentObject::from_json_slice(&bytes)
            .map_err(|err| DomainError::BadFormat { id: id.to_string(), reason: err.to_string() })
    }

    /// Objects for `ids`, in the order of `ids`. Every fetch runs to the end
    /// before the first failure is reported.
    pub async fn get_object_batch<S: AsRef<str>>(
        &self,
        ids: &[S],
        cancel: &CancellationToken,
    ) -> Result<Vec<ContentObject>> {
        let fetches = ids.iter().map(|id| self.get_object(id.as_ref()));
        gather_ordered(fetches, cancel, GatherPolicy::Settle).await
    }

    /// `query` with the stopword-free and spell-corrected text the index
    /// suggests, or `query` itself when there is nothing to correct.
    pub async fn get_fixed_query(&self, query: &Query, cancel: &CancellationToken) -> Result<Query> {
        let Some(text) = query.search_terms().filter(|_| query.has_search_text()).map(str::to_string) else {
            return Ok(query.clone());
        };
        let fixed = self.with_index(cancel, move |index| index.fix(&text)).await?;
        debug!(stop_word_corrected = ?fixed.stop_word_corrected, spell_corrected = ?fixed.spell_corrected, "fixed query");

        let mut query = query.clone();
        if let Some(text) = fixed.stop_word_corrected {
            query = query.with_stopword_free_terms(text);
        }
        if let Some(text) = fixed.spell_corrected {
            query = query.with_corrected_terms(text);
        }
        Ok(query)
    }

    /// Runs `query` against the index and loads the ranked objects.
    pub async fn query(&self, query: &Query, cancel: &CancellationToken) -> Result<ResultBatch> {
        let (_, batch) = self.query_with_fixes(query, cancel).await?;
        Ok(batch)
    }

    /// Like [`Domain::query`], also returning the fixed query that ran.
    pub async fn query_with_fixes(&self, query: &Query, cancel: &CancellationToken) -> Result<(Query, ResultBatch)> {
        let query = if query.has_search_text() {
            self.get_fixed_query(query, cancel).await?
        } else {
            query.clone()
        };
        let fixed = query.clone();
        let language = self.language.clone();
        let results = self
            .with_index(cancel, move |index| {
                let request = QueryBuilder::new(index.prefixes()?).build(&query);
                debug!(
                    query_string = ?request.query_string,
                    filter = ?request.filter,
                    filter_out = ?request.filter_out,
                    "executing query"
                );
                index.execute(&request, language.as_deref())
            })
            .await?;
        let objects = self.get_object_batch(&results.ids, cancel).await?;
        Ok((fixed, ResultBatch { upper_bound: results.upper_bound, objects }))
    }

    /// Contents of the blob an `ekn://` uri names: the record's data, or the
    /// named blob when the uri carries a resource.
    ///
    /// A well-formed uri naming nothing here yields `Ok(None)`.
    pub async fn read_blob(&self, uri: &str) -> Result<Option<BlobContents>> {
        let id: ContentId = uri.parse().map_err(|_| DomainError::IdNotValid(uri.to_string()))?;
        let Some(record) = self.find_record(id.hash()) else {
            debug!(uri, "no record for blob");
            return Ok(None);
        };
        let blob = match id.resource() {
            Some(name) => record.lookup_blob(name),
            None => record.data(),
        };
        let Some(blob) = blob else {
            debug!(uri, "record has no such blob");
            return Ok(None);
        };
        let bytes = blob.load_contents().await.map_err(DomainError::from)?;
        Ok(Some(BlobContents { bytes, mime_type: blob.content_type().to_string() }))
    }

    /// Runs `work` on the blocking pool while holding the index lock.
    async fn with_index<T, F>(&self, cancel: &CancellationToken, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut IndexManager) -> ekn_index::Result<T> + Send + 'static,
    {
        let index = Arc::clone(&self.index);
        let task = async move {
            let mut guard = index.lock_owned().await;
            let result = tokio::task::spawn_blocking(move || work(&mut guard)).await?;
            Ok::<T, DomainError>(result?)
        };
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(DomainError::Cancelled),
            result = task => result,
        }
    }
}
