use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use ekn_core::config::EngineConfig;
use ekn_core::{ContentObject, ErrorKind};
use ekn_domain::{Domain, DomainError, Engine};
use ekn_index::{ContentIndexer, IndexDocument};
use ekn_query::{MatchMode, Query, SortKey};
use ekn_shard::{NewRecord, ShardWriter, LINK_TABLE_ID};

const APP_ID: &str = "com.example.dragons";
const SUBSCRIPTION_ID: &str = "dragons-sub";
const LINK: &str = "https://example.com/wiki/Dragonball";

const ARTICLES: &[(u8, &str, &[&str])] = &[
    (1, "Dragonball", &["anime"]),
    (2, "Moon landing", &["space"]),
    (3, "Dragon tales", &["anime", "books"]),
];

fn hash(n: u8) -> String {
    format!("{n:040x}")
}

fn id(n: u8) -> String {
    format!("ekn:///{}", hash(n))
}

/// Shard `a.shard`, index `index` and their manifest, all under `dir`.
fn write_content(dir: &Path) -> anyhow::Result<()> {
    let mut shard = ShardWriter::create(dir.join("a.shard"))?;
    let mut indexer = ContentIndexer::create(dir.join("index"))?;
    for (n, title, tags) in ARTICLES {
        let metadata = json!({
            "@type": "ekn://_vocab/ArticleObject",
            "@id": id(*n),
            "title": title,
            "synopsis": format!("All about {title}"),
            "tags": tags,
        });
        let mut record = NewRecord::new(hash(*n), metadata.to_string())
            .with_data("body.html", Some("text/html"), format!("<h1>{title}</h1>"));
        if *n == 1 {
            record = record.with_blob("poster", "poster.jpg", None, vec![0xff, 0xd8, 0xff]);
        }
        shard.add(&record)?;
        let object = ContentObject::from_json(&metadata)?;
        indexer.add(&IndexDocument::from_object(&object).with_sequence_number(i64::from(*n)))?;
    }

    let unknown = json!({"@type": "ekn://_vocab/HologramObject", "@id": id(9)});
    shard.add(&NewRecord::new(hash(9), unknown.to_string()))?;
    let links = json!({ "https://example.com/wiki/Dragonball": id(1) });
    shard.add(&NewRecord::new(LINK_TABLE_ID, "{}").with_data("links.json", None, links.to_string()))?;
    shard.finish();
    indexer.commit()?;

    fs::write(
        dir.join("manifest.json"),
        r#"{"shards": [{"path": "a.shard"}], "indexes": [{"path": "index"}]}"#,
    )?;
    Ok(())
}

async fn path_domain() -> (TempDir, Domain) {
    let dir = TempDir::new().expect("tempdir");
    write_content(dir.path()).expect("content");
    let domain = Domain::for_path(APP_ID, dir.path(), &EngineConfig::default(), &CancellationToken::new())
        .await
        .expect("domain");
    (dir, domain)
}

/// An installed app: `data/ekn/data/<app>` holding the bundle, plus an
/// empty user data dir.
struct Install {
    root: TempDir,
    config: EngineConfig,
}

impl Install {
    fn new() -> Self {
        let root = TempDir::new().expect("tempdir");
        let content_dir = root.path().join("data").join("ekn").join("data").join(APP_ID);
        let bundle = content_dir.join("com.endlessm.subscriptions").join(SUBSCRIPTION_ID);
        fs::create_dir_all(&bundle).expect("bundle dir");
        write_content(&bundle).expect("content");
        fs::write(content_dir.join("EKN_VERSION"), "3\n").expect("version");
        fs::write(
            content_dir.join("subscriptions.json"),
            json!({"subscriptions": [{"id": SUBSCRIPTION_ID}]}).to_string(),
        )
        .expect("subscriptions");

        let config = EngineConfig {
            user_data_dir: root.path().join("user"),
            data_dirs: vec![root.path().join("data")],
            default_app_id: Some(APP_ID.to_string()),
            language: None,
        };
        Self { root, config }
    }

    fn content_dir(&self) -> PathBuf {
        self.root.path().join("data").join("ekn").join("data").join(APP_ID)
    }

    fn bundle_dir(&self) -> PathBuf {
        self.content_dir().join("com.endlessm.subscriptions").join(SUBSCRIPTION_ID)
    }

    fn subscription_dir(&self) -> PathBuf {
        self.root.path().join("user").join("com.endlessm.subscriptions").join(SUBSCRIPTION_ID)
    }
}

#[tokio::test]
async fn get_object_decodes_metadata() {
    let (_dir, domain) = path_domain().await;
    let object = domain.get_object(&id(1)).await.expect("object");
    assert!(matches!(object, ContentObject::Article(_)));
    assert_eq!(object.title(), "Dragonball");
    assert_eq!(object.content().tags, ["anime"]);
}

#[tokio::test]
async fn unknown_hash_is_not_found() {
    let (_dir, domain) = path_domain().await;
    let missing = format!("ekn:///acme/{}", "deadbeef".repeat(5));
    let err = domain.get_object(&missing).await.expect_err("no such record");
    assert!(matches!(err, DomainError::IdNotFound(_)), "{err}");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn malformed_ids_and_types_are_format_errors() {
    let (_dir, domain) = path_domain().await;
    let err = domain.get_object("ekn:///not-a-hash").await.expect_err("bad id");
    assert!(matches!(err, DomainError::IdNotValid(_)), "{err}");

    let err = domain.get_object(&id(9)).await.expect_err("unknown type");
    assert!(matches!(err, DomainError::BadFormat { .. }), "{err}");
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[tokio::test]
async fn batch_keeps_request_order() {
    let (_dir, domain) = path_domain().await;
    let cancel = CancellationToken::new();
    let objects = domain.get_object_batch(&[id(3), id(1), id(2)], &cancel).await.expect("batch");
    let titles: Vec<&str> = objects.iter().map(ContentObject::title).collect();
    assert_eq!(titles, ["Dragon tales", "Dragonball", "Moon landing"]);

    let err = domain
        .get_object_batch(&[id(1), id(7), id(2)], &cancel)
        .await
        .expect_err("one id is missing");
    assert!(matches!(err, DomainError::IdNotFound(ref missing) if *missing == id(7)), "{err}");
}

#[tokio::test]
async fn read_blob_returns_data_and_named_blobs() {
    let (_dir, domain) = path_domain().await;

    let data = domain.read_blob(&id(1)).await.expect("read").expect("data blob");
    assert_eq!(data.mime_type, "text/html");
    assert_eq!(data.bytes, b"<h1>Dragonball</h1>");

    let poster = domain.read_blob(&format!("{}/poster", id(1))).await.expect("read").expect("poster");
    assert_eq!(poster.mime_type, "image/jpeg");
    assert_eq!(poster.bytes.len(), 3);
}

#[tokio::test]
async fn read_blob_misses_are_soft() {
    let (_dir, domain) = path_domain().await;
    let thumb = format!("ekn:///acme/{}/thumb", hash(1));
    assert_eq!(domain.read_blob(&thumb).await.expect("read"), None);
    assert_eq!(domain.read_blob(&id(8)).await.expect("read"), None);
    assert_eq!(domain.read_blob(&id(9)).await.expect("read"), None, "record without data");

    let err = domain.read_blob("https://example.com/image.png").await.expect_err("not an ekn uri");
    assert!(matches!(err, DomainError::IdNotValid(_)), "{err}");
}

#[tokio::test]
async fn link_tables_resolve_links() {
    let (_dir, domain) = path_domain().await;
    assert_eq!(domain.test_link(LINK).map(|id| id.to_string()), Some(id(1)));
    assert_eq!(domain.test_link("https://example.com/elsewhere"), None);
}

#[tokio::test]
async fn query_returns_ranked_objects() {
    let (_dir, domain) = path_domain().await;
    let cancel = CancellationToken::new();

    let batch = domain.query(&Query::search("dragonba"), &cancel).await.expect("query");
    assert!(batch.upper_bound >= 1);
    assert_eq!(batch.objects.first().map(ContentObject::title), Some("Dragonball"));

    let batch = domain.query(&Query::search("moon"), &cancel).await.expect("query");
    assert_eq!(batch.upper_bound, 1);
    assert_eq!(batch.objects[0].id().to_string(), id(2));

    let anime = Query::new().with_tags_match_any(["anime"]).with_sort(SortKey::SequenceNumber);
    let batch = domain.query(&anime, &cancel).await.expect("tag query");
    let ids: Vec<String> = batch.objects.iter().map(|o| o.id().to_string()).collect();
    assert_eq!(ids, [id(1), id(3)]);
}

#[tokio::test]
async fn fixed_query_carries_corrections() {
    let (_dir, domain) = path_domain().await;
    let cancel = CancellationToken::new();

    let fixed = domain.get_fixed_query(&Query::search("dragn"), &cancel).await.expect("fix");
    assert_eq!(fixed.corrected_terms(), Some("dragon"));
    assert_eq!(fixed.stopword_free_terms(), None, "index has no stopwords");
    assert_eq!(fixed.search_terms(), Some("dragn"));

    let tags_only = Query::new().with_tags_match_all(["space"]);
    let unchanged = domain.get_fixed_query(&tags_only, &cancel).await.expect("fix");
    assert_eq!(unchanged, tags_only);
}

#[tokio::test]
async fn query_with_fixes_returns_the_query_it_ran() {
    let (_dir, domain) = path_domain().await;
    let cancel = CancellationToken::new();
    let query = Query::search("dragn").with_mode(MatchMode::Delimited);

    let (fixed, batch) = domain.query_with_fixes(&query, &cancel).await.expect("query");
    assert_eq!(fixed, domain.get_fixed_query(&query, &cancel).await.expect("fix"));
    assert_eq!(fixed.corrected_terms(), Some("dragon"));
    let ids: Vec<String> = batch.objects.iter().map(|o| o.id().to_string()).collect();
    assert_eq!(ids, [id(3)]);

    let plain = domain.query(&query, &cancel).await.expect("query");
    assert_eq!(plain.upper_bound, batch.upper_bound);
    assert_eq!(plain.len(), batch.len());
}

#[tokio::test]
async fn cancelled_query_reports_cancellation() {
    let (_dir, domain) = path_domain().await;
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = domain.query(&Query::search("moon"), &cancel).await.expect_err("cancelled");
    assert!(matches!(err, DomainError::Cancelled), "{err}");
    assert_eq!(err.kind(), ErrorKind::Cancelled);
}

#[tokio::test]
async fn missing_path_and_app_id_are_config_errors() {
    let cancel = CancellationToken::new();
    let config = EngineConfig::default();
    let err = Domain::new("", None, &config, &cancel).await.expect_err("nothing to load");
    assert!(matches!(err, DomainError::AppIdNotSet));
    assert_eq!(err.kind(), ErrorKind::Config);

    let dir = TempDir::new().expect("tempdir");
    let err = Domain::for_path(APP_ID, dir.path().join("gone"), &config, &cancel)
        .await
        .expect_err("missing path");
    assert!(matches!(err, DomainError::PathNotFound(_)), "{err}");

    let err = Domain::for_path(APP_ID, dir.path(), &config, &cancel).await.expect_err("no manifest");
    assert!(matches!(err, DomainError::ManifestMissing(_)), "{err}");
}

#[tokio::test]
async fn manifest_naming_a_missing_shard_fails() {
    let dir = TempDir::new().expect("tempdir");
    write_content(dir.path()).expect("content");
    fs::write(
        dir.path().join("manifest.json"),
        r#"{"shards": [{"path": "a.shard"}, {"path": "b.shard"}]}"#,
    )
    .expect("manifest");
    let err = Domain::for_path(APP_ID, dir.path(), &EngineConfig::default(), &CancellationToken::new())
        .await
        .expect_err("b.shard is missing");
    assert_eq!(err.kind(), ErrorKind::NotFound, "{err}");

    fs::write(dir.path().join("manifest.json"), r#"{"indexes": []}"#).expect("manifest");
    let err = Domain::for_path(APP_ID, dir.path(), &EngineConfig::default(), &CancellationToken::new())
        .await
        .expect_err("no shard list");
    assert!(matches!(err, DomainError::BadManifest(_)), "{err}");
}

#[cfg(unix)]
#[tokio::test]
async fn installed_app_links_the_bundle() {
    let install = Install::new();
    let cancel = CancellationToken::new();
    let domain = Domain::for_app(APP_ID, &install.config, &cancel).await.expect("domain");

    let subscription_dir = install.subscription_dir();
    assert_eq!(domain.subscription_id(), Some(SUBSCRIPTION_ID));
    assert_eq!(domain.subscription_dir(), subscription_dir);
    let shard_link = subscription_dir.join("a.shard");
    assert_eq!(fs::read_link(&shard_link).expect("shard link"), install.bundle_dir().join("a.shard"));
    assert_eq!(
        fs::read_link(subscription_dir.join("manifest.json")).expect("manifest link"),
        install.bundle_dir().join("manifest.json")
    );
    assert_eq!(domain.shard_paths().collect::<Vec<_>>(), [shard_link.as_path()]);

    let batch = domain.query(&Query::search("moon"), &cancel).await.expect("query");
    assert_eq!(batch.objects.len(), 1);
    assert_eq!(batch.objects[0].id().to_string(), id(2));
}

#[cfg(unix)]
#[tokio::test]
async fn reinitializing_is_idempotent() {
    let install = Install::new();
    let cancel = CancellationToken::new();
    let first = Domain::for_app(APP_ID, &install.config, &cancel).await.expect("first");
    let first_paths: Vec<PathBuf> = first.shard_paths().map(Path::to_path_buf).collect();

    let subscription_dir = install.subscription_dir();
    std::os::unix::fs::symlink(install.root.path().join("nowhere"), subscription_dir.join("old.shard"))
        .expect("dangling link");

    let second = Domain::for_app(APP_ID, &install.config, &cancel).await.expect("second");
    let second_paths: Vec<PathBuf> = second.shard_paths().map(Path::to_path_buf).collect();
    assert_eq!(first_paths, second_paths);
    assert!(fs::symlink_metadata(subscription_dir.join("old.shard")).is_err(), "dangling link removed");

    let entries = fs::read_dir(&subscription_dir).expect("read dir").count();
    assert_eq!(entries, 2, "manifest and one shard link");
}

#[cfg(unix)]
#[tokio::test]
async fn stale_shard_link_is_replaced() {
    let install = Install::new();
    let subscription_dir = install.subscription_dir();
    fs::create_dir_all(&subscription_dir).expect("subscription dir");
    let elsewhere = install.root.path().join("old-copy");
    write_content(&elsewhere).expect("content");
    std::os::unix::fs::symlink(elsewhere.join("a.shard"), subscription_dir.join("a.shard")).expect("link");

    Domain::for_app(APP_ID, &install.config, &CancellationToken::new()).await.expect("domain");
    assert_eq!(
        fs::read_link(subscription_dir.join("a.shard")).expect("link"),
        install.bundle_dir().join("a.shard")
    );
}

#[tokio::test]
async fn install_problems_are_reported() {
    let cancel = CancellationToken::new();

    let install = Install::new();
    let err = Domain::for_app("com.example.absent", &install.config, &cancel).await.expect_err("not installed");
    assert!(matches!(err, DomainError::ContentDirNotFound(_)), "{err}");
    assert_eq!(err.kind(), ErrorKind::NotFound);

    fs::write(install.content_dir().join("EKN_VERSION"), "2").expect("version");
    let err = Domain::for_app(APP_ID, &install.config, &cancel).await.expect_err("old content");
    assert!(matches!(err, DomainError::UnsupportedVersion { ref found, .. } if found == "2"), "{err}");

    fs::remove_file(install.content_dir().join("EKN_VERSION")).expect("version");
    fs::write(install.content_dir().join("subscriptions.json"), r#"{"subscriptions": []}"#).expect("subscriptions");
    let err = Domain::for_app(APP_ID, &install.config, &cancel).await.expect_err("no subscription");
    assert!(matches!(err, DomainError::BadSubscriptions { .. }), "{err}");
    assert_eq!(err.kind(), ErrorKind::Format);

    let install = Install::new();
    fs::remove_file(install.bundle_dir().join("manifest.json")).expect("manifest");
    let err = Domain::for_app(APP_ID, &install.config, &cancel).await.expect_err("no manifest");
    assert!(matches!(err, DomainError::ManifestMissing(_)), "{err}");
}

#[cfg(unix)]
#[tokio::test]
async fn engine_dispatches_to_cached_domains() {
    let install = Install::new();
    let engine = Engine::new(install.config.clone());
    let cancel = CancellationToken::new();

    let object = engine.get_object(&id(3), &cancel).await.expect("object");
    assert_eq!(object.title(), "Dragon tales");
    let first = engine.get_domain(&cancel).await.expect("domain");
    let again = engine.get_domain_for_app(APP_ID, &cancel).await.expect("domain");
    assert!(Arc::ptr_eq(&first, &again));

    let batch = engine.query(&Query::search("moon"), &cancel).await.expect("query");
    assert_eq!(batch.objects[0].id().to_string(), id(2));
    assert_eq!(engine.test_link(LINK, &cancel).await.expect("link").map(|id| id.to_string()), Some(id(1)));
    let blob = engine.read_blob(&id(2), &cancel).await.expect("read").expect("blob");
    assert_eq!(blob.bytes, b"<h1>Moon landing</h1>");

    let local = TempDir::new().expect("tempdir");
    write_content(local.path()).expect("content");
    let added = engine.add_domain_for_path("local", local.path(), &cancel).await.expect("add");
    let kept = engine.add_domain_for_path("local", install.bundle_dir(), &cancel).await.expect("add again");
    assert!(Arc::ptr_eq(&added, &kept));
    let batch = engine
        .query(&Query::search("dragonba").with_app_id("local"), &cancel)
        .await
        .expect("query local");
    assert_eq!(batch.objects.first().map(ContentObject::title), Some("Dragonball"));
    let object = engine.get_object_for_app(&id(1), Some("local"), &cancel).await.expect("object");
    assert_eq!(object.title(), "Dragonball");
}

#[tokio::test]
async fn engine_without_default_app_needs_an_id() {
    let config = EngineConfig { default_app_id: None, ..EngineConfig::default() };
    let engine = Engine::new(config);
    let cancel = CancellationToken::new();
    let err = engine.get_object(&id(1), &cancel).await.expect_err("no app");
    assert!(matches!(err, DomainError::AppIdNotSet));
    let err = engine.query(&Query::search("moon"), &cancel).await.expect_err("no app");
    assert!(matches!(err, DomainError::AppIdNotSet));
}

#[cfg(unix)]
#[tokio::test]
async fn slow_domain_build_does_not_block_cached_apps() {
    let install = Install::new();
    let engine = Arc::new(Engine::new(install.config.clone()));
    let cancel = CancellationToken::new();
    let cached = engine.get_domain(&cancel).await.expect("domain");

    // A FIFO manifest keeps the build waiting until something is written.
    let slow = TempDir::new().expect("tempdir");
    let manifest = slow.path().join("manifest.json");
    let status = std::process::Command::new("mkfifo").arg(&manifest).status().expect("mkfifo");
    assert!(status.success());

    let building = {
        let engine = Arc::clone(&engine);
        let path = slow.path().to_path_buf();
        tokio::spawn(async move { engine.add_domain_for_path("slow", path, &CancellationToken::new()).await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let again = tokio::time::timeout(std::time::Duration::from_secs(2), engine.get_domain_for_app(APP_ID, &cancel))
        .await
        .expect("cached app served while another builds")
        .expect("domain");
    assert!(Arc::ptr_eq(&cached, &again));
    assert!(!building.is_finished());

    tokio::task::spawn_blocking(move || fs::write(manifest, "not json"))
        .await
        .expect("join")
        .expect("write fifo");
    let err = building.await.expect("join").expect_err("bad manifest");
    assert!(matches!(err, DomainError::BadManifest(_)), "{err}");
}
