use anyhow::{bail, Context};
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use std::{env, fs, path::PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use ekn_cli::{init_tracing, LOCAL_APP_ID};
use ekn_core::config::{resolve_with_base, EngineConfig};
use ekn_core::manifest::{resolve_manifest_dir, MANIFEST_FILE};
use ekn_core::{ContentObject, Manifest};
use ekn_domain::Domain;
use ekn_index::{ContentIndexer, IndexDocument};

const USAGE: &str = "Usage: ekn-indexer --path DIR [--language LANG] [--stopwords FILE]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args: Vec<String> = env::args().skip(1).collect();
    let mut path = None; let mut language = None; let mut stopwords = None;
    let mut i = 0; while i < args.len() {
        let value = args.get(i + 1).cloned();
        match args[i].as_str() {
            "--path" | "-p" => { path = value.map(PathBuf::from); i += 1; }
            "--language" | "-l" => { language = value; i += 1; }
            "--stopwords" => { stopwords = value.map(PathBuf::from); i += 1; }
            "--help" | "-h" => { println!("{USAGE}"); return Ok(()); }
            arg => { eprintln!("Unknown argument {arg}\n{USAGE}"); std::process::exit(1); }
        }
        i += 1;
    }
    let Some(path) = path else { eprintln!("{USAGE}"); std::process::exit(1) };

    let cancel = CancellationToken::new();
    let domain = Domain::for_path(LOCAL_APP_ID, &path, &EngineConfig::default(), &cancel).await?;
    let manifest_path = domain.subscription_dir().join(MANIFEST_FILE);
    let manifest = Manifest::from_file(&manifest_path)?;
    let Some(entry) = manifest.indexes.first() else { bail!("{} lists no index to build", manifest_path.display()) };
    let index_dir = resolve_with_base(&resolve_manifest_dir(&manifest_path)?, &entry.path);
    println!("ekn indexer\n===========");
    println!("Content: {}", path.display()); println!("Index: {}", index_dir.display());

    let documents = collect_documents(&domain).await?;
    let stopwords = match &stopwords {
        Some(file) => Some(fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?),
        None => None,
    };
    let indexed = tokio::task::spawn_blocking(move || -> anyhow::Result<usize> {
        let mut indexer = ContentIndexer::create(&index_dir)?;
        if let Some(language) = &language { indexer = indexer.with_language(language); }
        if let Some(words) = &stopwords { indexer.set_stopwords(words.lines().map(str::trim).filter(|w| !w.is_empty()))?; }
        let pb = ProgressBar::new(documents.len() as u64);
        pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} records ({percent}%) {msg}")?.progress_chars("#>-"));
        for document in &documents { indexer.add(document)?; pb.inc(1); pb.set_message(document.title.clone()); }
        pb.finish_with_message("done");
        Ok(indexer.commit()?)
    }).await??;
    println!("\n✅ Indexed {} records", indexed);
    Ok(())
}

/// One document per decodable record, numbered in shard then id order.
async fn collect_documents(domain: &Domain) -> anyhow::Result<Vec<IndexDocument>> {
    let tags = Regex::new(r"(?s)<[^>]*>")?;
    let mut documents = Vec::new();
    for shard in domain.shards() {
        let mut records: Vec<_> = shard.records().collect();
        records.sort_by(|a, b| a.hash().cmp(b.hash()));
        for record in records {
            let metadata = record.metadata().load_contents().await?;
            let object = match ContentObject::from_json_slice(&metadata) {
                Ok(object) => object,
                Err(err) => { debug!(hash = record.hash(), error = %err, "not a content object, skipping"); continue; }
            };
            let mut document = IndexDocument::from_object(&object).with_sequence_number(documents.len() as i64);
            if let Some(data) = record.data() {
                let text = match data.content_type() {
                    "text/plain" => Some(String::from_utf8_lossy(&data.load_contents().await?).into_owned()),
                    "text/html" => Some(tags.replace_all(&String::from_utf8_lossy(&data.load_contents().await?), " ").into_owned()),
                    _ => None,
                };
                if let Some(text) = text { document = document.with_body(text); }
            }
            documents.push(document);
        }
    }
    if documents.is_empty() { warn!("no content objects found"); }
    Ok(documents)
}
