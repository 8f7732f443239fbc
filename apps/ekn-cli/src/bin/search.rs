use std::env;
use tokio_util::sync::CancellationToken;

use ekn_cli::{init_tracing, Target};
use ekn_query::{MatchMode, MatchScope, Query};

const USAGE: &str = "Usage: ekn-search <terms> (--path DIR | --app ID) [--limit N] [--offset N] [--tag T]... [--synopsis] [--delimited]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args: Vec<String> = env::args().skip(1).collect();
    let mut target = Target::default();
    let mut terms: Vec<String> = Vec::new(); let mut tags: Vec<String> = Vec::new();
    let mut limit = 10usize; let mut offset = 0usize; let mut synopsis = false; let mut delimited = false;
    let mut i = 0; while i < args.len() {
        if target.parse_flag(&args, &mut i)? { i += 1; continue; }
        match args[i].as_str() {
            "--limit" | "-n" => { match args.get(i + 1).and_then(|v| v.parse().ok()) { Some(n) => { limit = n; i += 1; } None => { eprintln!("Error: --limit requires a number"); std::process::exit(1); } } }
            "--offset" => { match args.get(i + 1).and_then(|v| v.parse().ok()) { Some(n) => { offset = n; i += 1; } None => { eprintln!("Error: --offset requires a number"); std::process::exit(1); } } }
            "--tag" | "-t" => { match args.get(i + 1) { Some(tag) => { tags.push(tag.clone()); i += 1; } None => { eprintln!("Error: --tag requires a value"); std::process::exit(1); } } }
            "--synopsis" => synopsis = true,
            "--delimited" => delimited = true,
            "--help" | "-h" => { println!("{USAGE}"); return Ok(()); }
            arg if !arg.starts_with('-') => terms.push(arg.to_string()),
            arg => { eprintln!("Unknown option {arg}\n{USAGE}"); std::process::exit(1); }
        }
        i += 1;
    }
    if terms.is_empty() && tags.is_empty() { eprintln!("{USAGE}"); std::process::exit(1); }

    let cancel = CancellationToken::new();
    let (engine, app_id) = target.engine(&cancel).await?;
    let mut query = Query::new().with_app_id(&app_id).with_limit(limit).with_offset(offset).with_tags_match_any(tags);
    if !terms.is_empty() { query = query.with_search_terms(terms.join(" ")); }
    if synopsis { query = query.with_match(MatchScope::TitleSynopsis); }
    if delimited { query = query.with_mode(MatchMode::Delimited); }

    let domain = engine.get_domain_for_app(&app_id, &cancel).await?;
    let (fixed, batch) = domain.query_with_fixes(&query, &cancel).await?;
    if let Some(corrected) = fixed.corrected_terms() { println!("Did you mean: {corrected}"); }
    println!("🔍 {} of about {} results for {}", batch.len(), batch.upper_bound, query);
    for (n, object) in batch.objects.iter().enumerate() {
        let content = object.content();
        println!("\n  {}. {}  [{}]", offset + n + 1, object.title(), object.id());
        if !content.synopsis.is_empty() { println!("     {}", content.synopsis); }
        if !content.tags.is_empty() { println!("     tags: {}", content.tags.join(", ")); }
    }
    Ok(())
}
