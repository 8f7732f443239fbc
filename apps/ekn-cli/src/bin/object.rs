use std::env;
use tokio_util::sync::CancellationToken;

use ekn_cli::{init_tracing, Target};

const USAGE: &str = "Usage: ekn-object <id> (--path DIR | --app ID) [--blob]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args: Vec<String> = env::args().skip(1).collect();
    let mut target = Target::default(); let mut id = None; let mut blob = false;
    let mut i = 0; while i < args.len() {
        if target.parse_flag(&args, &mut i)? { i += 1; continue; }
        match args[i].as_str() {
            "--blob" | "-b" => blob = true,
            "--help" | "-h" => { println!("{USAGE}"); return Ok(()); }
            arg if !arg.starts_with('-') => id = Some(arg.to_string()),
            arg => { eprintln!("Unknown option {arg}\n{USAGE}"); std::process::exit(1); }
        }
        i += 1;
    }
    let Some(id) = id else { eprintln!("{USAGE}"); std::process::exit(1) };

    let cancel = CancellationToken::new();
    let (engine, app_id) = target.engine(&cancel).await?;
    if blob {
        match engine.read_blob_for_app(&id, Some(&app_id), &cancel).await? {
            Some(contents) => println!("{}: {} bytes of {}", id, contents.bytes.len(), contents.mime_type),
            None => println!("{}: no such blob", id),
        }
        return Ok(());
    }
    let object = engine.get_object_for_app(&id, Some(&app_id), &cancel).await?;
    println!("{}", serde_json::to_string_pretty(&object)?);
    Ok(())
}
