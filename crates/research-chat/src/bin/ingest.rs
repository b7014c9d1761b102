//! Bulk-load a directory of PDFs into the vector index
//!
//! Run with: cargo run -p research-chat --bin research-chat-ingest -- --dir data

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use research_chat::{config::ChatConfig, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(name = "research-chat-ingest", version, about = "Load PDFs into the research chat index")]
struct Args {
    /// Directory scanned recursively for *.pdf files
    #[arg(short, long, default_value = "data")]
    dir: PathBuf,

    /// Follow symbolic links while scanning
    #[arg(long)]
    follow_links: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "research_chat=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = ChatConfig::load()?;
    config.validate()?;

    if !args.dir.is_dir() {
        anyhow::bail!("{} is not a directory", args.dir.display());
    }

    let state = AppState::new(config)
        .await
        .context("Failed to initialize providers")?;

    let mut ingested = 0usize;
    let mut chunks = 0u64;
    let mut failed = Vec::new();

    for entry in WalkDir::new(&args.dir)
        .follow_links(args.follow_links)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        let is_pdf = path
            .extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if !path.is_file() || !is_pdf {
            continue;
        }

        println!("Processing: {}", path.display());
        match state.pipeline().ingest_path(path).await {
            Ok(doc) => {
                ingested += 1;
                chunks += u64::from(doc.total_chunks);
            }
            Err(e) => {
                tracing::error!("Failed to ingest {}: {}", path.display(), e);
                failed.push(path.to_path_buf());
            }
        }
    }

    println!("Ingested {} document(s), {} chunk(s)", ingested, chunks);
    if !failed.is_empty() {
        println!("Failed ({}):", failed.len());
        for path in &failed {
            println!("  {}", path.display());
        }
        std::process::exit(1);
    }

    Ok(())
}
