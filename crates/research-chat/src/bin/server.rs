//! Research chat server binary
//!
//! Run with: cargo run -p research-chat --bin research-chat-server

use research_chat::{config::ChatConfig, server::ChatServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "research_chat=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ChatConfig::load()?;
    config.validate()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Chat model: {}", config.openai.chat_model);
    tracing::info!("  - Embedding model: {}", config.openai.embed_model);
    tracing::info!(
        "  - Index: {} ({} dims, {:?})",
        config.vector_db.index_name,
        config.vector_db.dimension,
        config.vector_db.metric
    );
    tracing::info!(
        "  - Chunking: {} chars, {} overlap",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );
    tracing::info!("  - Answer mode: {:?}", config.agent.mode);
    match config.telemetry.langtrace_api_key {
        Some(_) => tracing::info!("  - Langtrace key present (tracing export not wired)"),
        None => tracing::info!("  - Langtrace key not set"),
    }

    let server = ChatServer::new(config).await?;

    println!("\nServer starting...");
    println!("  UI: http://{}/", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("\nEndpoints:");
    println!("  POST /upload - Upload PDFs (multipart field 'files')");
    println!("  POST /ask    - Ask a question ({{\"question\": \"...\"}})");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
