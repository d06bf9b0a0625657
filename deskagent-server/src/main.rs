//! Deskagent HTTP server.
//!
//! Serves the chat and upload endpoints over the core pipeline. Document
//! ingestion happens out of process; this binary accepts the preprocessed
//! bundle on `/upload` and answers queries on `/chat`.

mod routes;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

use deskagent_core::{LexicalOverlapScorer, OllamaEmbedder, Supervisor, create_provider, load_config};

use crate::routes::{AppState, router};

#[derive(Parser, Debug)]
#[command(name = "deskagent-server", about = "Document QA and action-dispatch HTTP server", version)]
struct Cli {
    /// Path to a TOML config file (environment variables override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address override, e.g. 0.0.0.0:8501
    #[arg(short, long)]
    bind: Option<String>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "deskagent_core=debug,deskagent_server=debug,info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    let bind_addr = cli.bind.unwrap_or_else(|| config.server.bind_addr.clone());
    let max_upload_bytes = config.server.max_upload_bytes;

    let provider = create_provider(&config.llm).context("failed to build generation provider")?;
    let embedder = Arc::new(OllamaEmbedder::new(&config.llm));
    let scorer = Arc::new(LexicalOverlapScorer);
    info!(model = provider.model_name(), "Generation provider ready");

    let state = AppState {
        supervisor: Arc::new(Supervisor::new(config, provider, embedder, scorer)),
        started_at: Instant::now(),
    };
    let app = router(state, max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "Deskagent server listening");
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
