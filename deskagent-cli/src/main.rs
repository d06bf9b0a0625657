//! Deskagent CLI — terminal interface for the document QA pipeline.
//!
//! Provides both single-query and interactive REPL modes. A preprocessed
//! document bundle (chunks, tables, embeddings) can be loaded from disk at
//! startup with `--document`.

mod repl;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use deskagent_core::{
    ChunkRecord, DocumentStore, FlatIndex, LexicalOverlapScorer, OllamaEmbedder, Supervisor,
    TableRecord, create_provider, load_config,
};

#[derive(Parser, Debug)]
#[command(name = "deskagent", version, about = "Document-grounded QA and action dispatch", long_about = None)]
struct Cli {
    /// Query to run (starts interactive mode if omitted)
    query: Option<String>,

    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Preprocessed document bundle (JSON with chunks, tables, embeddings)
    #[arg(short, long)]
    document: Option<PathBuf>,

    /// LLM model override
    #[arg(short, long)]
    model: Option<String>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,
}

/// The on-disk form of a preprocessed document, matching the upload
/// endpoint's hand-off format.
#[derive(Debug, Deserialize)]
struct DocumentBundle {
    chunks: Vec<ChunkRecord>,
    #[serde(default)]
    tables: Vec<TableRecord>,
    embeddings: Vec<Vec<f32>>,
}

fn load_document(path: &Path) -> Result<DocumentStore> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read document bundle {}", path.display()))?;
    let bundle: DocumentBundle = serde_json::from_str(&raw)
        .with_context(|| format!("invalid document bundle {}", path.display()))?;
    anyhow::ensure!(
        bundle.embeddings.len() == bundle.chunks.len(),
        "bundle has {} chunks but {} embedding rows",
        bundle.chunks.len(),
        bundle.embeddings.len()
    );
    Ok(DocumentStore::new(
        Box::new(FlatIndex::new(bundle.embeddings)),
        bundle.chunks,
        bundle.tables,
    ))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let mut config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(model) = &cli.model {
        config.llm.model = model.clone();
    }

    let provider = create_provider(&config.llm).context("failed to build generation provider")?;
    let embedder = Arc::new(OllamaEmbedder::new(&config.llm));
    let supervisor = Supervisor::new(config, provider, embedder, Arc::new(LexicalOverlapScorer));

    if let Some(path) = &cli.document {
        let store = load_document(path)?;
        if !cli.quiet {
            println!("Loaded document: {store:?}");
        }
        supervisor.install_document(store).await;
    }

    match cli.query {
        Some(query) => {
            let code = repl::run_single_query(&supervisor, &query).await?;
            Ok(ExitCode::from(code))
        }
        None => {
            repl::run_interactive(&supervisor).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
