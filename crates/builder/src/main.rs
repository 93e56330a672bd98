//! prodmatch-build: embed a product catalog and write the embedding store.

use std::path::PathBuf;

use anyhow::Context;
use builder::{BuilderConfig, IndexBuilder};
use catalog::Catalog;
use clap::Parser;
use embed::EmbedMode;
use index::StoreDir;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "prodmatch-build", version, about = "Build the prodmatch embedding store")]
struct Cli {
    /// Catalog JSON file
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Directory image references are resolved against
    #[arg(long)]
    images: Option<PathBuf>,

    /// Embedding store directory
    #[arg(long)]
    store: Option<PathBuf>,

    /// Embedder implementation
    #[arg(long, value_parser = parse_mode)]
    embedder: Option<EmbedMode>,

    /// Embedding workers (0 = available parallelism)
    #[arg(long)]
    workers: Option<usize>,

    /// Write the build report as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Config file (defaults to ./builder.{toml,json,yaml} if present)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn parse_mode(raw: &str) -> Result<EmbedMode, String> {
    match raw.to_ascii_lowercase().as_str() {
        "histogram" => Ok(EmbedMode::Histogram),
        "stub" => Ok(EmbedMode::Stub),
        other => Err(format!("unknown embedder {other:?}, expected histogram or stub")),
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = BuilderConfig::load(cli.config.as_deref())?;
    if let Some(path) = cli.catalog {
        config.catalog_path = path;
    }
    if let Some(path) = cli.images {
        config.image_root = path;
    }
    if let Some(path) = cli.store {
        config.store_dir = path;
    }
    if let Some(mode) = cli.embedder {
        config.embedder.mode = mode;
    }
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str())),
        )
        .init();

    let catalog = Catalog::load(&config.catalog_path)
        .with_context(|| format!("loading catalog {}", config.catalog_path.display()))?;
    let embedder = embed::build_embedder(&config.embedder)?;
    let store_dir =
        StoreDir::new(&config.store_dir).with_retain_generations(config.retain_generations);

    let report = IndexBuilder::new(embedder)
        .with_workers(config.effective_workers())
        .build(&catalog, &config.image_root, &store_dir)?;

    if let Some(path) = cli.report {
        report.write_json(&path)?;
        tracing::info!(path = %path.display(), "build report written");
    }

    println!(
        "indexed {}/{} items into {} ({}), {} skipped",
        report.indexed,
        report.total,
        store_dir.root().display(),
        report.generation,
        report.skipped.len()
    );
    Ok(())
}
