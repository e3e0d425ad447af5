use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use stash_common::observability::{LogConfig, init_logging};
use stash_config::{StashConfig, StashConfigLoader};
use wiring::build_from_config;

mod cli;
mod wiring;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Load config (env wins)
    let loader = match &cli.config {
        Some(path) => StashConfigLoader::new().with_file(path),
        None => StashConfigLoader::new().with_optional_file("stash.yaml"),
    };
    let cfg: StashConfig = loader.load().context("failed to load configuration")?;

    // 2) Logging from the `logging` section; RUST_LOG still wins
    let log_path = init_logging(LogConfig {
        emit_stderr: cfg.logging.emit_stderr,
        format: cfg.logging.format,
        default_filter: cfg.logging.filter.clone(),
        ..LogConfig::default()
    })?;
    tracing::info!(log = %log_path.display(), variant = ?cfg.variant, "stash.start");

    let wiring = build_from_config(&cfg)?;
    cli.command.run(&wiring).await
}
