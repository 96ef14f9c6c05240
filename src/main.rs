//! slide-embed - render single slides of shared HTML or PDF decks.

mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use slide_embed::{DeckStore, EmbedConfig, EmbedSettings, logger};

pub(crate) use slide_embed::log;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let cwd = std::env::current_dir().context("failed to read working directory")?;
    let config = EmbedConfig::load(&cwd, &cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    let settings = EmbedSettings::from_config(&config, &cwd)?;
    let store = Arc::new(DeckStore::from_config(&config).context("failed to build HTTP client")?);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(async {
        match &cli.command {
            Commands::Render { args } => cli::render::run_render(args, store, &settings).await,
            Commands::Inspect { deck, content_type } => {
                cli::inspect::run_inspect(deck, content_type.as_deref(), &store, &settings.base)
                    .await
            }
        }
    })
}
