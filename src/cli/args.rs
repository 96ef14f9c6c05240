//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Render single slides of HTML or PDF decks
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: slide-embed.toml, searched upward)
    #[arg(short = 'C', long, global = true, default_value = slide_embed::config::CONFIG_FILE, value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Print debug logs
    #[arg(long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Render one embed per source and print the resulting hosts
    #[command(visible_alias = "r")]
    Render {
        #[command(flatten)]
        args: RenderArgs,
    },

    /// List the slides or pages of a deck
    #[command(visible_alias = "i")]
    Inspect {
        /// Deck URL or path (fragment ignored)
        #[arg(value_name = "DECK")]
        deck: String,

        /// Content-type override (e.g. application/pdf)
        #[arg(short = 't', long = "type")]
        content_type: Option<String>,
    },
}

/// Render command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct RenderArgs {
    /// Slide sources: `deck.html#3`, `deck.html#intro`, `talk.pdf#page=2`
    #[arg(value_name = "SRC", required = true)]
    pub sources: Vec<String>,

    /// Target width in px (default from config)
    #[arg(short, long)]
    pub width: Option<String>,

    /// Target height in px (derived from the slide when omitted)
    #[arg(short = 'H', long)]
    pub height: Option<String>,

    /// Content-type override (e.g. application/pdf)
    #[arg(short = 't', long = "type")]
    pub content_type: Option<String>,

    /// Markup rendered instead of a link when a slide cannot be shown
    #[arg(long)]
    pub fallback: Option<String>,

    /// Print host snapshots as JSON instead of HTML
    #[arg(long)]
    pub json: bool,
}
