//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// media-bot: posts a random entry from a local media library to Mastodon on a schedule
#[derive(Parser, Debug)]
#[command(name = "media-bot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Post on a fixed schedule until interrupted
    Run(RunArgs),

    /// Inspect the content library
    Catalog(CatalogArgs),

    /// Print the status text that would be posted for an entry
    Preview(PreviewArgs),

    /// Configuration management
    Config(ConfigArgs),

    /// Validate configuration and show status
    Doctor(DoctorArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Select and render without uploading, publishing or updating state
    #[arg(long)]
    pub dry_run: bool,

    /// Run a single posting cycle and exit
    #[arg(long)]
    pub once: bool,

    /// Discard the persisted schedule; the first post is one interval from now
    #[arg(long, conflicts_with = "once")]
    pub reset_schedule: bool,
}

#[derive(Args, Debug)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub command: CatalogCommands,
}

#[derive(Subcommand, Debug)]
pub enum CatalogCommands {
    /// List loaded entries and skipped metadata documents
    List {
        /// Override content directory
        #[arg(long)]
        content_dir: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load every metadata document and report problems
    Validate {
        /// Override content directory
        #[arg(long)]
        content_dir: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Entry key (metadata file name without extension)
    pub key: String,

    /// Override content directory
    #[arg(long)]
    pub content_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Init {
        /// Path to write config file
        #[arg(long, default_value = "./config.toml")]
        path: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration after file and environment overrides
    Show,
}

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
