//! PhotoId CLI - batch resize a tree of photos into a flat destination directory.
//!
//! Files whose names match the include pattern (and pass the exclusion and age
//! checks) are scaled down when they exceed the requested bounds and copied
//! unchanged otherwise.
//!
//! # Usage
//!
//! ```bash
//! # Shrink everything taller than 500px
//! photoid resize -s ./photos -d ./out -H 500
//!
//! # Only recent JPEGs, skipping raw exports, with a JSONL report
//! photoid resize -s ./photos -d ./out -w 800 -m 'jpe?g' -x _raw -a 7 --report run.jsonl
//!
//! # View configuration
//! photoid config show
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use photoid_core::Config;

mod cli;
mod logging;

/// PhotoId - resize oversized photos, copy the rest.
#[derive(Parser, Debug)]
#[command(name = "photoid")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true, env = "PHOTOID_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Resize or copy every matching file from a source tree into a destination directory
    Resize(cli::resize::ResizeArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

/// An explicit `--config` must load; the default location falls back to defaults.
fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    if let Some(path) = path {
        return Config::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {e}", path.display()));
    }
    // Logging isn't initialized yet, so use eprintln for config warnings.
    Ok(Config::load().unwrap_or_else(|e| {
        eprintln!(
            "Warning: Failed to load config: {e}\n  \
             Using default configuration. Check your config file with `photoid config path`."
        );
        Config::default()
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_ref())?;
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("PhotoId v{}", photoid_core::VERSION);

    match cli.command {
        Commands::Resize(args) => cli::resize::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args, config, cli.config).await,
    }
}
