//! CLI module for auto-cache
//!
//! Operator tooling around a deployed cache:
//! - `key`: print the key a memoized call would use
//! - `get` / `set` / `invalidate`: inspect and update entries

pub mod key;
pub mod store;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// auto-cache - Inspect and maintain memoized values in the configured cache
#[derive(Parser)]
#[command(name = "auto-cache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the cache key of a memoized call
    Key(key::KeyArgs),

    /// Print the value stored under a key
    Get(store::GetArgs),

    /// Store a JSON value under a key
    Set(store::SetArgs),

    /// Delete the value stored under a key
    Invalidate(store::InvalidateArgs),
}

/// Loads configuration, initializes logging and runs the command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    logging::init_logging(&config.logging);

    match cli.command {
        Command::Key(args) => key::run(&args, &config),
        Command::Get(args) => store::get(&args, &config).await,
        Command::Set(args) => store::set(&args, &config).await,
        Command::Invalidate(args) => store::invalidate(&args, &config).await,
    }
}
