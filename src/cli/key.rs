//! Key command - prints the key a memoized call would use

use std::convert::Infallible;

use anyhow::Context;
use clap::Args;
use serde_json::Value;

use crate::config::AppConfig;
use crate::domain::memoize::{derive_key, KeyError, KeySpec};

#[derive(Args, Debug)]
pub struct KeyArgs {
    /// Stable name of the memoized computation
    #[arg(long, required_unless_present = "key")]
    pub name: Option<String>,

    /// Call arguments as JSON, e.g. '["book", 3]' for positional arguments
    ///
    /// Objects are rendered with sorted fields, as the library does.
    #[arg(long)]
    pub args: Option<String>,

    /// Literal key instead of an automatic one
    #[arg(long, conflicts_with_all = ["name", "args"])]
    pub key: Option<String>,

    /// Version identifier to append, defaults to the configured one
    #[arg(long)]
    pub version_id: Option<String>,

    /// Do not append a version identifier
    #[arg(long, conflicts_with = "version_id")]
    pub no_version: bool,
}

pub fn run(args: &KeyArgs, config: &AppConfig) -> anyhow::Result<()> {
    println!("{}", derive(args, config)?);
    Ok(())
}

/// Derives the key the same way a memoizer configured by `config` would
pub fn derive(args: &KeyArgs, config: &AppConfig) -> anyhow::Result<String> {
    let spec: KeySpec<Value, Infallible> = match &args.key {
        Some(key) => KeySpec::literal(key.clone()),
        None => KeySpec::Auto,
    };

    let arguments = match &args.args {
        Some(json) => serde_json::from_str(json).context("--args must be valid JSON")?,
        None => Value::Null,
    };

    let tagging = !args.no_version
        && (args.version_id.is_some() || config.auto_cache.enable_versioned_auto_cache);
    let version_id = tagging.then(|| {
        args.version_id
            .clone()
            .unwrap_or_else(|| config.environment.version_id.clone())
    });

    let name = args.name.as_deref().unwrap_or_default();

    match derive_key(
        &spec,
        name,
        &arguments,
        version_id.as_deref(),
        config.auto_cache.max_key_length,
    ) {
        Ok(key) => Ok(key),
        Err(KeyError::Render(e)) => Err(e).context("failed to render --args"),
        Err(KeyError::Caller(never)) => match never {},
    }
}
