//! Store commands - read and write entries of the configured cache

use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::domain::cache::{Cache, CacheExt, Expiration};
use crate::infrastructure::cache::{CacheFactory, CacheType};

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Cache key, as printed by the `key` command
    pub key: String,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Cache key, as printed by the `key` command
    pub key: String,

    /// JSON value to store
    pub value: String,

    /// Seconds before the entry expires, 0 keeps it until invalidated
    #[arg(long, default_value_t = 0)]
    pub ttl: u64,
}

#[derive(Args, Debug)]
pub struct InvalidateArgs {
    /// Cache key, as printed by the `key` command
    pub key: String,
}

pub async fn get(args: &GetArgs, config: &AppConfig) -> anyhow::Result<()> {
    let cache = connect(config).await?;

    let value: Option<Value> = cache.get(&args.key).await?;

    match value {
        Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        None => info!(key = %args.key, "No entry"),
    }

    Ok(())
}

pub async fn set(args: &SetArgs, config: &AppConfig) -> anyhow::Result<()> {
    let value: Value = serde_json::from_str(&args.value).context("value must be valid JSON")?;
    let cache = connect(config).await?;

    cache
        .set(&args.key, &value, Expiration::from_secs(args.ttl))
        .await?;
    info!(key = %args.key, ttl = args.ttl, "Stored entry");

    Ok(())
}

pub async fn invalidate(args: &InvalidateArgs, config: &AppConfig) -> anyhow::Result<()> {
    let cache = connect(config).await?;

    if cache.delete(&args.key).await? {
        info!(key = %args.key, "Deleted entry");
    } else {
        info!(key = %args.key, "No entry to delete");
    }

    Ok(())
}

async fn connect(config: &AppConfig) -> anyhow::Result<Arc<dyn Cache>> {
    if config.cache.cache_type == CacheType::InMemory {
        warn!("Configured cache is in-memory, entries do not outlive this command");
    }

    let cache = CacheFactory::new()
        .create(&config.cache)
        .await
        .context("failed to create cache")?;

    Ok(cache)
}
