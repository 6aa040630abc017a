//! In-memory cache implementation using moka

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache as MokaCache;

use crate::domain::cache::{Cache, Expiration};
use crate::domain::DomainError;

/// Configuration for in-memory cache
#[derive(Debug, Clone)]
pub struct InMemoryCacheConfig {
    /// Maximum number of entries
    pub max_capacity: u64,
    /// Time to idle - entries not accessed for this duration are evicted
    pub time_to_idle: Option<Duration>,
}

impl Default for InMemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            time_to_idle: None,
        }
    }
}

impl InMemoryCacheConfig {
    /// Sets the maximum number of entries
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }

    /// Sets the time-to-idle duration
    pub fn with_time_to_idle(mut self, tti: Duration) -> Self {
        self.time_to_idle = Some(tti);
        self
    }
}

/// Cache entry stored in moka
#[derive(Debug, Clone)]
struct CacheEntry {
    /// Serialized JSON value
    data: String,
    /// Expiration timestamp (millis since epoch), `None` never expires
    expires_at: Option<u64>,
}

/// Thread-safe in-memory cache implementation using moka
///
/// Entries written with [`Expiration::Never`] stay until deleted or evicted
/// for capacity.
#[derive(Debug)]
pub struct InMemoryCache {
    cache: MokaCache<String, CacheEntry>,
    config: InMemoryCacheConfig,
}

impl InMemoryCache {
    /// Creates a new in-memory cache with default configuration
    pub fn new() -> Self {
        Self::with_config(InMemoryCacheConfig::default())
    }

    /// Creates a new in-memory cache with the given configuration
    pub fn with_config(config: InMemoryCacheConfig) -> Self {
        let mut builder = MokaCache::builder().max_capacity(config.max_capacity);

        if let Some(tti) = config.time_to_idle {
            builder = builder.time_to_idle(tti);
        }

        Self {
            cache: builder.build(),
            config,
        }
    }

    pub fn config(&self) -> &InMemoryCacheConfig {
        &self.config
    }

    fn current_time_millis() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    fn is_expired(entry: &CacheEntry) -> bool {
        entry
            .expires_at
            .is_some_and(|expires_at| Self::current_time_millis() > expires_at)
    }

    /// Returns the live entry for `key`, dropping it if expired
    async fn live_entry(&self, key: &str) -> Option<CacheEntry> {
        let entry = self.cache.get(key).await?;

        if Self::is_expired(&entry) {
            self.cache.remove(key).await;
            return None;
        }

        Some(entry)
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self.live_entry(key).await.map(|entry| entry.data))
    }

    async fn set_raw(
        &self,
        key: &str,
        value: &str,
        expiration: Expiration,
    ) -> Result<(), DomainError> {
        // Deadlines past u64 millis are treated as never expiring
        let expires_at = expiration.as_duration().and_then(|ttl| {
            let ttl = u64::try_from(ttl.as_millis()).ok()?;
            Self::current_time_millis().checked_add(ttl)
        });
        let entry = CacheEntry {
            data: value.to_string(),
            expires_at,
        };

        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.cache.remove(key).await.is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.live_entry(key).await.is_some())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError> {
        let Some(entry) = self.live_entry(key).await else {
            return Ok(None);
        };

        Ok(entry.expires_at.map(|expires_at| {
            Duration::from_millis(expires_at.saturating_sub(Self::current_time_millis()))
        }))
    }

    async fn clear(&self) -> Result<(), DomainError> {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        Ok(())
    }

    async fn size(&self) -> Result<usize, DomainError> {
        self.cache.run_pending_tasks().await;
        Ok(self.cache.entry_count() as usize)
    }
}
