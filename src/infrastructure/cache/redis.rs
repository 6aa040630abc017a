//! Redis cache implementation

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use crate::domain::cache::{Cache, Expiration};
use crate::domain::DomainError;

/// Configuration for Redis cache
#[derive(Debug, Clone)]
pub struct RedisCacheConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Key prefix for namespacing
    pub key_prefix: Option<String>,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: None,
        }
    }
}

impl RedisCacheConfig {
    /// Creates a new configuration with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Sets the key prefix
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }
}

/// Redis cache implementation
///
/// [`Expiration::Never`] maps to a plain `SET`, timed entries to `SETEX`.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
    config: RedisCacheConfig,
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisCache {
    /// Creates a new Redis cache connection
    pub async fn new(config: RedisCacheConfig) -> Result<Self, DomainError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| DomainError::cache(format!("Failed to create Redis client: {}", e)))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self { connection, config })
    }

    fn prefix_key(&self, key: &str) -> String {
        prefixed(self.config.key_prefix.as_deref(), key)
    }

    /// Collects keys matching `pattern` with SCAN
    async fn scan(&self, pattern: &str) -> Result<Vec<String>, DomainError> {
        let mut conn = self.connection.clone();
        let mut cursor = 0u64;
        let mut found = Vec::new();

        loop {
            let (new_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(1000)
                .query_async(&mut conn)
                .await
                .map_err(|e| DomainError::cache(format!("Failed to scan keys: {}", e)))?;

            found.extend(keys);
            cursor = new_cursor;

            if cursor == 0 {
                break;
            }
        }

        Ok(found)
    }
}

fn prefixed(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}:{}", prefix, key),
        None => key.to_string(),
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let result: Option<String> = conn.get(&prefixed_key).await.map_err(|e| {
            DomainError::cache(format!("Failed to get key '{}': {}", key, e))
        })?;

        Ok(result)
    }

    async fn set_raw(
        &self,
        key: &str,
        value: &str,
        expiration: Expiration,
    ) -> Result<(), DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let result: redis::RedisResult<()> = match expiration {
            Expiration::Never => conn.set(&prefixed_key, value).await,
            Expiration::After(ttl) => conn.set_ex(&prefixed_key, value, ttl.as_secs().max(1)).await,
        };

        result.map_err(|e| DomainError::cache(format!("Failed to set key '{}': {}", key, e)))
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let deleted: i32 = conn.del(&prefixed_key).await.map_err(|e| {
            DomainError::cache(format!("Failed to delete key '{}': {}", key, e))
        })?;

        Ok(deleted > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let exists: bool = conn.exists(&prefixed_key).await.map_err(|e| {
            DomainError::cache(format!("Failed to check existence of key '{}': {}", key, e))
        })?;

        Ok(exists)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let ttl_secs: i64 = conn.ttl(&prefixed_key).await.map_err(|e| {
            DomainError::cache(format!("Failed to get TTL for key '{}': {}", key, e))
        })?;

        // -2 if the key is missing, -1 if it never expires
        if ttl_secs < 0 {
            Ok(None)
        } else {
            Ok(Some(Duration::from_secs(ttl_secs as u64)))
        }
    }

    async fn clear(&self) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();

        match &self.config.key_prefix {
            Some(_) => {
                let keys = self.scan(&self.prefix_key("*")).await?;

                if !keys.is_empty() {
                    let _: i64 = conn
                        .del(&keys)
                        .await
                        .map_err(|e| DomainError::cache(format!("Failed to delete keys: {}", e)))?;
                }
            }
            None => {
                redis::cmd("FLUSHDB")
                    .query_async::<()>(&mut conn)
                    .await
                    .map_err(|e| DomainError::cache(format!("Failed to flush database: {}", e)))?;
            }
        }

        Ok(())
    }

    async fn size(&self) -> Result<usize, DomainError> {
        match &self.config.key_prefix {
            Some(_) => Ok(self.scan(&self.prefix_key("*")).await?.len()),
            None => {
                let mut conn = self.connection.clone();
                let size: usize = redis::cmd("DBSIZE")
                    .query_async(&mut conn)
                    .await
                    .map_err(|e| {
                        DomainError::cache(format!("Failed to get database size: {}", e))
                    })?;
                Ok(size)
            }
        }
    }
}
