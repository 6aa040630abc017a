//! Cache trait definition

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use super::Expiration;
use crate::domain::DomainError;

/// Key-value cache client with per-entry expiration
///
/// Values are stored as JSON strings so the trait stays dyn-compatible.
/// A read reports presence explicitly: `Ok(None)` is a miss, any `Some`
/// is a hit, including values such as `0`, `false` or `[]`.
#[async_trait]
pub trait Cache: Send + Sync + Debug {
    /// Gets a raw JSON value from the cache
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Sets a raw JSON value in the cache
    async fn set_raw(
        &self,
        key: &str,
        value: &str,
        expiration: Expiration,
    ) -> Result<(), DomainError>;

    /// Deletes a value from the cache
    async fn delete(&self, key: &str) -> Result<bool, DomainError>;

    /// Checks if a key exists in the cache
    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.get_raw(key).await?.is_some())
    }

    /// Gets the remaining TTL for a key, `None` if missing or never expiring
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError>;

    /// Clears all entries from the cache
    async fn clear(&self) -> Result<(), DomainError>;

    /// Returns approximate number of entries in the cache
    async fn size(&self) -> Result<usize, DomainError>;
}

/// Extension trait providing typed get/set operations
pub trait CacheExt: Cache {
    /// Gets a typed value from the cache
    fn get<'a, V>(
        &'a self,
        key: &'a str,
    ) -> impl std::future::Future<Output = Result<Option<V>, DomainError>> + Send
    where
        V: DeserializeOwned + Send,
    {
        async move {
            match self.get_raw(key).await? {
                Some(data) => {
                    let value: V = serde_json::from_str(&data).map_err(|e| {
                        DomainError::serialization(format!(
                            "Failed to deserialize cache value: {}",
                            e
                        ))
                    })?;
                    Ok(Some(value))
                }
                None => Ok(None),
            }
        }
    }

    /// Sets a typed value in the cache
    fn set<'a, V>(
        &'a self,
        key: &'a str,
        value: &'a V,
        expiration: Expiration,
    ) -> impl std::future::Future<Output = Result<(), DomainError>> + Send
    where
        V: Serialize + Send + Sync,
    {
        async move {
            let data = serde_json::to_string(value).map_err(|e| {
                DomainError::serialization(format!("Failed to serialize cache value: {}", e))
            })?;
            self.set_raw(key, &data, expiration).await
        }
    }
}

impl<T: Cache + ?Sized> CacheExt for T {}
