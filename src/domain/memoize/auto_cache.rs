//! Entry point for wrapping computations

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use super::key::KeySpec;
use super::memoizer::Memoizer;
use super::policy::{CachePolicy, DEFAULT_EXPIRATION_SECS};
use super::runtime::RuntimeConfig;
use crate::domain::cache::Cache;
use crate::domain::environment::EnvironmentInfo;

/// Wraps computations in memoizers sharing one cache, environment and
/// operator configuration
///
/// ```ignore
/// let auto_cache = AutoCache::new(cache, environment, RuntimeConfig::default());
/// let by_type = auto_cache.wrap_default("get_by_type", |(kind,): (String,)| async move {
///     repository.find_by_type(&kind).await
/// });
/// let items = by_type.invoke(("book".to_string(),)).await?;
/// ```
#[derive(Clone)]
pub struct AutoCache {
    cache: Arc<dyn Cache>,
    environment: Arc<dyn EnvironmentInfo>,
    runtime: RuntimeConfig,
}

impl AutoCache {
    pub fn new(
        cache: Arc<dyn Cache>,
        environment: Arc<dyn EnvironmentInfo>,
        runtime: RuntimeConfig,
    ) -> Self {
        Self {
            cache,
            environment,
            runtime,
        }
    }

    /// Default policy, with version tagging taken from the operator configuration
    pub fn policy<A, E>(&self) -> CachePolicy<A, E> {
        CachePolicy::new().with_version_tagging(self.runtime.enable_versioned_auto_cache)
    }

    /// Memoizes `computation` with the given expiration and key specification
    pub fn wrap<A, R, E, F, Fut>(
        &self,
        name: impl Into<String>,
        computation: F,
        expiration_seconds: u64,
        key_spec: KeySpec<A, E>,
    ) -> Memoizer<A, R, E>
    where
        A: Serialize + Send + 'static,
        R: Serialize + DeserializeOwned + Send + Sync + 'static,
        E: Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
    {
        let policy = self
            .policy()
            .with_expiration(expiration_seconds)
            .with_key(key_spec);

        self.wrap_with_policy(name, policy, computation)
    }

    /// Memoizes `computation` for ten minutes under an automatic key
    pub fn wrap_default<A, R, E, F, Fut>(
        &self,
        name: impl Into<String>,
        computation: F,
    ) -> Memoizer<A, R, E>
    where
        A: Serialize + Send + 'static,
        R: Serialize + DeserializeOwned + Send + Sync + 'static,
        E: Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
    {
        self.wrap(name, computation, DEFAULT_EXPIRATION_SECS, KeySpec::Auto)
    }

    /// Memoizes `computation` under an explicit policy
    pub fn wrap_with_policy<A, R, E, F, Fut>(
        &self,
        name: impl Into<String>,
        policy: CachePolicy<A, E>,
        computation: F,
    ) -> Memoizer<A, R, E>
    where
        A: Serialize + Send + 'static,
        R: Serialize + DeserializeOwned + Send + Sync + 'static,
        E: Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
    {
        Memoizer::new(
            name,
            policy,
            Arc::clone(&self.cache),
            Arc::clone(&self.environment),
            self.runtime.clone(),
            computation,
        )
    }

    pub fn runtime(&self) -> &RuntimeConfig {
        &self.runtime
    }
}

impl fmt::Debug for AutoCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoCache")
            .field("cache", &self.cache)
            .field("runtime", &self.runtime)
            .finish()
    }
}
