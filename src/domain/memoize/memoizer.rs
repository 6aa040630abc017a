//! Memoized wrapper around a single computation

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use metrics::counter;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, warn};

use super::key::{derive_key, KeyError};
use super::policy::CachePolicy;
use super::runtime::RuntimeConfig;
use crate::domain::cache::{Cache, CacheExt, Expiration};
use crate::domain::environment::EnvironmentInfo;
use crate::domain::DomainError;

type Computation<A, R, E> = Arc<dyn Fn(A) -> BoxFuture<'static, Result<R, E>> + Send + Sync>;

/// Observer notified when a computed value could not be stored
pub type StoreFailureHook = Arc<dyn Fn(&StoreFailure) + Send + Sync>;

/// Path taken by one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Cache skipped, computation called directly
    Bypassed,
    /// Value served from the cache
    Hit,
    /// Value computed, then stored on a best-effort basis
    Miss,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Bypassed => "bypassed",
            Outcome::Hit => "hit",
            Outcome::Miss => "miss",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A computed value the cache rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreFailure {
    /// Name of the memoized computation
    pub name: String,
    /// Key the value was written under
    pub key: String,
    /// Error reported by the cache client
    pub message: String,
}

/// Errors of the explicit invalidate/refresh operations
#[derive(Debug, Error)]
pub enum MaintenanceError<E> {
    #[error("Key derivation failed: {0}")]
    Key(E),

    #[error("Computation failed: {0}")]
    Computation(E),

    #[error(transparent)]
    Cache(#[from] DomainError),
}

/// A computation memoized in an external cache
///
/// Each call to [`Memoizer::invoke`] either bypasses the cache (development
/// deployments), returns a cached value, or computes the value and writes it
/// back. Write failures never fail the call. Concurrent misses on the same
/// key each run the computation; the last write wins.
pub struct Memoizer<A, R, E> {
    name: Arc<str>,
    policy: Arc<CachePolicy<A, E>>,
    cache: Arc<dyn Cache>,
    environment: Arc<dyn EnvironmentInfo>,
    runtime: RuntimeConfig,
    computation: Computation<A, R, E>,
    on_store_failure: Option<StoreFailureHook>,
}

impl<A, R, E> Memoizer<A, R, E>
where
    A: Serialize + Send + 'static,
    R: Serialize + DeserializeOwned + Send + Sync + 'static,
    E: Send + 'static,
{
    pub fn new<F, Fut>(
        name: impl Into<String>,
        policy: CachePolicy<A, E>,
        cache: Arc<dyn Cache>,
        environment: Arc<dyn EnvironmentInfo>,
        runtime: RuntimeConfig,
        computation: F,
    ) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
    {
        let computation: Computation<A, R, E> = Arc::new(move |args: A| computation(args).boxed());
        let name: String = name.into();

        Self {
            name: Arc::from(name),
            policy: Arc::new(policy),
            cache,
            environment,
            runtime,
            computation,
            on_store_failure: None,
        }
    }

    /// Registers an observer for values the cache refused to store
    pub fn on_store_failure<F>(mut self, hook: F) -> Self
    where
        F: Fn(&StoreFailure) + Send + Sync + 'static,
    {
        self.on_store_failure = Some(Arc::new(hook));
        self
    }

    /// Runs the memoized computation
    pub async fn invoke(&self, args: A) -> Result<R, E> {
        self.invoke_traced(args).await.map(|(value, _)| value)
    }

    /// Runs the memoized computation and reports which path was taken
    pub async fn invoke_traced(&self, args: A) -> Result<(R, Outcome), E> {
        if self.bypassed() {
            debug!(name = %self.name, "Development deployment, calling computation directly");
            return self.call_direct(args).await;
        }

        let key = match self.derive(&args) {
            Ok(key) => key,
            Err(KeyError::Caller(e)) => return Err(e),
            Err(KeyError::Render(e)) => {
                warn!(
                    name = %self.name,
                    error = %e,
                    "Arguments cannot be rendered as a cache key, calling computation directly"
                );
                return self.call_direct(args).await;
            }
        };

        if let Some(value) = self.lookup(&key).await {
            self.record(Outcome::Hit);
            return Ok((value, Outcome::Hit));
        }

        let value = (self.computation)(args).await?;
        self.store(&key, &value).await;
        self.record(Outcome::Miss);

        Ok((value, Outcome::Miss))
    }

    /// Returns the key an invocation with `args` would use
    ///
    /// `None` when the invocation would bypass the cache.
    pub fn key_for(&self, args: &A) -> Result<Option<String>, E> {
        if self.bypassed() {
            return Ok(None);
        }

        match self.derive(args) {
            Ok(key) => Ok(Some(key)),
            Err(KeyError::Caller(e)) => Err(e),
            Err(KeyError::Render(_)) => Ok(None),
        }
    }

    /// Deletes the entry an invocation with `args` would read
    pub async fn invalidate(&self, args: &A) -> Result<bool, MaintenanceError<E>> {
        if self.bypassed() {
            return Ok(false);
        }

        let key = self.maintenance_key(args)?;
        let deleted = self.cache.delete(&key).await?;
        debug!(name = %self.name, key = %key, deleted, "Invalidated cache entry");

        Ok(deleted)
    }

    /// Recomputes the value and overwrites the entry, whatever its state
    ///
    /// Unlike [`Memoizer::invoke`], a failed write is returned as an error.
    pub async fn refresh(&self, args: A) -> Result<R, MaintenanceError<E>> {
        if self.bypassed() {
            return (self.computation)(args)
                .await
                .map_err(MaintenanceError::Computation);
        }

        let key = self.maintenance_key(&args)?;
        let value = (self.computation)(args)
            .await
            .map_err(MaintenanceError::Computation)?;

        self.cache.set(&key, &value, self.expiration()).await?;
        debug!(name = %self.name, key = %key, "Refreshed cache entry");

        Ok(value)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> &CachePolicy<A, E> {
        &self.policy
    }

    fn bypassed(&self) -> bool {
        let development = self.environment.is_local_development()
            || self.environment.is_remote_development();

        development && !self.runtime.enable_dev_auto_cache
    }

    fn derive(&self, args: &A) -> Result<String, KeyError<E>> {
        let version_id = self
            .policy
            .version_tagging
            .then(|| self.environment.current_version_id());

        derive_key(
            &self.policy.key_spec,
            &self.name,
            args,
            version_id.as_deref(),
            self.runtime.max_key_length,
        )
    }

    fn maintenance_key(&self, args: &A) -> Result<String, MaintenanceError<E>> {
        self.derive(args).map_err(|e| match e {
            KeyError::Caller(e) => MaintenanceError::Key(e),
            KeyError::Render(e) => MaintenanceError::Cache(DomainError::serialization(format!(
                "Failed to render arguments of '{}': {}",
                self.name, e
            ))),
        })
    }

    fn expiration(&self) -> Expiration {
        Expiration::from_secs(self.policy.expiration_seconds)
    }

    async fn call_direct(&self, args: A) -> Result<(R, Outcome), E> {
        let value = (self.computation)(args).await?;
        self.record(Outcome::Bypassed);
        Ok((value, Outcome::Bypassed))
    }

    async fn lookup(&self, key: &str) -> Option<R> {
        let raw = match self.cache.get_raw(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(name = %self.name, key = %key, "Cache miss");
                return None;
            }
            Err(e) => {
                warn!(name = %self.name, key = %key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        let payload: Value = match serde_json::from_str(&raw) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(name = %self.name, key = %key, error = %e, "Cached payload is not JSON, treating as miss");
                return None;
            }
        };

        if !self.policy.presence_check.accepts(&payload) {
            debug!(name = %self.name, key = %key, "Cached value is falsy, treating as miss");
            return None;
        }

        match serde_json::from_value(payload) {
            Ok(value) => {
                debug!(name = %self.name, key = %key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(name = %self.name, key = %key, error = %e, "Cached value has an unexpected shape, treating as miss");
                None
            }
        }
    }

    async fn store(&self, key: &str, value: &R) {
        let Err(e) = self.cache.set(key, value, self.expiration()).await else {
            return;
        };

        error!(name = %self.name, key = %key, error = %e, "Received error from cache, value not stored");
        counter!("auto_cache_store_failures_total", "name" => self.name.to_string()).increment(1);

        if let Some(hook) = &self.on_store_failure {
            hook(&StoreFailure {
                name: self.name.to_string(),
                key: key.to_string(),
                message: e.to_string(),
            });
        }
    }

    fn record(&self, outcome: Outcome) {
        counter!(
            "auto_cache_lookups_total",
            "name" => self.name.to_string(),
            "outcome" => outcome.as_str()
        )
        .increment(1);
    }
}

impl<A, R, E> Clone for Memoizer<A, R, E> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            policy: Arc::clone(&self.policy),
            cache: Arc::clone(&self.cache),
            environment: Arc::clone(&self.environment),
            runtime: self.runtime.clone(),
            computation: Arc::clone(&self.computation),
            on_store_failure: self.on_store_failure.clone(),
        }
    }
}

impl<A, R, E> fmt::Debug for Memoizer<A, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoizer")
            .field("name", &self.name)
            .field("expiration_seconds", &self.policy.expiration_seconds)
            .field("key_spec", &self.policy.key_spec)
            .field("version_tagging", &self.policy.version_tagging)
            .field("cache", &self.cache)
            .field("runtime", &self.runtime)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::domain::cache::MockCache;
    use crate::domain::environment::MockEnvironmentInfo;
    use crate::domain::memoize::{AutoCache, KeySpec, PresenceCheck};

    fn environment(local: bool, remote: bool, version: &str) -> Arc<dyn EnvironmentInfo> {
        let mut env = MockEnvironmentInfo::new();
        env.expect_is_local_development().return_const(local);
        env.expect_is_remote_development().return_const(remote);
        env.expect_current_version_id()
            .return_const(version.to_string());
        Arc::new(env)
    }

    fn production(version: &str) -> Arc<dyn EnvironmentInfo> {
        environment(false, false, version)
    }

    fn auto_cache(cache: &Arc<MockCache>, env: Arc<dyn EnvironmentInfo>) -> AutoCache {
        AutoCache::new(cache.clone(), env, RuntimeConfig::default())
    }

    fn squares(
        auto_cache: &AutoCache,
        policy: CachePolicy<(u32,), String>,
        calls: &Arc<AtomicUsize>,
    ) -> Memoizer<(u32,), u32, String> {
        let calls = Arc::clone(calls);
        auto_cache.wrap_with_policy("square", policy, move |(n,): (u32,)| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(n * n)
            }
        })
    }

    #[test]
    fn test_key_is_deterministic() {
        let cache = Arc::new(MockCache::new());
        let auto_cache = auto_cache(&cache, production("v1"));
        let calls = Arc::new(AtomicUsize::new(0));
        let memoizer = squares(&auto_cache, auto_cache.policy(), &calls);

        let first = memoizer.key_for(&(4,)).unwrap();
        let second = memoizer.key_for(&(4,)).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.as_deref(), Some("auto_cache:square-[4]-v1"));
    }

    #[tokio::test]
    async fn test_non_finite_arguments_skip_the_cache() {
        let cache = Arc::new(MockCache::new());
        let auto_cache = auto_cache(&cache, production("v1"));
        let memoizer: Memoizer<(f64,), f64, String> =
            auto_cache.wrap_default("neg", |(x,): (f64,)| async move { Ok(-x) });

        assert_eq!(memoizer.key_for(&(f64::INFINITY,)).unwrap(), None);
        assert_eq!(memoizer.key_for(&(f64::NEG_INFINITY,)).unwrap(), None);

        let (positive, first) = memoizer.invoke_traced((f64::INFINITY,)).await.unwrap();
        let (negative, second) = memoizer.invoke_traced((f64::NEG_INFINITY,)).await.unwrap();

        assert_eq!(positive, f64::NEG_INFINITY);
        assert_eq!(negative, f64::INFINITY);
        assert_eq!((first, second), (Outcome::Bypassed, Outcome::Bypassed));
        assert_eq!(cache.reads(), 0);
        assert!(cache.keys().is_empty());
    }

    #[tokio::test]
    async fn test_hit_short_circuits_computation() {
        let cache = Arc::new(MockCache::new());
        let auto_cache = auto_cache(&cache, production("v1"));
        let calls = Arc::new(AtomicUsize::new(0));
        let memoizer = squares(&auto_cache, auto_cache.policy(), &calls);

        let key = memoizer.key_for(&(4,)).unwrap().unwrap();
        cache.set(&key, &99u32, Expiration::Never).await.unwrap();

        let (value, outcome) = memoizer.invoke_traced((4,)).await.unwrap();

        assert_eq!(value, 99);
        assert_eq!(outcome, Outcome::Hit);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_miss_then_populate() {
        let cache = Arc::new(MockCache::new());
        let auto_cache = auto_cache(&cache, production("v1"));
        let calls = Arc::new(AtomicUsize::new(0));
        let memoizer = squares(&auto_cache, auto_cache.policy(), &calls);

        let (first, first_outcome) = memoizer.invoke_traced((5,)).await.unwrap();
        let (second, second_outcome) = memoizer.invoke_traced((5,)).await.unwrap();

        assert_eq!((first, second), (25, 25));
        assert_eq!(first_outcome, Outcome::Miss);
        assert_eq!(second_outcome, Outcome::Hit);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.writes(), 1);
    }

    #[tokio::test]
    async fn test_entries_use_policy_expiration() {
        let cache = Arc::new(MockCache::new());
        let auto_cache = auto_cache(&cache, production("v1"));
        let calls = Arc::new(AtomicUsize::new(0));
        let memoizer = squares(&auto_cache, auto_cache.policy(), &calls);

        memoizer.invoke((3,)).await.unwrap();

        let key = memoizer.key_for(&(3,)).unwrap().unwrap();
        assert_eq!(
            cache.expiration(&key),
            Some(Expiration::After(Duration::from_secs(600)))
        );
    }

    #[tokio::test]
    async fn test_local_development_bypasses_cache() {
        let cache = Arc::new(MockCache::new());
        let auto_cache = auto_cache(&cache, environment(true, false, "v1"));
        let calls = Arc::new(AtomicUsize::new(0));
        let memoizer = squares(&auto_cache, auto_cache.policy(), &calls);

        for _ in 0..3 {
            let (value, outcome) = memoizer.invoke_traced((2,)).await.unwrap();
            assert_eq!(value, 4);
            assert_eq!(outcome, Outcome::Bypassed);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(cache.reads(), 0);
        assert_eq!(cache.writes(), 0);
        assert_eq!(memoizer.key_for(&(2,)).unwrap(), None);
    }

    #[tokio::test]
    async fn test_remote_development_bypasses_cache() {
        let cache = Arc::new(MockCache::new());
        let auto_cache = auto_cache(&cache, environment(false, true, "v1"));
        let calls = Arc::new(AtomicUsize::new(0));
        let memoizer = squares(&auto_cache, auto_cache.policy(), &calls);

        memoizer.invoke((2,)).await.unwrap();
        memoizer.invoke((2,)).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.reads(), 0);
    }

    #[tokio::test]
    async fn test_dev_auto_cache_toggle_enables_caching_in_development() {
        let cache = Arc::new(MockCache::new());
        let auto_cache = AutoCache::new(
            cache.clone(),
            environment(true, false, "v1"),
            RuntimeConfig::default().with_dev_auto_cache(true),
        );
        let calls = Arc::new(AtomicUsize::new(0));
        let memoizer = squares(&auto_cache, auto_cache.policy(), &calls);

        memoizer.invoke((2,)).await.unwrap();
        let (_, outcome) = memoizer.invoke_traced((2,)).await.unwrap();

        assert_eq!(outcome, Outcome::Hit);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_version_tagging_separates_deployments() {
        let cache = Arc::new(MockCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let v1 = auto_cache(&cache, production("v1"));
        let v2 = auto_cache(&cache, production("v2"));
        let old = squares(&v1, v1.policy(), &calls);
        let new = squares(&v2, v2.policy(), &calls);

        assert_ne!(old.key_for(&(6,)).unwrap(), new.key_for(&(6,)).unwrap());

        old.invoke((6,)).await.unwrap();
        let (_, outcome) = new.invoke_traced((6,)).await.unwrap();

        assert_eq!(outcome, Outcome::Miss);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            cache.keys(),
            vec!["auto_cache:square-[6]-v1", "auto_cache:square-[6]-v2"]
        );
    }

    #[tokio::test]
    async fn test_version_tagging_follows_operator_default() {
        let cache = Arc::new(MockCache::new());
        let auto_cache = AutoCache::new(
            cache.clone(),
            production("v1"),
            RuntimeConfig::default().with_versioned_auto_cache(false),
        );
        let calls = Arc::new(AtomicUsize::new(0));
        let memoizer = squares(&auto_cache, auto_cache.policy(), &calls);

        assert_eq!(
            memoizer.key_for(&(6,)).unwrap().as_deref(),
            Some("auto_cache:square-[6]")
        );
    }

    #[tokio::test]
    async fn test_literal_key_shares_one_slot() {
        let cache = Arc::new(MockCache::new());
        let auto_cache = auto_cache(&cache, production("v1"));
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = auto_cache
            .policy()
            .with_expiration(0)
            .with_literal_key("daily-report")
            .with_version_tagging(false);
        let memoizer = squares(&auto_cache, policy, &calls);

        let first = memoizer.invoke((2,)).await.unwrap();
        let second = memoizer.invoke((3,)).await.unwrap();

        assert_eq!(first, 4);
        assert_eq!(second, 4);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.keys(), vec!["daily-report"]);
        assert_eq!(cache.expiration("daily-report"), Some(Expiration::Never));
    }

    #[tokio::test]
    async fn test_write_failure_still_returns_value() {
        let cache = Arc::new(MockCache::new().with_write_error("value too large"));
        let auto_cache = auto_cache(&cache, production("v1"));
        let calls = Arc::new(AtomicUsize::new(0));
        let failures = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&failures);
        let memoizer = squares(&auto_cache, auto_cache.policy(), &calls)
            .on_store_failure(move |failure| seen.lock().unwrap().push(failure.clone()));

        let (value, outcome) = memoizer.invoke_traced((7,)).await.unwrap();

        assert_eq!(value, 49);
        assert_eq!(outcome, Outcome::Miss);

        let failures = failures.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].name, "square");
        assert_eq!(failures[0].key, "auto_cache:square-[7]-v1");
        assert!(failures[0].message.contains("value too large"));
    }

    #[tokio::test]
    async fn test_read_failure_is_treated_as_miss() {
        let cache = Arc::new(MockCache::new().with_read_error("connection refused"));
        let auto_cache = auto_cache(&cache, production("v1"));
        let calls = Arc::new(AtomicUsize::new(0));
        let memoizer = squares(&auto_cache, auto_cache.policy(), &calls);

        let (value, outcome) = memoizer.invoke_traced((8,)).await.unwrap();

        assert_eq!(value, 64);
        assert_eq!(outcome, Outcome::Miss);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_treated_as_miss() {
        let cache = Arc::new(MockCache::new());
        let auto_cache = auto_cache(&cache, production("v1"));
        let calls = Arc::new(AtomicUsize::new(0));
        let memoizer = squares(&auto_cache, auto_cache.policy(), &calls);

        let key = memoizer.key_for(&(8,)).unwrap().unwrap();
        cache.set_raw(&key, "not json", Expiration::Never).await.unwrap();

        let (value, outcome) = memoizer.invoke_traced((8,)).await.unwrap();

        assert_eq!(value, 64);
        assert_eq!(outcome, Outcome::Miss);
    }

    #[tokio::test]
    async fn test_falsy_cached_value_is_a_hit() {
        let cache = Arc::new(MockCache::new());
        let auto_cache = auto_cache(&cache, production("v1"));
        let calls = Arc::new(AtomicUsize::new(0));
        let memoizer = squares(&auto_cache, auto_cache.policy(), &calls);

        let (value, _) = memoizer.invoke_traced((0,)).await.unwrap();
        let (again, outcome) = memoizer.invoke_traced((0,)).await.unwrap();

        assert_eq!((value, again), (0, 0));
        assert_eq!(outcome, Outcome::Hit);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_truthy_presence_check_recomputes_falsy_values() {
        let cache = Arc::new(MockCache::new());
        let auto_cache = auto_cache(&cache, production("v1"));
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = auto_cache.policy().with_presence_check(PresenceCheck::Truthy);
        let memoizer = squares(&auto_cache, policy, &calls);

        memoizer.invoke((0,)).await.unwrap();
        let (_, outcome) = memoizer.invoke_traced((0,)).await.unwrap();

        assert_eq!(outcome, Outcome::Miss);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_computation_error_propagates_and_nothing_is_cached() {
        let cache = Arc::new(MockCache::new());
        let auto_cache = auto_cache(&cache, production("v1"));
        let memoizer: Memoizer<(u32,), u32, String> =
            auto_cache.wrap_default("divide", |(n,): (u32,)| async move {
                100u32.checked_div(n).ok_or_else(|| "division by zero".to_string())
            });

        let result = memoizer.invoke((0,)).await;

        assert_eq!(result, Err("division by zero".to_string()));
        assert_eq!(cache.writes(), 0);
        assert_eq!(memoizer.invoke((4,)).await, Ok(25));
    }

    #[tokio::test]
    async fn test_key_function_error_propagates() {
        let cache = Arc::new(MockCache::new());
        let auto_cache = auto_cache(&cache, production("v1"));
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = auto_cache
            .policy()
            .with_key_fn(|(n,): &(u32,)| match n {
                0 => Err("zero has no key".to_string()),
                n => Ok(format!("square:{}", n)),
            });
        let memoizer = squares(&auto_cache, policy, &calls);

        assert_eq!(memoizer.invoke((0,)).await, Err("zero has no key".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(cache.reads(), 0);

        assert_eq!(memoizer.invoke((3,)).await, Ok(9));
        assert_eq!(cache.keys(), vec!["square:3-v1"]);
    }

    #[tokio::test]
    async fn test_wrap_with_derived_key() {
        let cache = Arc::new(MockCache::new());
        let auto_cache = auto_cache(&cache, production("v1"));
        let memoizer: Memoizer<(String, u32), String, String> = auto_cache.wrap(
            "greeting",
            |(name, times): (String, u32)| async move { Ok(name.repeat(times as usize)) },
            30,
            KeySpec::derived(|(name, _): &(String, u32)| Ok(format!("greeting:{}", name))),
        );

        memoizer.invoke(("ab".to_string(), 2)).await.unwrap();
        let cached = memoizer.invoke(("ab".to_string(), 5)).await.unwrap();

        assert_eq!(cached, "abab");
        assert_eq!(
            cache.expiration("greeting:ab-v1"),
            Some(Expiration::After(Duration::from_secs(30)))
        );
    }

    #[tokio::test]
    async fn test_invalidate_forces_recompute() {
        let cache = Arc::new(MockCache::new());
        let auto_cache = auto_cache(&cache, production("v1"));
        let calls = Arc::new(AtomicUsize::new(0));
        let memoizer = squares(&auto_cache, auto_cache.policy(), &calls);

        memoizer.invoke((9,)).await.unwrap();
        assert!(memoizer.invalidate(&(9,)).await.unwrap());
        assert!(!memoizer.invalidate(&(9,)).await.unwrap());

        let (_, outcome) = memoizer.invoke_traced((9,)).await.unwrap();
        assert_eq!(outcome, Outcome::Miss);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_refresh_overwrites_entry() {
        let cache = Arc::new(MockCache::new());
        let auto_cache = auto_cache(&cache, production("v1"));
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = auto_cache
            .policy()
            .with_expiration(0)
            .with_literal_key("daily-report");
        let memoizer = squares(&auto_cache, policy, &calls);

        memoizer.invoke((2,)).await.unwrap();
        let refreshed = memoizer.refresh((3,)).await.unwrap();
        let served = memoizer.invoke((2,)).await.unwrap();

        assert_eq!(refreshed, 9);
        assert_eq!(served, 9);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_refresh_reports_write_failure() {
        let cache = Arc::new(MockCache::new().with_write_error("store unavailable"));
        let auto_cache = auto_cache(&cache, production("v1"));
        let calls = Arc::new(AtomicUsize::new(0));
        let memoizer = squares(&auto_cache, auto_cache.policy(), &calls);

        let result = memoizer.refresh((2,)).await;

        assert!(matches!(result, Err(MaintenanceError::Cache(_))));
    }

    #[tokio::test]
    async fn test_clones_share_cache_and_computation() {
        let cache = Arc::new(MockCache::new());
        let auto_cache = auto_cache(&cache, production("v1"));
        let calls = Arc::new(AtomicUsize::new(0));
        let memoizer = squares(&auto_cache, auto_cache.policy(), &calls);
        let clone = memoizer.clone();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let memoizer = clone.clone();
                tokio::spawn(async move { memoizer.invoke((11,)).await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(121));
        }

        let (_, outcome) = memoizer.invoke_traced((11,)).await.unwrap();
        assert_eq!(outcome, Outcome::Hit);
        assert!(calls.load(Ordering::SeqCst) >= 1);
        assert_eq!(cache.keys(), vec!["auto_cache:square-[11]-v1".to_string()]);
    }
}
