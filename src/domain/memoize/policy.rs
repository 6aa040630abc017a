//! Caching policy attached to one wrapped computation

use serde_json::Value;

use super::key::KeySpec;

/// Expiration used when a computation is wrapped without one
pub const DEFAULT_EXPIRATION_SECS: u64 = 600;

/// How a cached payload is judged present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresenceCheck {
    /// Any stored value is a hit, including `0`, `false` and empty collections
    #[default]
    Explicit,
    /// Stored `null`, `false`, `0`, `""`, `[]` and `{}` count as misses
    Truthy,
}

impl PresenceCheck {
    /// Returns true if a decoded payload should be served from the cache
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Explicit => true,
            Self::Truthy => is_truthy(value),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

/// Caching configuration fixed at wrap time
#[derive(Debug, Clone)]
pub struct CachePolicy<A, E> {
    /// Seconds before an entry expires, `0` keeps it until invalidated
    pub expiration_seconds: u64,
    /// How the key is chosen
    pub key_spec: KeySpec<A, E>,
    /// Whether the deployment version is appended to the key
    pub version_tagging: bool,
    /// How cached payloads are judged present
    pub presence_check: PresenceCheck,
}

impl<A, E> Default for CachePolicy<A, E> {
    fn default() -> Self {
        Self {
            expiration_seconds: DEFAULT_EXPIRATION_SECS,
            key_spec: KeySpec::Auto,
            version_tagging: true,
            presence_check: PresenceCheck::Explicit,
        }
    }
}

impl<A, E> CachePolicy<A, E> {
    /// Creates a policy with the default expiration and automatic keys
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the expiration in seconds
    pub fn with_expiration(mut self, seconds: u64) -> Self {
        self.expiration_seconds = seconds;
        self
    }

    /// Sets the key specification
    pub fn with_key(mut self, key_spec: KeySpec<A, E>) -> Self {
        self.key_spec = key_spec;
        self
    }

    /// Uses a fixed key for every invocation
    pub fn with_literal_key(self, key: impl Into<String>) -> Self {
        self.with_key(KeySpec::literal(key))
    }

    /// Computes keys with a function of the arguments
    pub fn with_key_fn<F>(self, f: F) -> Self
    where
        F: Fn(&A) -> Result<String, E> + Send + Sync + 'static,
    {
        self.with_key(KeySpec::derived(f))
    }

    /// Enables or disables version tagging
    pub fn with_version_tagging(mut self, enabled: bool) -> Self {
        self.version_tagging = enabled;
        self
    }

    /// Sets the presence check
    pub fn with_presence_check(mut self, check: PresenceCheck) -> Self {
        self.presence_check = check;
        self
    }
}
