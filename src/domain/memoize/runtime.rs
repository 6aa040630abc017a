//! Operator configuration shared by every memoized computation

use serde::Deserialize;

use super::key::DEFAULT_MAX_KEY_LENGTH;

/// Process-wide switches, fixed at startup
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Keep caching on in development deployments
    pub enable_dev_auto_cache: bool,
    /// Default for `CachePolicy::version_tagging` of newly wrapped computations
    pub enable_versioned_auto_cache: bool,
    /// Keys longer than this are replaced by a digest, `None` disables it
    pub max_key_length: Option<usize>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            enable_dev_auto_cache: false,
            enable_versioned_auto_cache: true,
            max_key_length: Some(DEFAULT_MAX_KEY_LENGTH),
        }
    }
}

impl RuntimeConfig {
    /// Keeps caching enabled in development deployments
    pub fn with_dev_auto_cache(mut self, enabled: bool) -> Self {
        self.enable_dev_auto_cache = enabled;
        self
    }

    /// Sets the default version tagging of new policies
    pub fn with_versioned_auto_cache(mut self, enabled: bool) -> Self {
        self.enable_versioned_auto_cache = enabled;
        self
    }

    /// Sets the maximum key length
    pub fn with_max_key_length(mut self, max: Option<usize>) -> Self {
        self.max_key_length = max;
        self
    }
}
