use serde::Deserialize;

use crate::domain::memoize::RuntimeConfig;
use crate::infrastructure::cache::CacheConfig;
use crate::infrastructure::environment::EnvironmentConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub cache: CacheConfig,
    pub auto_cache: RuntimeConfig,
    pub environment: EnvironmentConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::from_source(config)
    }

    /// Deserializes an already assembled source, rejecting malformed sections
    pub fn from_source(source: config::Config) -> Result<Self, config::ConfigError> {
        source.try_deserialize()
    }
}
