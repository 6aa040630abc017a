//! Deployment environment provider

use serde::Deserialize;

use crate::domain::environment::{DeploymentMode, EnvironmentInfo};
use crate::domain::DomainError;

/// Environment variable holding the deployment mode
pub const MODE_VAR: &str = "AUTO_CACHE_ENV_MODE";

/// Environment variable holding the deployed version identifier
pub const VERSION_VAR: &str = "CURRENT_VERSION_ID";

/// `environment` section of the application configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub mode: DeploymentMode,
    pub version_id: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            mode: DeploymentMode::Production,
            version_id: default_version_id(),
        }
    }
}

fn default_version_id() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Fixed deployment facts, read once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentEnvironment {
    mode: DeploymentMode,
    version_id: String,
}

impl DeploymentEnvironment {
    pub fn new(mode: DeploymentMode, version_id: impl Into<String>) -> Self {
        Self {
            mode,
            version_id: version_id.into(),
        }
    }

    /// Production deployment of the given version
    pub fn production(version_id: impl Into<String>) -> Self {
        Self::new(DeploymentMode::Production, version_id)
    }

    /// Local development server of the given version
    pub fn local(version_id: impl Into<String>) -> Self {
        Self::new(DeploymentMode::Local, version_id)
    }

    pub fn from_config(config: &EnvironmentConfig) -> Self {
        Self::new(config.mode, config.version_id.clone())
    }

    /// Reads the mode and version from process environment variables
    pub fn from_env() -> Result<Self, DomainError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DomainError> {
        let mode = match lookup(MODE_VAR) {
            Some(mode) => mode.parse()?,
            None => DeploymentMode::Production,
        };
        let version_id = lookup(VERSION_VAR)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_version_id);

        Ok(Self::new(mode, version_id))
    }

    pub fn mode(&self) -> DeploymentMode {
        self.mode
    }
}

impl EnvironmentInfo for DeploymentEnvironment {
    fn is_local_development(&self) -> bool {
        self.mode == DeploymentMode::Local
    }

    fn is_remote_development(&self) -> bool {
        self.mode == DeploymentMode::RemoteDev
    }

    fn current_version_id(&self) -> String {
        self.version_id.clone()
    }
}
