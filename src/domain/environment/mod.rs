//! Environment domain - Deployment facts the memoizer depends on

use serde::Deserialize;

use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Where the calling application is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentMode {
    /// Deployed production instance
    #[default]
    Production,
    /// Local or offline development server
    Local,
    /// Remote development or staging deployment
    RemoteDev,
}

impl DeploymentMode {
    /// Returns true for either kind of development deployment
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Local | Self::RemoteDev)
    }
}

impl std::fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeploymentMode::Production => write!(f, "production"),
            DeploymentMode::Local => write!(f, "local"),
            DeploymentMode::RemoteDev => write!(f, "remote_dev"),
        }
    }
}

impl std::str::FromStr for DeploymentMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Ok(DeploymentMode::Production),
            "local" | "sdk" | "offline" => Ok(DeploymentMode::Local),
            "remote_dev" | "remote-dev" | "staging" => Ok(DeploymentMode::RemoteDev),
            _ => Err(DomainError::environment(format!(
                "Unknown deployment mode: {}. Valid modes: production, local, remote_dev",
                s
            ))),
        }
    }
}

/// Read-only, process-wide facts about the running deployment
#[cfg_attr(test, automock)]
pub trait EnvironmentInfo: Send + Sync {
    /// Running on a local or offline development server
    fn is_local_development(&self) -> bool;

    /// Running in a remote development or staging deployment
    fn is_remote_development(&self) -> bool;

    /// Identifier of the currently deployed version
    fn current_version_id(&self) -> String;
}
