//! Domain layer - Memoization logic and the collaborators it depends on

pub mod cache;
pub mod environment;
pub mod error;
pub mod memoize;

pub use cache::{Cache, CacheExt, Expiration};
pub use environment::{DeploymentMode, EnvironmentInfo};
pub use error::DomainError;
pub use memoize::{
    AutoCache, CachePolicy, KeyError, KeyFn, KeySpec, MaintenanceError, Memoizer, Outcome,
    PresenceCheck, RuntimeConfig, StoreFailure,
};
