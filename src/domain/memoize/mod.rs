//! Memoization domain - Key derivation, caching policy and the memoizer

mod auto_cache;
mod key;
mod memoizer;
mod policy;
mod render;
mod runtime;

pub use auto_cache::AutoCache;
pub use key::{
    auto_key, bound_length, derive_key, tag_version, KeyError, KeyFn, KeySpec,
    DEFAULT_MAX_KEY_LENGTH, NAMESPACE,
};
pub use memoizer::{MaintenanceError, Memoizer, Outcome, StoreFailure, StoreFailureHook};
pub use policy::{CachePolicy, PresenceCheck, DEFAULT_EXPIRATION_SECS};
pub use runtime::RuntimeConfig;
