//! auto-cache
//!
//! Memoizes async computations in an external key-value cache:
//! - Automatic keys from the computation name and its serialized arguments
//! - Literal or caller-computed keys for externally refreshed entries
//! - Deployment version tagging to avoid stale hits across releases
//! - Development bypass, best-effort writes and fail-open reads
//! - In-memory (moka) and Redis cache clients

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use domain::memoize::{AutoCache, CachePolicy, KeySpec, Memoizer, Outcome, RuntimeConfig};
