//! Cache domain - Generic caching abstraction layer

mod expiration;
mod repository;

pub use expiration::Expiration;
pub use repository::{Cache, CacheExt};

#[cfg(test)]
pub use repository::mock::MockCache;
