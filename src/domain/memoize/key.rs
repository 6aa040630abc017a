//! Cache key derivation

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::render::ensure_distinct_rendering;

/// Namespace prefix of every automatically derived key
pub const NAMESPACE: &str = "auto_cache";

/// Longest key passed to the store before it is replaced by a digest
pub const DEFAULT_MAX_KEY_LENGTH: usize = 250;

/// Caller-supplied key function
pub type KeyFn<A, E> = Arc<dyn Fn(&A) -> Result<String, E> + Send + Sync>;

/// How the key of an invocation is chosen
pub enum KeySpec<A, E> {
    /// Namespace, computation name and rendered arguments
    Auto,
    /// Fixed key shared by every invocation, arguments are ignored
    Literal(String),
    /// Key computed by a function of the invocation arguments
    Derived(KeyFn<A, E>),
}

impl<A, E> KeySpec<A, E> {
    /// Fixed key, usually paired with indefinite expiration and external refresh
    pub fn literal(key: impl Into<String>) -> Self {
        Self::Literal(key.into())
    }

    /// Key computed from the arguments; errors reach the caller unchanged
    pub fn derived<F>(f: F) -> Self
    where
        F: Fn(&A) -> Result<String, E> + Send + Sync + 'static,
    {
        Self::Derived(Arc::new(f))
    }

    /// Resolves the base key, before version tagging and length bounding
    pub fn resolve(&self, name: &str, args: &A) -> Result<String, KeyError<E>>
    where
        A: Serialize,
    {
        match self {
            Self::Auto => auto_key(name, args).map_err(KeyError::Render),
            Self::Literal(key) => Ok(key.clone()),
            Self::Derived(f) => f(args).map_err(KeyError::Caller),
        }
    }
}

impl<A, E> Default for KeySpec<A, E> {
    fn default() -> Self {
        Self::Auto
    }
}

impl<A, E> Clone for KeySpec<A, E> {
    fn clone(&self) -> Self {
        match self {
            Self::Auto => Self::Auto,
            Self::Literal(key) => Self::Literal(key.clone()),
            Self::Derived(f) => Self::Derived(Arc::clone(f)),
        }
    }
}

impl<A, E> fmt::Debug for KeySpec<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "Auto"),
            Self::Literal(key) => f.debug_tuple("Literal").field(key).finish(),
            Self::Derived(_) => write!(f, "Derived(<fn>)"),
        }
    }
}

/// Why a key could not be derived
#[derive(Debug)]
pub enum KeyError<E> {
    /// The caller's key function failed
    Caller(E),
    /// The arguments could not be rendered as JSON
    Render(serde_json::Error),
}

/// Builds `auto_cache:{name}-{args}` from the JSON rendering of the arguments
///
/// Arguments are rendered through `serde_json::Value`, so object fields are
/// emitted in sorted order whatever their declaration or insertion order.
/// Unit arguments collapse the key to `auto_cache:{name}`. Arguments holding
/// non-finite floats or a `Some` that renders as `null` are rejected, since
/// their rendering would collide with other arguments.
pub fn auto_key<A: Serialize + ?Sized>(name: &str, args: &A) -> Result<String, serde_json::Error> {
    ensure_distinct_rendering(args)?;
    let rendered = serde_json::to_value(args)?;

    if rendered.is_null() {
        Ok(format!("{}:{}", NAMESPACE, name))
    } else {
        Ok(format!("{}:{}-{}", NAMESPACE, name, rendered))
    }
}

/// Suffixes a key with the deployment version identifier
pub fn tag_version(key: String, version_id: &str) -> String {
    format!("{}-{}", key, version_id)
}

/// Replaces keys longer than `max_length` with a SHA-256 digest of the key
pub fn bound_length(key: String, max_length: Option<usize>) -> String {
    match max_length {
        Some(max) if key.len() > max => {
            let digest = Sha256::digest(key.as_bytes());
            format!("{}:sha256:{}", NAMESPACE, hex::encode(digest))
        }
        _ => key,
    }
}

/// Full derivation: resolve, optionally tag with a version, then bound
pub fn derive_key<A, E>(
    spec: &KeySpec<A, E>,
    name: &str,
    args: &A,
    version_id: Option<&str>,
    max_length: Option<usize>,
) -> Result<String, KeyError<E>>
where
    A: Serialize,
{
    let mut key = spec.resolve(name, args)?;

    if let Some(version_id) = version_id {
        key = tag_version(key, version_id);
    }

    Ok(bound_length(key, max_length))
}
