//! Entry expiration

use std::time::Duration;

/// How long an entry lives in the backing store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    /// Kept until deleted or evicted by the store
    Never,
    /// Expires after the given duration
    After(Duration),
}

impl Expiration {
    /// Converts a TTL in seconds, where `0` means no expiration
    pub fn from_secs(secs: u64) -> Self {
        if secs == 0 {
            Self::Never
        } else {
            Self::After(Duration::from_secs(secs))
        }
    }

    /// Returns the duration, if the entry expires at all
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Self::Never => None,
            Self::After(ttl) => Some(*ttl),
        }
    }
}

impl From<Duration> for Expiration {
    fn from(ttl: Duration) -> Self {
        Self::After(ttl)
    }
}
