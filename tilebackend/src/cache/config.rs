//! Cache configuration.

use std::time::Duration;

/// Default lifetime of a cached tile (60 seconds).
pub const DEFAULT_MAX_AGE_MS: u64 = 60_000;

/// Shortest reap interval accepted; a zero-period timer is not allowed.
const MIN_REAP_INTERVAL: Duration = Duration::from_millis(1);

/// Settings for a [`DogpileCache`](super::DogpileCache).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    max_age: Duration,
    reap_interval: Option<Duration>,
    deflate_upstream: bool,
}

impl CacheConfig {
    /// Set how long a completed tile stays fresh.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Set the reaper period. Defaults to the max age.
    pub fn with_reap_interval(mut self, interval: Duration) -> Self {
        self.reap_interval = Some(interval);
        self
    }

    /// Enable or disable inflating zlib/gzip upstream bodies.
    pub fn with_deflate_upstream(mut self, deflate: bool) -> Self {
        self.deflate_upstream = deflate;
        self
    }

    /// How long a completed tile stays fresh.
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Reaper period.
    pub fn reap_interval(&self) -> Duration {
        self.reap_interval
            .unwrap_or(self.max_age)
            .max(MIN_REAP_INTERVAL)
    }

    /// Whether compressed upstream bodies are inflated before caching.
    pub fn deflate_upstream(&self) -> bool {
        self.deflate_upstream
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_age: Duration::from_millis(DEFAULT_MAX_AGE_MS),
            reap_interval: None,
            deflate_upstream: true,
        }
    }
}
