//! Background reaper for expired cache entries.
//!
//! The reaper ticks every reap interval and removes completed entries older
//! than the cache's max age. It holds only a weak reference to the cache, so
//! it exits on its own once the cache is gone, and stops immediately when
//! the shutdown token is cancelled.

use std::sync::Weak;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::dogpile::CacheInner;

pub(super) struct Reaper {
    cache: Weak<CacheInner>,
    interval: Duration,
}

impl Reaper {
    pub(super) fn new(cache: Weak<CacheInner>, interval: Duration) -> Self {
        Self { cache, interval }
    }

    /// Runs until shutdown is signalled or the cache is dropped.
    pub(super) async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            "Tile cache reaper starting"
        );

        let mut interval = tokio::time::interval(self.interval);
        // Skip the first immediate tick
        interval.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Tile cache reaper shutting down");
                    break;
                }

                _ = interval.tick() => {
                    let Some(cache) = self.cache.upgrade() else {
                        debug!("Tile cache dropped, reaper exiting");
                        break;
                    };
                    cache.reap();
                }
            }
        }
    }
}
