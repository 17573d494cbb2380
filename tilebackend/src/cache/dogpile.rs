//! Dogpile-safe tile cache.
//!
//! [`DogpileCache`] guarantees at most one upstream fetch per key at a time.
//! Callers that arrive while a fetch is in flight join a FIFO waiter list
//! and receive the same result.
//!
//! # Entry lifecycle
//!
//! ```text
//!            miss / expired                  fetch ok
//! (absent) ─────────────────► Pending ─────────────────► Done
//!    ▲                           │                        │
//!    │        fetch error        │                        │ now - stored_at >= max_age
//!    └───────────────────────────┘◄───────────────────────┘ (reaper or next miss)
//! ```
//!
//! Errors are never cached: a failed fetch removes its entry, so the next
//! request fetches again. The fetch itself runs on a spawned task, so it
//! completes (and wakes every waiter) even if all callers go away.
//!
//! State transitions happen under the entry's shard lock and never across an
//! await point.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::config::CacheConfig;
use super::normalize::CachedTile;
use super::reaper::Reaper;
use crate::coord::TileAddress;
use crate::error::{TileError, TileResult};
use crate::source::{SourceError, UpstreamTile};

type Waiter = oneshot::Sender<TileResult<Arc<CachedTile>>>;

enum EntryState {
    Pending(Vec<Waiter>),
    Done(Arc<CachedTile>),
}

struct CacheEntry {
    state: EntryState,
    stored_at: Instant,
    last_access: Instant,
}

impl CacheEntry {
    fn pending(first: Waiter, now: Instant) -> Self {
        Self {
            state: EntryState::Pending(vec![first]),
            stored_at: now,
            last_access: now,
        }
    }

    fn is_pending(&self) -> bool {
        matches!(self.state, EntryState::Pending(_))
    }

    /// Pending entries never expire.
    fn is_expired(&self, now: Instant, max_age: std::time::Duration) -> bool {
        !self.is_pending() && now.saturating_duration_since(self.stored_at) >= max_age
    }
}

#[derive(Debug, Default)]
struct CacheCounters {
    hits: AtomicU64,
    fetches: AtomicU64,
    coalesced: AtomicU64,
    errors: AtomicU64,
    reaped: AtomicU64,
}

/// Snapshot of cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries currently in the map.
    pub entries: usize,
    /// Entries with a fetch in flight.
    pub pending: usize,
    /// Requests served from a fresh entry.
    pub hits: u64,
    /// Upstream fetches started.
    pub fetches: u64,
    /// Requests that joined an in-flight fetch.
    pub coalesced: u64,
    /// Fetches that failed.
    pub errors: u64,
    /// Entries removed by the reaper.
    pub reaped: u64,
}

impl CacheStats {
    /// Fraction of requests that did not start a fetch (0.0 to 1.0).
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.coalesced + self.fetches;
        if total == 0 {
            0.0
        } else {
            (self.hits + self.coalesced) as f64 / total as f64
        }
    }
}

/// State shared between the cache handle, fetch tasks and the reaper.
pub(super) struct CacheInner {
    entries: DashMap<String, CacheEntry>,
    config: CacheConfig,
    counters: CacheCounters,
}

impl CacheInner {
    /// Remove every expired `Done` entry. Returns how many were removed.
    pub(super) fn reap(&self) -> usize {
        let now = Instant::now();
        let max_age = self.config.max_age();
        let mut removed = 0;

        self.entries.retain(|_, entry| {
            let expired = entry.is_expired(now, max_age);
            if expired {
                removed += 1;
            }
            !expired
        });

        if removed > 0 {
            self.counters
                .reaped
                .fetch_add(removed as u64, Ordering::Relaxed);
            debug!(removed, remaining = self.entries.len(), "Reaped expired tiles");
        }
        removed
    }

    /// Store the outcome of a fetch and wake its waiters in arrival order.
    fn complete(&self, key: &str, result: TileResult<CachedTile>) {
        let now = Instant::now();

        let (waiters, result) = match result {
            Ok(tile) => {
                let tile = Arc::new(tile);
                let previous = self.entries.insert(
                    key.to_string(),
                    CacheEntry {
                        state: EntryState::Done(Arc::clone(&tile)),
                        stored_at: now,
                        last_access: now,
                    },
                );
                debug!(key, bytes = tile.body.len(), "Tile fetched and cached");
                (take_waiters(previous), Ok(tile))
            }
            Err(e) => {
                let previous = self.entries.remove(key).map(|(_, entry)| entry);
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                debug!(key, error = %e, "Tile fetch failed, entry dropped");
                (take_waiters(previous), Err(e))
            }
        };

        let count = waiters.len();
        for waiter in waiters {
            // Receiver gone means that caller was dropped.
            let _ = waiter.send(result.clone());
        }
        if count > 1 {
            debug!(key, waiters = count, "Delivered result to coalesced waiters");
        }
    }
}

fn take_waiters(entry: Option<CacheEntry>) -> Vec<Waiter> {
    match entry {
        Some(CacheEntry {
            state: EntryState::Pending(waiters),
            ..
        }) => waiters,
        _ => Vec::new(),
    }
}

/// Request-coalescing, time-expiring tile cache.
///
/// # Example
///
/// ```ignore
/// let cache = DogpileCache::new(CacheConfig::default());
/// let source = Arc::new(source);
/// let tile = cache
///     .get(address, move || async move { source.fetch(address).await })
///     .await?;
/// ```
pub struct DogpileCache {
    inner: Arc<CacheInner>,
    reaper: OnceLock<()>,
    shutdown: CancellationToken,
}

impl DogpileCache {
    /// Create an empty cache. The reaper starts on the first `get`.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                entries: DashMap::new(),
                config,
                counters: CacheCounters::default(),
            }),
            reaper: OnceLock::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// The cache's configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Get the tile at `address`, fetching it with `fetcher` on a miss.
    ///
    /// `fetcher` is called at most once, and only if this call starts the
    /// fetch. Concurrent calls for the same address share one fetch.
    ///
    /// # Errors
    ///
    /// Returns the fetch error mapped into [`TileError`]; nothing is cached.
    pub async fn get<F, Fut>(
        &self,
        address: TileAddress,
        fetcher: F,
    ) -> TileResult<Arc<CachedTile>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<UpstreamTile, SourceError>> + Send + 'static,
    {
        self.ensure_reaper();

        let key = address.cache_key();
        let now = Instant::now();
        let max_age = self.inner.config.max_age();

        let (receiver, start_fetch) = match self.inner.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                let fresh = now.saturating_duration_since(entry.stored_at) < max_age;
                match entry.state {
                    EntryState::Done(ref tile) if fresh => {
                        let tile = Arc::clone(tile);
                        entry.last_access = now;
                        self.inner.counters.hits.fetch_add(1, Ordering::Relaxed);
                        debug!(tile = %address, "Cache hit");
                        return Ok(tile);
                    }
                    EntryState::Pending(ref mut waiters) => {
                        let (tx, rx) = oneshot::channel();
                        waiters.push(tx);
                        self.inner.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                        debug!(
                            tile = %address,
                            waiters = waiters.len(),
                            "Joining in-flight fetch"
                        );
                        (rx, false)
                    }
                    EntryState::Done(_) => {
                        let (tx, rx) = oneshot::channel();
                        *entry = CacheEntry::pending(tx, now);
                        debug!(tile = %address, "Cached tile expired, refetching");
                        (rx, true)
                    }
                }
            }
            Entry::Vacant(vacant) => {
                let (tx, rx) = oneshot::channel();
                vacant.insert(CacheEntry::pending(tx, now));
                debug!(tile = %address, "Cache miss, fetching");
                (rx, true)
            }
        };

        if start_fetch {
            // A fetcher that panics before returning its future must still
            // release the pending entry.
            match panic::catch_unwind(AssertUnwindSafe(fetcher)) {
                Ok(fetch) => self.spawn_fetch(key, address, fetch),
                Err(_) => {
                    self.inner.counters.fetches.fetch_add(1, Ordering::Relaxed);
                    self.inner.complete(
                        &key,
                        Err(TileError::Upstream(
                            "Tile fetch failed: fetcher panicked".to_string(),
                        )),
                    );
                }
            }
        } else {
            drop(fetcher);
        }

        receiver
            .await
            .unwrap_or_else(|_| Err(TileError::Upstream("Tile fetch abandoned".to_string())))
    }

    fn spawn_fetch<Fut>(&self, key: String, address: TileAddress, fetch: Fut)
    where
        Fut: Future<Output = Result<UpstreamTile, SourceError>> + Send + 'static,
    {
        self.inner.counters.fetches.fetch_add(1, Ordering::Relaxed);
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            // The inner spawn turns a panicking source into an error result.
            let result = match tokio::spawn(fetch).await {
                Ok(Ok(tile)) => CachedTile::from_upstream(tile, inner.config.deflate_upstream()),
                Ok(Err(e)) => Err(TileError::from_source(address, e)),
                Err(e) => Err(TileError::Upstream(format!("Tile fetch failed: {}", e))),
            };
            inner.complete(&key, result);
        });
    }

    fn ensure_reaper(&self) {
        self.reaper.get_or_init(|| {
            let reaper = Reaper::new(Arc::downgrade(&self.inner), self.inner.config.reap_interval());
            tokio::spawn(reaper.run(self.shutdown.clone()));
        });
    }

    /// Returns true once the reaper has been started.
    pub fn reaper_started(&self) -> bool {
        self.reaper.get().is_some()
    }

    /// Remove every expired entry now. Returns how many were removed.
    pub fn reap(&self) -> usize {
        self.inner.reap()
    }

    /// Number of entries, pending or done.
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Returns true if an entry (pending or done) exists for `address`.
    pub fn contains(&self, address: TileAddress) -> bool {
        self.inner.entries.contains_key(&address.cache_key())
    }

    /// Time since the entry for `address` was last stored or served.
    pub fn idle_time(&self, address: TileAddress) -> Option<std::time::Duration> {
        self.inner
            .entries
            .get(&address.cache_key())
            .map(|entry| entry.last_access.elapsed())
    }

    /// Drop every completed entry. In-flight fetches are left alone.
    pub fn clear(&self) {
        self.inner.entries.retain(|_, entry| entry.is_pending());
    }

    /// Snapshot of cache statistics.
    pub fn stats(&self) -> CacheStats {
        let counters = &self.inner.counters;
        let pending = self
            .inner
            .entries
            .iter()
            .filter(|entry| entry.value().is_pending())
            .count();

        CacheStats {
            entries: self.inner.entries.len(),
            pending,
            hits: counters.hits.load(Ordering::Relaxed),
            fetches: counters.fetches.load(Ordering::Relaxed),
            coalesced: counters.coalesced.load(Ordering::Relaxed),
            errors: counters.errors.load(Ordering::Relaxed),
            reaped: counters.reaped.load(Ordering::Relaxed),
        }
    }

    /// Logs current statistics.
    pub fn log_stats(&self) {
        let stats = self.stats();
        info!(
            entries = stats.entries,
            pending = stats.pending,
            hits = stats.hits,
            fetches = stats.fetches,
            coalesced = stats.coalesced,
            errors = stats.errors,
            reaped = stats.reaped,
            hit_ratio = %format!("{:.1}%", stats.hit_ratio() * 100.0),
            "Tile cache statistics"
        );
    }

    /// Stop the reaper. Cached entries stay readable.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for DogpileCache {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
