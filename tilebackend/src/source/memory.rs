//! In-memory tile source.
//!
//! Holds tiles in a map and counts every fetch per address, which makes it
//! the source of choice for exercising the cache and the fallback chain.
//! Errors and latency can be injected per source or per address.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use parking_lot::RwLock;

use super::{SourceError, SourceInfo, UpstreamSource, UpstreamTile};
use crate::coord::TileAddress;

/// In-memory tile source with fetch accounting.
#[derive(Debug, Default)]
pub struct MemoryTileSource {
    tiles: RwLock<HashMap<TileAddress, UpstreamTile>>,
    failures: RwLock<HashMap<TileAddress, SourceError>>,
    fetch_counts: RwLock<HashMap<TileAddress, usize>>,
    total_fetches: AtomicUsize,
    delay: Option<Duration>,
    info: SourceInfo,
}

impl MemoryTileSource {
    /// Create an empty source described by `info`.
    pub fn new(info: SourceInfo) -> Self {
        Self {
            info,
            ..Self::default()
        }
    }

    /// Sleep for `delay` inside every fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Store raw bytes at `address`.
    pub fn insert(&self, address: TileAddress, body: impl Into<Bytes>) {
        self.insert_tile(address, UpstreamTile::new(body));
    }

    /// Store a tile with headers at `address`.
    pub fn insert_tile(&self, address: TileAddress, tile: UpstreamTile) {
        self.tiles.write().insert(address, tile);
    }

    /// Make fetches of `address` fail with `error`.
    pub fn fail(&self, address: TileAddress, error: SourceError) {
        self.failures.write().insert(address, error);
    }

    /// Stop failing fetches of `address`.
    pub fn heal(&self, address: TileAddress) {
        self.failures.write().remove(&address);
    }

    /// Number of fetches made for `address`.
    pub fn fetch_count(&self, address: TileAddress) -> usize {
        self.fetch_counts.read().get(&address).copied().unwrap_or(0)
    }

    /// Number of fetches made for any address.
    pub fn total_fetches(&self) -> usize {
        self.total_fetches.load(Ordering::SeqCst)
    }
}

impl UpstreamSource for MemoryTileSource {
    async fn fetch(&self, address: TileAddress) -> Result<UpstreamTile, SourceError> {
        *self.fetch_counts.write().entry(address).or_insert(0) += 1;
        self.total_fetches.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.failures.read().get(&address) {
            return Err(error.clone());
        }

        self.tiles
            .read()
            .get(&address)
            .cloned()
            .ok_or(SourceError::NotFound)
    }

    async fn info(&self) -> Result<SourceInfo, SourceError> {
        Ok(self.info.clone())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
