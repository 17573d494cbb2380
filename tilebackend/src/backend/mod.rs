//! Tile backend: resolution, fallback and header synthesis over one source.
//!
//! [`Backend`] owns an upstream source, the [`DogpileCache`] in front of it
//! and the source's capabilities. A request flows through it as:
//!
//! 1. Validate `(z, x, y)` into a [`TileAddress`]
//! 2. Load capabilities (once, lazily) and [`resolve`] the candidates
//! 3. Walk the fallback chain, fetching each candidate through the cache
//! 4. Apply the empty-tile rules and synthesize headers
//!
//! [`Backend::draw`] adds the mask-level retry on top: if resolving or
//! drawing at primary resolution fails, the request is redrawn once from
//! the mask-level tile.
//!
//! # Example
//!
//! ```ignore
//! use tilebackend::backend::Backend;
//! use tilebackend::cache::CacheConfig;
//! use tilebackend::tile::RequestOptions;
//!
//! let backend = Backend::new(source, CacheConfig::default());
//! let tile = backend.get_tile(2, 0, 0, &RequestOptions::default()).await?;
//! assert_eq!(tile.headers.backend_object.as_str(), "overzoom");
//! ```

mod fallback;

use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::cache::{CacheConfig, CachedTile, DogpileCache};
use crate::coord::{resolve, Resolution, TileAddress};
use crate::error::{TileError, TileResult};
use crate::headers::HeaderSynthesizer;
use crate::source::{SourceCapabilities, SourceInfo, SourceKind, UpstreamSource};
use crate::tile::{RequestOptions, ResolutionReason, ResolvedTile};

use fallback::{FallbackState, Outcome};

/// Zoom-resolving, dogpile-safe backend over an upstream source.
pub struct Backend<S: UpstreamSource> {
    source: Arc<S>,
    cache: DogpileCache,
    capabilities: RwLock<Option<SourceCapabilities>>,
    headers: HeaderSynthesizer,
}

impl<S: UpstreamSource> Backend<S> {
    /// Create a backend. Capabilities are loaded from the source on first use.
    pub fn new(source: S, config: CacheConfig) -> Self {
        Self {
            source: Arc::new(source),
            cache: DogpileCache::new(config),
            capabilities: RwLock::new(None),
            headers: HeaderSynthesizer::new(),
        }
    }

    /// Use fixed capabilities instead of loading them from the source.
    pub fn with_capabilities(self, capabilities: SourceCapabilities) -> Self {
        *self.capabilities.write() = Some(capabilities);
        self
    }

    /// Use a custom header synthesizer.
    pub fn with_header_synthesizer(mut self, headers: HeaderSynthesizer) -> Self {
        self.headers = headers;
        self
    }

    /// The upstream source.
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// The cache in front of the source.
    pub fn cache(&self) -> &DogpileCache {
        &self.cache
    }

    /// The source's metadata document.
    pub async fn info(&self) -> TileResult<SourceInfo> {
        self.source
            .info()
            .await
            .map_err(|e| TileError::SourceNotLoaded(e.to_string()))
    }

    /// The source's capabilities, loading them on first call.
    pub async fn capabilities(&self) -> TileResult<SourceCapabilities> {
        let cached = *self.capabilities.read();
        if let Some(capabilities) = cached {
            return Ok(capabilities);
        }

        let info = self.info().await?;
        let capabilities = SourceCapabilities::from_info(&info);
        info!(
            source = self.source.name(),
            minzoom = capabilities.minzoom,
            maxzoom = capabilities.maxzoom,
            policy = ?capabilities.policy,
            kind = ?capabilities.kind,
            "Loaded source capabilities"
        );

        // A concurrent loader or `reconfigure` may have won; keep theirs.
        Ok(*self.capabilities.write().get_or_insert(capabilities))
    }

    /// Replace the source's capabilities.
    ///
    /// `None` forgets them so the next request reloads them from the source.
    pub fn reconfigure(&self, capabilities: Option<SourceCapabilities>) {
        debug!(?capabilities, "Reconfiguring source capabilities");
        *self.capabilities.write() = capabilities;
    }

    /// Resolve a request into upstream candidates without fetching anything.
    pub async fn resolve(
        &self,
        z: i64,
        x: i64,
        y: i64,
        options: &RequestOptions,
    ) -> TileResult<Resolution> {
        let requested = TileAddress::from_signed(z, x, y)?;
        let capabilities = self.capabilities().await?;
        Ok(resolve(requested, options, &capabilities))
    }

    /// Get the tile for a request, following the fallback chain.
    ///
    /// # Errors
    ///
    /// - [`TileError::OutOfRange`] for an invalid coordinate (nothing fetched)
    /// - [`TileError::NotFound`] only when `options.strict` is set
    /// - [`TileError::Upstream`] for any other fetch failure, unchanged
    pub async fn get_tile(
        &self,
        z: i64,
        x: i64,
        y: i64,
        options: &RequestOptions,
    ) -> TileResult<ResolvedTile> {
        let resolution = self.resolve(z, x, y, options).await?;
        let capabilities = self.capabilities().await?;
        self.fetch_resolution(&resolution, options, &capabilities).await
    }

    /// Get a tile and hand it to `draw`, retrying once at the mask level.
    ///
    /// When the source's policy is mask-level and either resolving or
    /// drawing at primary resolution fails with anything but
    /// [`TileError::OutOfRange`], the mask-level tile is resolved and drawn
    /// once more. A second failure is returned unchanged.
    pub async fn draw<T, F, Fut>(
        &self,
        z: i64,
        x: i64,
        y: i64,
        options: &RequestOptions,
        mut draw: F,
    ) -> TileResult<T>
    where
        F: FnMut(ResolvedTile) -> Fut,
        Fut: Future<Output = TileResult<T>>,
    {
        let resolution = self.resolve(z, x, y, options).await?;
        let capabilities = self.capabilities().await?;

        let first = match self
            .fetch_resolution(&resolution, options, &capabilities)
            .await
        {
            Ok(tile) => draw(tile).await,
            Err(e) => Err(e),
        };

        let err = match first {
            Ok(drawn) => return Ok(drawn),
            Err(e) if e.is_out_of_range() => return Err(e),
            Err(e) => e,
        };
        let Some(mask) = resolution.mask_level() else {
            return Err(err);
        };

        debug!(
            tile = %resolution.requested,
            mask = %mask.address,
            error = %err,
            "Draw failed at primary resolution, retrying at mask level"
        );

        let retry = Resolution {
            requested: resolution.requested,
            primary: mask,
            degraded: None,
        };
        let tile = self
            .fetch_resolution(&retry, options, &capabilities)
            .await?;
        draw(tile).await
    }

    /// Stop background work. The backend stays usable.
    pub fn shutdown(&self) {
        self.cache.shutdown();
    }

    async fn fetch(&self, address: TileAddress) -> TileResult<Arc<CachedTile>> {
        let source = Arc::clone(&self.source);
        self.cache
            .get(address, move || async move { source.fetch(address).await })
            .await
    }

    async fn fetch_resolution(
        &self,
        resolution: &Resolution,
        options: &RequestOptions,
        capabilities: &SourceCapabilities,
    ) -> TileResult<ResolvedTile> {
        let primary = resolution.primary;
        let mut state = FallbackState::TryPrimary;

        loop {
            state = match state {
                FallbackState::TryPrimary => match self.fetch(primary.address).await {
                    Ok(tile) => FallbackState::Resolved(Outcome::found(primary, tile)),
                    Err(e) if e.is_not_found() => match resolution.fillzoom() {
                        Some(fill) => {
                            debug!(
                                tile = %resolution.requested,
                                fillzoom = %fill.address,
                                "Primary tile missing, trying fillzoom"
                            );
                            FallbackState::TryFillzoom(fill)
                        }
                        None if options.strict => FallbackState::Failed(e),
                        None => FallbackState::Resolved(Outcome::empty(primary.address)),
                    },
                    Err(e) => FallbackState::Failed(e),
                },
                FallbackState::TryFillzoom(fill) => match self.fetch(fill.address).await {
                    Ok(tile) => FallbackState::Resolved(Outcome::found(fill, tile)),
                    Err(e) if e.is_not_found() => {
                        FallbackState::Resolved(Outcome::empty(fill.address))
                    }
                    Err(e) => FallbackState::Failed(e),
                },
                FallbackState::Resolved(outcome) => {
                    return Ok(self.finish(resolution.requested, outcome, capabilities));
                }
                FallbackState::Failed(e) => {
                    debug!(tile = %resolution.requested, error = %e, "Tile request failed");
                    return Err(e);
                }
            };
        }
    }

    /// Apply the empty-tile rules and build the result.
    fn finish(
        &self,
        requested: TileAddress,
        outcome: Outcome,
        capabilities: &SourceCapabilities,
    ) -> ResolvedTile {
        let outcome = match &outcome.tile {
            Some(tile) if tile.src_bytes == 0 => outcome.into_empty(),
            Some(_)
                if capabilities.kind == SourceKind::Raster
                    && outcome.address.z() < requested.z()
                    && outcome.reason != ResolutionReason::Fillzoom =>
            {
                debug!(tile = %requested, "Raster source will not stretch coarse tile");
                outcome.into_empty()
            }
            _ => outcome,
        };

        match outcome.tile {
            Some(tile) => ResolvedTile {
                requested,
                address: outcome.address,
                reason: outcome.reason,
                headers: self.headers.synthesize(
                    requested,
                    Some(&tile.body),
                    Some(&tile.headers),
                    outcome.reason,
                ),
                data: Some(tile.body.clone()),
                src_bytes: tile.src_bytes,
            },
            None => ResolvedTile {
                requested,
                address: outcome.address,
                reason: ResolutionReason::Empty,
                headers: self
                    .headers
                    .synthesize(requested, None, None, ResolutionReason::Empty),
                data: None,
                src_bytes: 0,
            },
        }
    }
}
