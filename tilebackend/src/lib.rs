//! tilebackend - Zoom-resolving tile backend for tiled map pyramids
//!
//! This library sits between tile consumers and an upstream tile source. It
//! maps a requested `(z, x, y)` onto the tile the upstream actually stores
//! (overzoom, legacy scale quantization, fillzoom and mask-level fallbacks),
//! collapses concurrent fetches for the same upstream tile into one, and
//! synthesizes deterministic response headers.
//!
//! # Layers
//!
//! ```text
//! caller ──► Backend ──► coord::resolve ──► DogpileCache ──► UpstreamSource
//!               │                                │
//!               ▼                                ▼
//!        HeaderSynthesizer                normalize (inflate)
//!               │
//!               ▼
//!        TileRenderer ──► TileCodec (external)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use tilebackend::backend::Backend;
//! use tilebackend::cache::CacheConfig;
//! use tilebackend::source::TileSource;
//! use tilebackend::tile::RequestOptions;
//!
//! let source = TileSource::open("file:///srv/tiles")?;
//! let backend = Backend::new(source, CacheConfig::default());
//! let tile = backend.get_tile(14, 8185, 5447, &RequestOptions::default()).await?;
//! println!("{}", tile.headers.etag);
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod coord;
pub mod error;
pub mod headers;
pub mod logging;
pub mod render;
pub mod source;
pub mod tile;

pub use error::{TileError, TileResult};

/// Library version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
