//! Tile cache between the backend and its upstream source.
//!
//! [`DogpileCache`] collapses concurrent fetches for one upstream address into
//! a single fetch, keeps completed tiles for a configurable max age and
//! reaps expired entries in the background. Bodies are normalised (inflated)
//! once on their way in; see [`CachedTile`].

mod config;
mod dogpile;
mod normalize;
mod reaper;

pub use config::{CacheConfig, DEFAULT_MAX_AGE_MS};
pub use dogpile::{CacheStats, DogpileCache};
pub use normalize::{CachedTile, Compression};
