//! Error taxonomy for tile resolution.
//!
//! Every failure a caller can observe is a [`TileError`]. The kinds are kept
//! distinct so callers can tell an empty tile (valid content) from a real
//! failure:
//!
//! - [`TileError::OutOfRange`] - malformed request coordinate, never retried
//! - [`TileError::NotFound`] - upstream has no data; absorbed into an empty
//!   tile unless the caller asked for strict existence
//! - [`TileError::Upstream`] - any other fetch failure, message preserved
//! - [`TileError::Codec`] - decode/render failure from the external codec
//!
//! `OutOfRange` and `NotFound` both display as `"Tile does not exist"`, the
//! message existing tile consumers match on.

use thiserror::Error;

use crate::coord::TileAddress;
use crate::source::SourceError;

/// Message carried by both absence errors.
pub const TILE_DOES_NOT_EXIST: &str = "Tile does not exist";

/// Result type for tile operations.
pub type TileResult<T> = Result<T, TileError>;

/// Errors surfaced by the resolver, cache and backend.
///
/// `Clone` so a single fetch failure can be delivered to every waiter that
/// joined the same in-flight request.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TileError {
    /// Requested coordinate is outside the pyramid.
    #[error("Tile does not exist")]
    OutOfRange { z: i64, x: i64, y: i64 },

    /// Upstream has no tile at this address.
    #[error("Tile does not exist")]
    NotFound(TileAddress),

    /// Upstream fetch failed for any other reason.
    #[error("{0}")]
    Upstream(String),

    /// The external codec failed to decode or render.
    #[error("{0}")]
    Codec(String),

    /// Source capabilities could not be loaded.
    #[error("Tilesource not loaded: {0}")]
    SourceNotLoaded(String),
}

impl TileError {
    /// Returns true for the upstream absence sentinel.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TileError::NotFound(_))
    }

    /// Returns true if the request itself was invalid.
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, TileError::OutOfRange { .. })
    }

    /// Maps an upstream error for the tile at `address` into the taxonomy.
    pub fn from_source(address: TileAddress, err: SourceError) -> Self {
        if err.is_not_found() {
            TileError::NotFound(address)
        } else {
            TileError::Upstream(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absence_errors_share_message() {
        let out = TileError::OutOfRange { z: -1, x: 0, y: 0 };
        let missing = TileError::NotFound(TileAddress::new(1, 0, 0).unwrap());

        assert_eq!(out.to_string(), TILE_DOES_NOT_EXIST);
        assert_eq!(missing.to_string(), TILE_DOES_NOT_EXIST);
        assert!(out.is_out_of_range());
        assert!(missing.is_not_found());
        assert_ne!(out, missing);
    }

    #[test]
    fn test_upstream_message_preserved() {
        let err = TileError::Upstream("disk read failed".to_string());
        assert_eq!(err.to_string(), "disk read failed");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_from_source_maps_sentinel() {
        let address = TileAddress::new(2, 1, 1).unwrap();

        let err = TileError::from_source(address, SourceError::NotFound);
        assert_eq!(err, TileError::NotFound(address));

        let err = TileError::from_source(address, SourceError::Io("disk read failed".into()));
        assert_eq!(err, TileError::Upstream("disk read failed".to_string()));
    }

    #[test]
    fn test_from_source_recognises_sentinel_message() {
        let address = TileAddress::new(3, 2, 5).unwrap();

        let sentinel = SourceError::Message(TILE_DOES_NOT_EXIST.into());
        let err = TileError::from_source(address, sentinel);
        assert_eq!(err, TileError::NotFound(address));
        assert!(err.is_not_found());

        let other = SourceError::Message("tile does not exist".into());
        let err = TileError::from_source(address, other);
        assert!(!err.is_not_found());
    }
}
