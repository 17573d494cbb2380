//! Tile pyramid addressing.
//!
//! Provides the validated [`TileAddress`] value type and the pure zoom
//! resolution that maps a requested tile onto the tile an upstream source
//! actually stores.
//!
//! Each zoom level `z` holds `2^z × 2^z` tiles. Moving from a deep zoom `z`
//! to a coarser zoom `bz` divides both axes by `2^(z - bz)`, so the coarse
//! ancestor of a tile is a pair of right shifts.

mod resolver;

pub use resolver::{resolve, CandidateReason, Resolution, ResolvedCandidate};

use std::fmt;

use crate::error::{TileError, TileResult};

/// Deepest zoom level accepted.
///
/// At zoom 32 the largest column or row is `2^32 - 1`, the top of `u32`.
/// Deeper requests fail with [`TileError::OutOfRange`].
pub const MAX_ZOOM: u8 = 32;

/// Immutable, validated tile address.
///
/// Valid iff `0 <= z <= MAX_ZOOM` and `0 <= x, y < 2^z`. Construct with
/// [`TileAddress::new`] or [`TileAddress::from_signed`]; fields are private
/// so an invalid address cannot exist.
///
/// # Example
///
/// ```
/// use tilebackend::coord::TileAddress;
///
/// let tile = TileAddress::new(2, 3, 1).unwrap();
/// assert_eq!(tile.cache_key(), "2/3/1");
/// assert_eq!(tile.ancestor(1), TileAddress::new(1, 1, 0).unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileAddress {
    z: u8,
    x: u32,
    y: u32,
}

impl TileAddress {
    /// Create an address from unsigned components.
    ///
    /// # Errors
    ///
    /// Returns [`TileError::OutOfRange`] if the zoom exceeds [`MAX_ZOOM`] or
    /// `x`/`y` fall outside `[0, 2^z)`.
    pub fn new(z: u8, x: u32, y: u32) -> TileResult<Self> {
        Self::from_signed(z as i64, x as i64, y as i64)
    }

    /// Create an address from raw request components, which may be negative.
    pub fn from_signed(z: i64, x: i64, y: i64) -> TileResult<Self> {
        let out_of_range = || TileError::OutOfRange { z, x, y };

        if !(0..=MAX_ZOOM as i64).contains(&z) {
            return Err(out_of_range());
        }
        let extent = 1i64 << z;
        if !(0..extent).contains(&x) || !(0..extent).contains(&y) {
            return Err(out_of_range());
        }

        Ok(Self {
            z: z as u8,
            x: x as u32,
            y: y as u32,
        })
    }

    /// Zoom level.
    pub fn z(&self) -> u8 {
        self.z
    }

    /// Column.
    pub fn x(&self) -> u32 {
        self.x
    }

    /// Row.
    pub fn y(&self) -> u32 {
        self.y
    }

    /// Number of tiles along one axis at this zoom.
    pub fn extent(&self) -> u64 {
        1u64 << self.z
    }

    /// The ancestor of this tile at the coarser zoom `bz`.
    ///
    /// `bz` is clamped to this tile's own zoom, so asking for a deeper zoom
    /// returns the tile itself.
    pub fn ancestor(&self, bz: u8) -> Self {
        let bz = bz.min(self.z);
        let shift = u32::from(self.z - bz);
        Self {
            z: bz,
            x: ((self.x as u64) >> shift) as u32,
            y: ((self.y as u64) >> shift) as u32,
        }
    }

    /// Cache key in `z/x/y` form.
    pub fn cache_key(&self) -> String {
        format!("{}/{}/{}", self.z, self.x, self.y)
    }
}

impl fmt::Display for TileAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}
