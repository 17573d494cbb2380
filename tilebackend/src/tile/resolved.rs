//! The result of resolving a tile request.

use bytes::Bytes;

use crate::coord::{CandidateReason, TileAddress};
use crate::headers::{BackendObject, TileHeaders};

/// Which path served a resolved tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionReason {
    /// Served at the requested (or legacy-quantized) zoom.
    Direct,
    /// Served from the source's maximum zoom.
    Overzoom,
    /// Served from the fillzoom level after the primary tile was absent.
    Fillzoom,
    /// Served from the mask level after drawing at primary resolution failed.
    MaskLevel,
    /// No data; the tile is valid content that paints as blank.
    Empty,
}

impl ResolutionReason {
    /// The `x-vector-backend-object` value reported for this reason.
    pub fn backend_object(&self) -> BackendObject {
        match self {
            ResolutionReason::Direct => BackendObject::Default,
            ResolutionReason::Overzoom => BackendObject::Overzoom,
            ResolutionReason::Fillzoom | ResolutionReason::MaskLevel => BackendObject::Fillzoom,
            ResolutionReason::Empty => BackendObject::Empty,
        }
    }
}

impl From<CandidateReason> for ResolutionReason {
    fn from(reason: CandidateReason) -> Self {
        match reason {
            CandidateReason::Direct => ResolutionReason::Direct,
            CandidateReason::Overzoom => ResolutionReason::Overzoom,
            CandidateReason::Fillzoom => ResolutionReason::Fillzoom,
            CandidateReason::MaskLevel => ResolutionReason::MaskLevel,
        }
    }
}

/// A tile resolved by the backend.
#[derive(Debug, Clone)]
pub struct ResolvedTile {
    /// The address the caller asked for.
    pub requested: TileAddress,
    /// The upstream address whose data (or absence) produced this result.
    pub address: TileAddress,
    /// Which path served the tile.
    pub reason: ResolutionReason,
    /// Normalized tile bytes, `None` for empty tiles.
    pub data: Option<Bytes>,
    /// Size of the raw upstream payload, for cost attribution.
    pub src_bytes: usize,
    /// Response headers for this tile.
    pub headers: TileHeaders,
}

impl ResolvedTile {
    /// Returns true if the tile carries no data.
    pub fn is_empty(&self) -> bool {
        self.reason == ResolutionReason::Empty
    }

    /// Tile bytes, or an empty slice.
    pub fn bytes(&self) -> &[u8] {
        self.data.as_deref().unwrap_or_default()
    }
}
