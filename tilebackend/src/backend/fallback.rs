//! Fallback state machine for a single tile request.
//!
//! ```text
//!             ok                                   ok
//! TryPrimary ────► Resolved(Direct|Overzoom)   ┌──────► Resolved(Fillzoom)
//!     │                                        │
//!     │ NotFound + fillzoom candidate          │ NotFound
//!     ├─────────────────────────► TryFillzoom ─┼──────► Resolved(Empty)
//!     │                                        │
//!     │ NotFound, no candidate                 │ other error
//!     ├──► Resolved(Empty)  (Failed if strict) └──────► Failed
//!     │
//!     │ other error
//!     └──► Failed
//! ```
//!
//! At most one fallback hop is taken. The mask-level retry is not part of
//! this machine; it wraps the whole draw in [`Backend::draw`](super::Backend::draw).

use std::sync::Arc;

use crate::cache::CachedTile;
use crate::coord::{ResolvedCandidate, TileAddress};
use crate::error::TileError;
use crate::tile::ResolutionReason;

/// Where a request is in its fallback chain.
#[derive(Debug)]
pub(super) enum FallbackState {
    TryPrimary,
    TryFillzoom(ResolvedCandidate),
    Resolved(Outcome),
    Failed(TileError),
}

/// The upstream result a request settled on.
#[derive(Debug)]
pub(super) struct Outcome {
    pub(super) address: TileAddress,
    pub(super) reason: ResolutionReason,
    pub(super) tile: Option<Arc<CachedTile>>,
}

impl Outcome {
    pub(super) fn found(candidate: ResolvedCandidate, tile: Arc<CachedTile>) -> Self {
        Self {
            address: candidate.address,
            reason: candidate.reason.into(),
            tile: Some(tile),
        }
    }

    pub(super) fn empty(address: TileAddress) -> Self {
        Self {
            address,
            reason: ResolutionReason::Empty,
            tile: None,
        }
    }

    /// Turn this outcome into an empty one, keeping the address.
    pub(super) fn into_empty(self) -> Self {
        Self::empty(self.address)
    }
}
