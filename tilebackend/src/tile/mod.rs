//! Tile request and result types.
//!
//! [`RequestOptions`] travels into the backend with every call;
//! [`ResolvedTile`] comes back out, carrying the bytes, the address that
//! served them and the synthesized response headers.

mod request;
mod resolved;

pub use request::RequestOptions;
pub use resolved::{ResolutionReason, ResolvedTile};
