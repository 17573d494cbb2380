//! Response header synthesis.
//!
//! [`HeaderSynthesizer`] builds the transport headers for a resolved tile.
//! It is deterministic and performs no I/O:
//!
//! | Header                    | Source                                              |
//! |---------------------------|-----------------------------------------------------|
//! | `Last-Modified`           | upstream value as an HTTP date, else the epoch      |
//! | `ETag`                    | upstream value, else SHA-256 of `"z,x,y"` + payload |
//! | `Content-Type`            | fixed tile MIME type                                |
//! | `Expires`                 | upstream value verbatim, else omitted               |
//! | `x-vector-backend-object` | which path served the tile                          |
//!
//! The ETag is computed over the *requested* coordinates, so an overzoomed
//! tile shared by many requests still gets a per-request ETag.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::coord::TileAddress;
use crate::source::UpstreamHeaders;
use crate::tile::ResolutionReason;

/// MIME type of the tiles served by the backend.
pub const TILE_CONTENT_TYPE: &str = "application/x-protobuf";

/// Header name reporting which path served a tile.
pub const BACKEND_OBJECT_HEADER: &str = "x-vector-backend-object";

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Value of the `x-vector-backend-object` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendObject {
    Default,
    Empty,
    Overzoom,
    Fillzoom,
}

impl BackendObject {
    /// Header value.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendObject::Default => "default",
            BackendObject::Empty => "empty",
            BackendObject::Overzoom => "overzoom",
            BackendObject::Fillzoom => "fillzoom",
        }
    }
}

impl fmt::Display for BackendObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Headers attached to a resolved tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileHeaders {
    pub content_type: String,
    pub etag: String,
    pub last_modified: String,
    pub expires: Option<String>,
    pub backend_object: BackendObject,
}

impl TileHeaders {
    /// Header name/value pairs ready for a transport layer.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("Content-Type".to_string(), self.content_type.clone());
        map.insert("ETag".to_string(), self.etag.clone());
        map.insert("Last-Modified".to_string(), self.last_modified.clone());
        if let Some(expires) = &self.expires {
            map.insert("Expires".to_string(), expires.clone());
        }
        map.insert(
            BACKEND_OBJECT_HEADER.to_string(),
            self.backend_object.as_str().to_string(),
        );
        map
    }
}

/// Builds [`TileHeaders`] from a resolution result.
#[derive(Debug, Clone)]
pub struct HeaderSynthesizer {
    content_type: String,
}

impl HeaderSynthesizer {
    /// Create a synthesizer for the default tile MIME type.
    pub fn new() -> Self {
        Self::with_content_type(TILE_CONTENT_TYPE)
    }

    /// Create a synthesizer reporting a specific MIME type.
    pub fn with_content_type(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
        }
    }

    /// Synthesize headers for a resolved tile.
    ///
    /// # Arguments
    ///
    /// * `requested` - The address the caller asked for
    /// * `payload` - Resolved bytes, `None` for empty tiles
    /// * `upstream` - Headers supplied by the upstream, `None` for empty tiles
    /// * `reason` - Which path served the tile
    pub fn synthesize(
        &self,
        requested: TileAddress,
        payload: Option<&[u8]>,
        upstream: Option<&UpstreamHeaders>,
        reason: ResolutionReason,
    ) -> TileHeaders {
        let last_modified = upstream
            .and_then(|h| h.get("Last-Modified"))
            .map(http_date)
            .unwrap_or_else(|| format_http_date(DateTime::<Utc>::default()));

        let etag = upstream
            .and_then(|h| h.get("ETag"))
            .map(str::to_string)
            .unwrap_or_else(|| compute_etag(requested, payload.unwrap_or_default()));

        let expires = upstream.and_then(|h| h.get("Expires")).map(str::to_string);

        TileHeaders {
            content_type: self.content_type.clone(),
            etag,
            last_modified,
            expires,
            backend_object: reason.backend_object(),
        }
    }
}

impl Default for HeaderSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute the quoted content ETag for a tile.
///
/// Equal inputs always give the same ETag; changing the payload or the
/// coordinates changes it.
pub fn compute_etag(requested: TileAddress, payload: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{},{},{}", requested.z(), requested.x(), requested.y()).as_bytes());
    hasher.update(payload);
    format!("\"{:x}\"", hasher.finalize())
}

/// Format a timestamp as an HTTP date.
pub fn format_http_date(time: DateTime<Utc>) -> String {
    time.format(HTTP_DATE_FORMAT).to_string()
}

/// Normalize an upstream date string; unparseable values pass through.
fn http_date(value: &str) -> String {
    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map(|parsed| format_http_date(parsed.with_timezone(&Utc)))
        .unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(z: u8, x: u32, y: u32) -> TileAddress {
        TileAddress::new(z, x, y).unwrap()
    }

    fn upstream(pairs: &[(&str, &str)]) -> UpstreamHeaders {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_epoch_last_modified_without_upstream() {
        let headers = HeaderSynthesizer::new().synthesize(
            addr(0, 0, 0),
            None,
            None,
            ResolutionReason::Empty,
        );

        assert_eq!(headers.last_modified, "Thu, 01 Jan 1970 00:00:00 GMT");
        assert_eq!(headers.backend_object, BackendObject::Empty);
        assert_eq!(headers.content_type, TILE_CONTENT_TYPE);
        assert!(headers.expires.is_none());
    }

    #[test]
    fn test_upstream_last_modified_reformatted() {
        let up = upstream(&[("last-modified", "Wed, 21 Oct 2015 07:28:00 +0000")]);
        let headers = HeaderSynthesizer::new().synthesize(
            addr(1, 0, 0),
            Some(b"data"),
            Some(&up),
            ResolutionReason::Direct,
        );

        assert_eq!(headers.last_modified, "Wed, 21 Oct 2015 07:28:00 GMT");
    }

    #[test]
    fn test_unparseable_last_modified_passes_through() {
        let up = upstream(&[("Last-Modified", "yesterday")]);
        let headers = HeaderSynthesizer::new().synthesize(
            addr(1, 0, 0),
            Some(b"data"),
            Some(&up),
            ResolutionReason::Direct,
        );

        assert_eq!(headers.last_modified, "yesterday");
    }

    #[test]
    fn test_etag_deterministic() {
        let a = compute_etag(addr(3, 1, 2), b"payload");
        let b = compute_etag(addr(3, 1, 2), b"payload");
        assert_eq!(a, b);
        assert!(a.starts_with('"') && a.ends_with('"'));
    }

    #[test]
    fn test_etag_changes_with_payload_and_coords() {
        let base = compute_etag(addr(3, 1, 2), b"payload");
        assert_ne!(base, compute_etag(addr(3, 1, 2), b"payload2"));
        assert_ne!(base, compute_etag(addr(3, 2, 1), b"payload"));
        assert_ne!(base, compute_etag(addr(3, 1, 2), b""));
    }

    #[test]
    fn test_upstream_etag_passed_through() {
        let up = upstream(&[("ETag", "73f12a518adef759138c142865287a18")]);
        let headers = HeaderSynthesizer::new().synthesize(
            addr(1, 0, 0),
            Some(b"data"),
            Some(&up),
            ResolutionReason::Direct,
        );

        assert_eq!(headers.etag, "73f12a518adef759138c142865287a18");
    }

    #[test]
    fn test_expires_passed_through_case_insensitive() {
        let up = upstream(&[("expires", "Wed, 01 Jan 2020 00:00:00 GMT")]);
        let headers = HeaderSynthesizer::new().synthesize(
            addr(0, 0, 0),
            Some(b"data"),
            Some(&up),
            ResolutionReason::Direct,
        );

        assert_eq!(headers.expires.as_deref(), Some("Wed, 01 Jan 2020 00:00:00 GMT"));
        assert_eq!(
            headers.to_map().get("Expires").map(String::as_str),
            Some("Wed, 01 Jan 2020 00:00:00 GMT")
        );
    }

    #[test]
    fn test_to_map_keys() {
        let headers = HeaderSynthesizer::new().synthesize(
            addr(2, 0, 0),
            Some(b"x"),
            None,
            ResolutionReason::Overzoom,
        );
        let map = headers.to_map();

        assert_eq!(map.get("Content-Type").unwrap(), TILE_CONTENT_TYPE);
        assert!(map.contains_key("ETag"));
        assert!(map.contains_key("Last-Modified"));
        assert!(!map.contains_key("Expires"));
        assert_eq!(map.get(BACKEND_OBJECT_HEADER).unwrap(), "overzoom");
    }
}
