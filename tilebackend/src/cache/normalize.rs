//! Upstream body normalisation.
//!
//! Upstream stores often keep tiles zlib- or gzip-compressed. When enabled,
//! bodies are inflated once, before they enter the cache, so every reader
//! sees plain bytes. Detection is by magic bytes only:
//!
//! | Format | Magic   |
//! |--------|---------|
//! | zlib   | `78 9C` |
//! | gzip   | `1F 8B` |

use std::fmt;
use std::io::Read;

use bytes::Bytes;
use flate2::read::{GzDecoder, ZlibDecoder};

use crate::error::{TileError, TileResult};
use crate::source::{UpstreamHeaders, UpstreamTile};

const ZLIB_MAGIC: [u8; 2] = [0x78, 0x9C];
const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Compression removed from an upstream body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Zlib,
    Gzip,
}

impl Compression {
    /// Detect compression from the leading bytes.
    pub fn detect(body: &[u8]) -> Self {
        if body.starts_with(&ZLIB_MAGIC) {
            Compression::Zlib
        } else if body.starts_with(&GZIP_MAGIC) {
            Compression::Gzip
        } else {
            Compression::None
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            Compression::Zlib => write!(f, "zlib"),
            Compression::Gzip => write!(f, "gzip"),
        }
    }
}

/// A tile as stored in the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedTile {
    /// Normalised bytes.
    pub body: Bytes,
    /// Upstream headers.
    pub headers: UpstreamHeaders,
    /// Length of the raw upstream body.
    pub src_bytes: usize,
    /// Compression that was removed.
    pub compression: Compression,
}

impl CachedTile {
    /// Normalise an upstream tile.
    ///
    /// # Errors
    ///
    /// Returns [`TileError::Upstream`] if a body with a compression magic
    /// fails to inflate.
    pub fn from_upstream(tile: UpstreamTile, deflate: bool) -> TileResult<Self> {
        let src_bytes = tile.body.len();
        let compression = if deflate {
            Compression::detect(&tile.body)
        } else {
            Compression::None
        };

        let body = match compression {
            Compression::None => tile.body,
            Compression::Zlib => inflate(ZlibDecoder::new(tile.body.as_ref()), compression)?,
            Compression::Gzip => inflate(GzDecoder::new(tile.body.as_ref()), compression)?,
        };

        Ok(Self {
            body,
            headers: tile.headers,
            src_bytes,
            compression,
        })
    }
}

fn inflate<R: Read>(mut decoder: R, compression: Compression) -> TileResult<Bytes> {
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| TileError::Upstream(format!("Failed to inflate {} tile: {}", compression, e)))?;
    Ok(Bytes::from(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::{GzEncoder, ZlibEncoder};
    use std::io::Write;

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_detect() {
        assert_eq!(Compression::detect(&zlib(b"abc")), Compression::Zlib);
        assert_eq!(Compression::detect(&gzip(b"abc")), Compression::Gzip);
        assert_eq!(Compression::detect(b"plain"), Compression::None);
        assert_eq!(Compression::detect(b""), Compression::None);
        assert_eq!(Compression::detect(&[0x78]), Compression::None);
    }

    #[test]
    fn test_zlib_body_inflated() {
        let raw = zlib(b"vector tile payload");
        let tile = CachedTile::from_upstream(UpstreamTile::new(raw.clone()), true).unwrap();

        assert_eq!(tile.body.as_ref(), b"vector tile payload");
        assert_eq!(tile.src_bytes, raw.len());
        assert_eq!(tile.compression, Compression::Zlib);
    }

    #[test]
    fn test_gzip_body_inflated() {
        let raw = gzip(b"vector tile payload");
        let tile = CachedTile::from_upstream(UpstreamTile::new(raw), true).unwrap();

        assert_eq!(tile.body.as_ref(), b"vector tile payload");
        assert_eq!(tile.compression, Compression::Gzip);
    }

    #[test]
    fn test_deflate_disabled_keeps_raw_bytes() {
        let raw = gzip(b"payload");
        let tile = CachedTile::from_upstream(UpstreamTile::new(raw.clone()), false).unwrap();

        assert_eq!(tile.body.as_ref(), raw.as_slice());
        assert_eq!(tile.compression, Compression::None);
    }

    #[test]
    fn test_corrupt_body_is_upstream_error() {
        let raw = vec![0x1F, 0x8B, 0x00, 0x01, 0x02];
        let err = CachedTile::from_upstream(UpstreamTile::new(raw), true).unwrap_err();

        assert!(matches!(err, TileError::Upstream(_)));
        assert!(err.to_string().contains("gzip"));
    }

    #[test]
    fn test_headers_carried() {
        let tile = UpstreamTile::new(&b"x"[..]).with_header("ETag", "abc");
        let cached = CachedTile::from_upstream(tile, true).unwrap();

        assert_eq!(cached.headers.get("etag"), Some("abc"));
    }
}
