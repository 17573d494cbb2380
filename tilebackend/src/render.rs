//! Drawing resolved tiles with an external codec.
//!
//! The backend only resolves bytes. Turning them into an image (or any other
//! output) is the job of a [`TileCodec`], which this crate defines but does
//! not implement. [`TileRenderer`] wires the two together and is where codec
//! failures enter the mask-level retry.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::backend::Backend;
use crate::coord::TileAddress;
use crate::error::{TileError, TileResult};
use crate::headers::TileHeaders;
use crate::source::UpstreamSource;
use crate::tile::{RequestOptions, ResolutionReason, ResolvedTile};

/// Tile edge length in pixels at scale 1.
pub const TILE_SIZE: u32 = 256;

/// Options passed to [`TileCodec::decode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Upgrade older tile encodings while decoding.
    pub upgrade: bool,
}

/// Options passed to [`TileCodec::render`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    /// The tile the caller asked for.
    pub requested: TileAddress,
    /// Pixel density.
    pub scale: f64,
    /// Rendering buffer around the tile, `256 * scale` pixels.
    pub buffer_size: u32,
}

impl RenderOptions {
    fn for_request(requested: TileAddress, options: &RequestOptions) -> Self {
        Self {
            requested,
            scale: options.scale(),
            buffer_size: (f64::from(TILE_SIZE) * options.scale()) as u32,
        }
    }
}

/// Decodes and renders tile bytes.
pub trait TileCodec: Send + Sync {
    /// Decoded tile.
    type Tile;
    /// Codec failure.
    type Error: fmt::Display;

    /// Decode the bytes stored at `address`. Empty tiles pass an empty slice.
    fn decode(
        &self,
        data: &[u8],
        address: TileAddress,
        options: &DecodeOptions,
    ) -> Result<Self::Tile, Self::Error>;

    /// Render a decoded tile.
    fn render(&self, tile: &Self::Tile, options: &RenderOptions) -> Result<Bytes, Self::Error>;

    /// Returns true if the decoded tile has no content.
    fn is_empty(&self, tile: &Self::Tile) -> bool;
}

/// Output of [`TileRenderer::render`].
#[derive(Debug, Clone)]
pub struct RenderedTile {
    /// Rendered bytes, or the raw tile bytes when `raw_buffer` was set.
    pub data: Bytes,
    /// Response headers of the resolved tile.
    pub headers: TileHeaders,
    /// Raw upstream payload size, for cost attribution.
    pub src_bytes: usize,
    /// Which path served the tile.
    pub reason: ResolutionReason,
    /// The tile had no content.
    pub empty: bool,
}

/// Resolves tiles through a [`Backend`] and draws them with a [`TileCodec`].
pub struct TileRenderer<S: UpstreamSource, C: TileCodec> {
    backend: Arc<Backend<S>>,
    codec: C,
}

impl<S: UpstreamSource, C: TileCodec> TileRenderer<S, C> {
    pub fn new(backend: Arc<Backend<S>>, codec: C) -> Self {
        Self { backend, codec }
    }

    pub fn backend(&self) -> &Arc<Backend<S>> {
        &self.backend
    }

    /// Resolve and draw a tile.
    ///
    /// With `options.raw_buffer` the codec is skipped and the resolved bytes
    /// are returned as-is.
    pub async fn render(
        &self,
        z: i64,
        x: i64,
        y: i64,
        options: &RequestOptions,
    ) -> TileResult<RenderedTile> {
        self.backend
            .draw(z, x, y, options, |tile| {
                futures::future::ready(self.draw_one(tile, options))
            })
            .await
    }

    fn draw_one(&self, tile: ResolvedTile, options: &RequestOptions) -> TileResult<RenderedTile> {
        if options.raw_buffer {
            return Ok(RenderedTile {
                empty: tile.is_empty(),
                data: tile.data.unwrap_or_default(),
                headers: tile.headers,
                src_bytes: tile.src_bytes,
                reason: tile.reason,
            });
        }

        let decode_options = DecodeOptions {
            upgrade: options.upgrade,
        };
        let decoded = self
            .codec
            .decode(tile.bytes(), tile.address, &decode_options)
            .map_err(|e| TileError::Codec(e.to_string()))?;

        let render_options = RenderOptions::for_request(tile.requested, options);
        let data = self
            .codec
            .render(&decoded, &render_options)
            .map_err(|e| TileError::Codec(e.to_string()))?;

        Ok(RenderedTile {
            data,
            empty: self.codec.is_empty(&decoded),
            headers: tile.headers,
            src_bytes: tile.src_bytes,
            reason: tile.reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;
    use crate::source::{MemoryTileSource, SourceInfo};

    /// Treats tile bytes as UTF-8 lines; refuses tiles starting with "corrupt".
    struct LinesCodec;

    impl TileCodec for LinesCodec {
        type Tile = Vec<String>;
        type Error = String;

        fn decode(
            &self,
            data: &[u8],
            address: TileAddress,
            options: &DecodeOptions,
        ) -> Result<Self::Tile, Self::Error> {
            let text = std::str::from_utf8(data).map_err(|e| e.to_string())?;
            if text.starts_with("corrupt") {
                return Err(format!("cannot decode tile {}", address));
            }
            let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
            if options.upgrade {
                lines.push("upgraded".to_string());
            }
            Ok(lines)
        }

        fn render(&self, tile: &Self::Tile, options: &RenderOptions) -> Result<Bytes, Self::Error> {
            Ok(Bytes::from(format!(
                "{}@{}:{}",
                tile.join(","),
                options.requested,
                options.buffer_size
            )))
        }

        fn is_empty(&self, tile: &Self::Tile) -> bool {
            tile.is_empty()
        }
    }

    fn addr(z: u8, x: u32, y: u32) -> TileAddress {
        TileAddress::new(z, x, y).unwrap()
    }

    fn renderer(info: SourceInfo) -> TileRenderer<MemoryTileSource, LinesCodec> {
        let source = MemoryTileSource::new(info.with_vector_layer("lines"));
        TileRenderer::new(
            Arc::new(Backend::new(source, CacheConfig::default())),
            LinesCodec,
        )
    }

    #[tokio::test]
    async fn test_render_with_codec() {
        let renderer = renderer(SourceInfo::new(0, 1));
        renderer
            .backend()
            .source()
            .insert(addr(1, 0, 0), &b"road\nriver"[..]);

        let tile = renderer
            .render(2, 1, 1, &RequestOptions::default().with_scale(2.0))
            .await
            .unwrap();

        assert_eq!(tile.data.as_ref(), b"road,river@2/1/1:512");
        assert_eq!(tile.reason, ResolutionReason::Overzoom);
        assert_eq!(tile.src_bytes, 10);
        assert!(!tile.empty);
    }

    #[tokio::test]
    async fn test_upgrade_passed_to_decode() {
        let renderer = renderer(SourceInfo::new(0, 1));
        renderer
            .backend()
            .source()
            .insert(addr(0, 0, 0), &b"road"[..]);

        let tile = renderer
            .render(0, 0, 0, &RequestOptions::default().with_upgrade(true))
            .await
            .unwrap();

        assert_eq!(tile.data.as_ref(), b"road,upgraded@0/0/0:256");
    }

    #[tokio::test]
    async fn test_empty_tile_is_decoded_from_empty_slice() {
        let renderer = renderer(SourceInfo::new(0, 4));

        let tile = renderer
            .render(2, 0, 0, &RequestOptions::default())
            .await
            .unwrap();

        assert!(tile.empty);
        assert_eq!(tile.reason, ResolutionReason::Empty);
        assert_eq!(tile.src_bytes, 0);
    }

    #[tokio::test]
    async fn test_raw_buffer_skips_codec() {
        let renderer = renderer(SourceInfo::new(0, 4));
        renderer
            .backend()
            .source()
            .insert(addr(1, 1, 1), &b"corrupt but raw"[..]);

        let tile = renderer
            .render(1, 1, 1, &RequestOptions::default().with_raw_buffer(true))
            .await
            .unwrap();

        assert_eq!(tile.data.as_ref(), b"corrupt but raw");
        assert!(!tile.empty);
    }

    #[tokio::test]
    async fn test_codec_error_surfaces() {
        let renderer = renderer(SourceInfo::new(0, 4));
        renderer
            .backend()
            .source()
            .insert(addr(1, 1, 1), &b"corrupt"[..]);

        let err = renderer
            .render(1, 1, 1, &RequestOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err, TileError::Codec("cannot decode tile 1/1/1".to_string()));
    }

    #[tokio::test]
    async fn test_codec_error_triggers_mask_retry() {
        let renderer = renderer(SourceInfo::new(0, 4).with_mask_level(1));
        let source = renderer.backend().source();
        source.insert(addr(3, 4, 4), &b"corrupt"[..]);
        source.insert(addr(1, 1, 1), &b"land"[..]);

        let tile = renderer
            .render(3, 4, 4, &RequestOptions::default())
            .await
            .unwrap();

        assert_eq!(tile.data.as_ref(), b"land@3/4/4:256");
        assert_eq!(tile.reason, ResolutionReason::MaskLevel);
        assert_eq!(tile.headers.backend_object.as_str(), "fillzoom");
    }
}
