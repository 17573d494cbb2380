//! Per-request option types.
//!
//! Provides [`RequestOptions`], the immutable set of per-call flags that
//! travel alongside every tile request. Options are passed explicitly to each
//! call and are never attached to the result-handling side.

/// Options supplied with a single tile request.
///
/// # Example
///
/// ```
/// use tilebackend::tile::RequestOptions;
///
/// let options = RequestOptions::default().with_scale(2.0).with_legacy(true);
/// assert_eq!(options.scale(), 2.0);
/// assert!(options.legacy);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestOptions {
    /// Pixel density of the request (1.0 = 256px tiles). Always `>= 1`.
    scale: f64,
    /// Serve higher scales from coarser zooms instead of upscaling.
    pub legacy: bool,
    /// Ask the codec to upgrade older tile encodings while decoding.
    pub upgrade: bool,
    /// Return upstream bytes without running the codec.
    pub raw_buffer: bool,
    /// Report absence as an error instead of an empty tile.
    pub strict: bool,
}

impl RequestOptions {
    /// Get the request scale.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Set the scale. Values below 1 or non-finite values become 1.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = if scale.is_finite() && scale >= 1.0 {
            scale
        } else {
            1.0
        };
        self
    }

    /// Enable or disable legacy scale quantization.
    pub fn with_legacy(mut self, legacy: bool) -> Self {
        self.legacy = legacy;
        self
    }

    /// Enable or disable tile upgrading in the codec.
    pub fn with_upgrade(mut self, upgrade: bool) -> Self {
        self.upgrade = upgrade;
        self
    }

    /// Enable or disable raw buffer pass-through.
    pub fn with_raw_buffer(mut self, raw_buffer: bool) -> Self {
        self.raw_buffer = raw_buffer;
        self
    }

    /// Enable or disable strict existence.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            legacy: false,
            upgrade: false,
            raw_buffer: false,
            strict: false,
        }
    }
}
