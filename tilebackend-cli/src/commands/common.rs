//! Common types and utilities shared across CLI commands.

use clap::Args;
use tilebackend::config::ConfigFile;
use tilebackend::headers::TileHeaders;
use tilebackend::tile::RequestOptions;

/// A requested tile coordinate.
///
/// Signed so out-of-range requests such as `z = -1` reach the backend and
/// are reported the same way a library caller would see them.
#[derive(Debug, Clone, Copy, Args)]
pub struct TileArgs {
    /// Zoom level
    #[arg(allow_negative_numbers = true)]
    pub z: i64,
    /// Column
    #[arg(allow_negative_numbers = true)]
    pub x: i64,
    /// Row
    #[arg(allow_negative_numbers = true)]
    pub y: i64,
}

/// Request flags shared by commands that resolve tiles.
#[derive(Debug, Clone, Default, Args)]
pub struct RequestArgs {
    /// Pixel density (defaults to [source] scale in config.ini)
    #[arg(long)]
    pub scale: Option<f64>,

    /// Serve higher scales from coarser zoom levels
    #[arg(long)]
    pub legacy: bool,

    /// Report a missing tile as an error instead of an empty tile
    #[arg(long)]
    pub strict: bool,
}

impl RequestArgs {
    /// Build request options. CLI values take precedence over config.
    pub fn to_options(&self, config: &ConfigFile) -> RequestOptions {
        RequestOptions::default()
            .with_scale(self.scale.unwrap_or(config.source.scale))
            .with_legacy(self.legacy)
            .with_strict(self.strict)
    }
}

/// Format headers as `name: value` lines in a stable order.
pub fn format_headers(headers: &TileHeaders) -> Vec<String> {
    headers
        .to_map()
        .into_iter()
        .map(|(name, value)| format!("{}: {}", name, value))
        .collect()
}

/// Format a byte count for display.
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
