//! Filesystem tile source.
//!
//! Layout:
//!
//! ```text
//! <root>/
//! ├── metadata.json        (optional TileJSON document)
//! └── {z}/{x}/{y}.{ext}    (raw tile bytes, possibly compressed)
//! ```
//!
//! A missing tile file is [`SourceError::NotFound`]. The file's modification
//! time is reported as `Last-Modified`.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

use super::{SourceError, SourceInfo, UpstreamSource, UpstreamTile};
use crate::coord::TileAddress;
use crate::headers::format_http_date;

/// Default tile file extension.
pub const DEFAULT_EXTENSION: &str = "pbf";

/// Metadata file name inside the tile directory.
pub const METADATA_FILE: &str = "metadata.json";

/// Tile source backed by a directory tree.
#[derive(Debug, Clone)]
pub struct FileTileSource {
    root: PathBuf,
    extension: String,
    name: String,
}

impl FileTileSource {
    /// Open a tile directory.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Io`] if `root` is not a directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, SourceError> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(SourceError::Io(format!(
                "Tile directory not found: {}",
                root.display()
            )));
        }

        let name = format!("file://{}", root.display());
        Ok(Self {
            root,
            extension: DEFAULT_EXTENSION.to_string(),
            name,
        })
    }

    /// Use a different tile file extension.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `address`.
    pub fn tile_path(&self, address: TileAddress) -> PathBuf {
        self.root
            .join(address.z().to_string())
            .join(address.x().to_string())
            .join(format!("{}.{}", address.y(), self.extension))
    }
}

impl UpstreamSource for FileTileSource {
    async fn fetch(&self, address: TileAddress) -> Result<UpstreamTile, SourceError> {
        let path = self.tile_path(address);

        let body = match tokio::fs::read(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(tile = %address, path = %path.display(), "Tile file not found");
                return Err(SourceError::NotFound);
            }
            Err(e) => {
                return Err(SourceError::Io(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let mut tile = UpstreamTile::new(body);
        if let Ok(modified) = tokio::fs::metadata(&path).await.and_then(|m| m.modified()) {
            tile.headers.insert(
                "Last-Modified",
                format_http_date(DateTime::<Utc>::from(modified)),
            );
        }

        Ok(tile)
    }

    async fn info(&self) -> Result<SourceInfo, SourceError> {
        let path = self.root.join(METADATA_FILE);

        match tokio::fs::read(&path).await {
            Ok(json) => SourceInfo::from_json(&json).map_err(|e| {
                SourceError::InvalidMetadata(format!("{}: {}", path.display(), e))
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No metadata file, using defaults");
                Ok(SourceInfo::default())
            }
            Err(e) => Err(SourceError::Io(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
