//! Upstream tile sources.
//!
//! An upstream source returns the raw bytes stored at a tile address plus
//! whatever transport headers came with them. The backend never talks to a
//! store directly; everything goes through [`UpstreamSource`].
//!
//! # Implementations
//!
//! - [`FileTileSource`] - `{z}/{x}/{y}.{ext}` files under a directory
//! - [`HttpTileSource`] - URL template fetched with reqwest
//! - [`MemoryTileSource`] - in-memory tiles with fetch counters
//!
//! [`TileSource`] dispatches over the file and HTTP sources and is what the
//! CLI opens from a URI.
//!
//! # Absence
//!
//! "No tile here" is [`SourceError::NotFound`], not an empty body. Sources
//! that only have a message string use [`SourceError::from_message`], which
//! maps the conventional `"Tile does not exist"` text onto the sentinel.

mod capabilities;
mod file;
mod http;
mod memory;

pub use capabilities::{
    DegradedResolutionPolicy, SourceCapabilities, SourceInfo, SourceKind, DEFAULT_MAXZOOM,
    DEFAULT_MINZOOM,
};
pub use file::FileTileSource;
pub use http::HttpTileSource;
pub use memory::MemoryTileSource;

use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;

use bytes::Bytes;
use thiserror::Error;

use crate::coord::TileAddress;
use crate::error::TILE_DOES_NOT_EXIST;

/// Errors returned by upstream sources.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SourceError {
    /// No tile is stored at the address.
    #[error("Tile does not exist")]
    NotFound,

    /// Local I/O failed.
    #[error("{0}")]
    Io(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Source metadata could not be read or parsed.
    #[error("Invalid source metadata: {0}")]
    InvalidMetadata(String),

    /// The URI does not name a supported source.
    #[error("Unsupported source URI: {0}")]
    UnsupportedUri(String),

    /// Free-form failure reported by the source.
    #[error("{0}")]
    Message(String),
}

impl SourceError {
    /// Build an error from a message, recognising the absence sentinel.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if message == TILE_DOES_NOT_EXIST {
            SourceError::NotFound
        } else {
            SourceError::Message(message)
        }
    }

    /// Returns true for the absence sentinel, whichever variant carries it.
    pub fn is_not_found(&self) -> bool {
        match self {
            SourceError::NotFound => true,
            SourceError::Io(message) | SourceError::Message(message) => {
                message == TILE_DOES_NOT_EXIST
            }
            _ => false,
        }
    }
}

/// Transport headers returned with an upstream tile.
///
/// Names are matched case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamHeaders {
    entries: BTreeMap<String, String>,
}

impl UpstreamHeaders {
    /// Create an empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a header.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.entries
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Look up a header by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Number of headers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no headers are set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(lowercase name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for UpstreamHeaders {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

/// Raw tile returned by an upstream source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpstreamTile {
    /// Bytes exactly as stored upstream (possibly compressed).
    pub body: Bytes,
    /// Headers that came with the bytes.
    pub headers: UpstreamHeaders,
}

impl UpstreamTile {
    /// Create a tile with no headers.
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            headers: UpstreamHeaders::new(),
        }
    }

    /// Attach a header.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// A store of raw tiles addressed by `z/x/y`.
///
/// Implementations must be shareable across tasks; the backend holds one in
/// an `Arc` and calls it from spawned fetch tasks.
pub trait UpstreamSource: Send + Sync + 'static {
    /// Fetch the raw tile at `address`.
    ///
    /// Returns [`SourceError::NotFound`] when nothing is stored there.
    fn fetch(
        &self,
        address: TileAddress,
    ) -> impl Future<Output = Result<UpstreamTile, SourceError>> + Send;

    /// Fetch the source's metadata document.
    fn info(&self) -> impl Future<Output = Result<SourceInfo, SourceError>> + Send;

    /// Name for logging.
    fn name(&self) -> &str;
}

/// A source opened from a URI.
#[derive(Debug)]
pub enum TileSource {
    File(FileTileSource),
    Http(HttpTileSource),
}

impl TileSource {
    /// Open a source from a URI.
    ///
    /// Accepted forms:
    /// - `http://…/{z}/{x}/{y}.pbf` or `https://…` URL templates
    /// - `file:///path/to/tiles`
    /// - a bare filesystem path
    pub fn open(uri: &str) -> Result<Self, SourceError> {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            return Ok(TileSource::Http(HttpTileSource::new(uri)?));
        }
        if let Some(path) = uri.strip_prefix("file://") {
            return Ok(TileSource::File(FileTileSource::open(path)?));
        }
        if uri.contains("://") {
            return Err(SourceError::UnsupportedUri(uri.to_string()));
        }
        Ok(TileSource::File(FileTileSource::open(Path::new(uri))?))
    }
}

impl UpstreamSource for TileSource {
    async fn fetch(&self, address: TileAddress) -> Result<UpstreamTile, SourceError> {
        match self {
            TileSource::File(source) => source.fetch(address).await,
            TileSource::Http(source) => source.fetch(address).await,
        }
    }

    async fn info(&self) -> Result<SourceInfo, SourceError> {
        match self {
            TileSource::File(source) => source.info().await,
            TileSource::Http(source) => source.info().await,
        }
    }

    fn name(&self) -> &str {
        match self {
            TileSource::File(source) => source.name(),
            TileSource::Http(source) => source.name(),
        }
    }
}
