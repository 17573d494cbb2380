//! HTTP tile source.
//!
//! Tiles are fetched from a URL template such as
//! `https://tiles.example.com/{z}/{x}/{y}.pbf` with a non-blocking reqwest
//! client. `404 Not Found` and `204 No Content` mean the tile does not exist.

use std::time::Duration;

use reqwest::StatusCode;
use tracing::debug;

use super::{SourceError, SourceInfo, UpstreamHeaders, UpstreamSource, UpstreamTile};
use crate::coord::TileAddress;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const USER_AGENT: &str = concat!("tilebackend/", env!("CARGO_PKG_VERSION"));

/// Response headers carried through to the header synthesizer.
const FORWARDED_HEADERS: [&str; 3] = ["last-modified", "etag", "expires"];

/// Tile source backed by an HTTP server.
#[derive(Debug, Clone)]
pub struct HttpTileSource {
    client: reqwest::Client,
    template: String,
    info_url: Option<String>,
}

impl HttpTileSource {
    /// Create a source for a `{z}/{x}/{y}` URL template.
    pub fn new(template: &str) -> Result<Self, SourceError> {
        Self::with_timeout(template, DEFAULT_TIMEOUT_SECS)
    }

    /// Create a source with a custom request timeout.
    pub fn with_timeout(template: &str, timeout_secs: u64) -> Result<Self, SourceError> {
        if !["{z}", "{x}", "{y}"].iter().all(|p| template.contains(p)) {
            return Err(SourceError::UnsupportedUri(format!(
                "URL template must contain {{z}}, {{x}} and {{y}}: {}",
                template
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SourceError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            template: template.to_string(),
            info_url: None,
        })
    }

    /// Fetch metadata from a TileJSON URL instead of using defaults.
    pub fn with_info_url(mut self, url: impl Into<String>) -> Self {
        self.info_url = Some(url.into());
        self
    }

    /// URL for a tile.
    pub fn tile_url(&self, address: TileAddress) -> String {
        self.template
            .replace("{z}", &address.z().to_string())
            .replace("{x}", &address.x().to_string())
            .replace("{y}", &address.y().to_string())
    }
}

impl UpstreamSource for HttpTileSource {
    async fn fetch(&self, address: TileAddress) -> Result<UpstreamTile, SourceError> {
        let url = self.tile_url(address);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Http(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::NO_CONTENT {
            debug!(tile = %address, status = status.as_u16(), "Upstream has no tile");
            return Err(SourceError::NotFound);
        }
        if !status.is_success() {
            return Err(SourceError::Http(format!("HTTP {} from {}", status, url)));
        }

        let mut headers = UpstreamHeaders::new();
        for name in FORWARDED_HEADERS {
            if let Some(value) = response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
            {
                headers.insert(name, value);
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SourceError::Http(format!("Failed to read response: {}", e)))?;

        Ok(UpstreamTile { body, headers })
    }

    async fn info(&self) -> Result<SourceInfo, SourceError> {
        let Some(url) = &self.info_url else {
            debug!(template = %self.template, "No TileJSON URL, using defaults");
            return Ok(SourceInfo::default());
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::Http(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(SourceError::Http(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SourceError::Http(format!("Failed to read response: {}", e)))?;

        SourceInfo::from_json(&body)
            .map_err(|e| SourceError::InvalidMetadata(format!("{}: {}", url, e)))
    }

    fn name(&self) -> &str {
        &self.template
    }
}
