//! Settings structs for each configuration section.
//!
//! Each struct represents one `[section]` of the INI config file. These are
//! plain data; parsing lives in the parser module.

use std::path::PathBuf;
use std::time::Duration;

use crate::cache::{CacheConfig, DEFAULT_MAX_AGE_MS};

/// Default log directory.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "tilebackend.log";

/// Complete configuration loaded from `config.ini`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    /// Cache settings
    pub cache: CacheSettings,
    /// Upstream source settings
    pub source: SourceSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Lifetime of a cached tile in milliseconds
    pub max_age_ms: u64,
    /// Reaper period in milliseconds; `None` follows `max_age_ms`
    pub reap_interval_ms: Option<u64>,
    /// Inflate zlib/gzip upstream bodies before caching
    pub deflate_upstream: bool,
}

impl CacheSettings {
    /// Build the cache configuration these settings describe.
    pub fn to_cache_config(&self) -> CacheConfig {
        let config = CacheConfig::default()
            .with_max_age(Duration::from_millis(self.max_age_ms))
            .with_deflate_upstream(self.deflate_upstream);
        match self.reap_interval_ms {
            Some(ms) => config.with_reap_interval(Duration::from_millis(ms)),
            None => config,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_age_ms: DEFAULT_MAX_AGE_MS,
            reap_interval_ms: None,
            deflate_upstream: true,
        }
    }
}

/// `[source]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSettings {
    /// Source URI (`file://`, bare path or `http(s)://` template)
    pub uri: Option<String>,
    /// Default request scale
    pub scale: f64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            uri: None,
            scale: 1.0,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Directory for log files
    pub directory: PathBuf,
    /// Log file name
    pub file: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_LOG_DIR),
            file: DEFAULT_LOG_FILE.to_string(),
        }
    }
}
