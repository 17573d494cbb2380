//! Configuration file support.
//!
//! `config.ini` has three sections:
//!
//! ```ini
//! [cache]
//! max_age_ms = 60000
//! reap_interval_ms = 60000
//! deflate_upstream = true
//!
//! [source]
//! uri = file:///srv/tiles
//! scale = 1
//!
//! [logging]
//! directory = logs
//! file = tilebackend.log
//! ```
//!
//! Every key is optional; missing keys keep their defaults.

mod file;
mod parser;
mod settings;

pub use file::{config_directory, default_config_path, ConfigFileError};
pub use settings::{
    CacheSettings, ConfigFile, LoggingSettings, SourceSettings, DEFAULT_LOG_DIR, DEFAULT_LOG_FILE,
};
