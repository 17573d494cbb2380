//! CLI runner for common setup.
//!
//! Loads the config file, starts logging and opens the backend so command
//! handlers only deal with their own output.

use std::path::{Path, PathBuf};

use tilebackend::backend::Backend;
use tilebackend::config::{default_config_path, ConfigFile};
use tilebackend::logging::{init_logging, LoggingGuard};
use tilebackend::source::TileSource;
use tracing::info;

use crate::error::CliError;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Keeps the log writer alive while the runner exists
    _logging_guard: LoggingGuard,
    config: ConfigFile,
    config_path: PathBuf,
}

impl CliRunner {
    /// Load configuration and initialize logging.
    ///
    /// `config_path` overrides the default config file location.
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, CliError> {
        let config_path = config_path.unwrap_or_else(default_config_path);
        let config = ConfigFile::load_from(&config_path)?;

        let logging_guard =
            init_logging(&config.logging).map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            _logging_guard: logging_guard,
            config,
            config_path,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Path the configuration was loaded from.
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("tilebackend v{}", tilebackend::VERSION);
        info!(
            config = %self.config_path.display(),
            "tilebackend CLI: {} command", command
        );
    }

    /// Open the backend for the source named on the command line, or the
    /// configured one.
    pub fn open_backend(&self, cli_source: Option<&str>) -> Result<Backend<TileSource>, CliError> {
        let uri = resolve_source_uri(cli_source, &self.config)?;
        info!(source = %uri, "Opening tile source");

        let source = TileSource::open(&uri)?;
        Ok(Backend::new(source, self.config.cache.to_cache_config()))
    }
}

/// Pick the source URI: CLI argument first, then `[source] uri`.
pub fn resolve_source_uri(cli_source: Option<&str>, config: &ConfigFile) -> Result<String, CliError> {
    cli_source
        .map(str::to_string)
        .or_else(|| config.source.uri.clone())
        .ok_or_else(|| {
            CliError::Config(
                "No tile source given. Set uri in the [source] section of config.ini \
                 or use --source"
                    .to_string(),
            )
        })
}
