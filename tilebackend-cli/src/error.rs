//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use tilebackend::config::ConfigFileError;
use tilebackend::source::SourceError;
use tilebackend::TileError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Failed to open the tile source
    SourceOpen(SourceError),
    /// Tile request failed
    Tile(TileError),
    /// Failed to write output file
    FileWrite { path: String, error: std::io::Error },
}

impl CliError {
    /// Exit code for this error.
    ///
    /// Out-of-range coordinates and missing tiles are reported as usage
    /// errors so scripts can tell them apart from upstream failures.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Tile(e) if e.is_out_of_range() || e.is_not_found() => 2,
            _ => 1,
        }
    }

    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::SourceOpen(SourceError::UnsupportedUri(_)) => {
                eprintln!();
                eprintln!("Supported sources:");
                eprintln!("  file:///path/to/tiles    directory laid out as z/x/y.pbf");
                eprintln!("  /path/to/tiles           same as file://");
                eprintln!("  https://host/{{z}}/{{x}}/{{y}}.pbf");
            }
            CliError::Config(_) => {
                eprintln!();
                eprintln!(
                    "Run 'tilebackend init' to write a default config file, \
                     or pass --source."
                );
            }
            _ => {}
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::SourceOpen(e) => write!(f, "Failed to open tile source: {}", e),
            CliError::Tile(e) => write!(f, "Tile request failed: {}", e),
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path, error)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::SourceOpen(e) => Some(e),
            CliError::Tile(e) => Some(e),
            CliError::FileWrite { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<SourceError> for CliError {
    fn from(e: SourceError) -> Self {
        CliError::SourceOpen(e)
    }
}

impl From<TileError> for CliError {
    fn from(e: TileError) -> Self {
        CliError::Tile(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilebackend::coord::TileAddress;

    #[test]
    fn test_exit_codes() {
        let out_of_range = CliError::Tile(TileError::OutOfRange { z: -1, x: 0, y: 0 });
        let not_found = CliError::Tile(TileError::NotFound(TileAddress::new(1, 0, 0).unwrap()));
        let upstream = CliError::Tile(TileError::Upstream("HTTP 503".to_string()));

        assert_eq!(out_of_range.exit_code(), 2);
        assert_eq!(not_found.exit_code(), 2);
        assert_eq!(upstream.exit_code(), 1);
        assert_eq!(CliError::Config("bad".to_string()).exit_code(), 1);
    }

    #[test]
    fn test_display() {
        let err = CliError::Tile(TileError::Upstream("HTTP 503".to_string()));
        assert_eq!(err.to_string(), "Tile request failed: HTTP 503");
    }
}
