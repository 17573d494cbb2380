//! Init command - write a default configuration file.

use std::path::Path;

use tilebackend::config::ConfigFile;

use crate::error::CliError;

/// Run the init command.
///
/// An existing file is loaded and written back, so unknown keys are dropped
/// but every known setting is kept. `source` fills `[source] uri` when the
/// file does not set one.
pub fn run(path: &Path, source: Option<String>) -> Result<(), CliError> {
    let mut config = ConfigFile::load_from(path)?;
    if config.source.uri.is_none() {
        config.source.uri = source;
    }
    config.save_to(path)?;

    println!("Configuration file: {}", path.display());
    println!();
    println!("Edit this file to customize tilebackend settings.");
    println!("CLI arguments override config file values when specified.");
    Ok(())
}
