//! Tile command - resolve and fetch one tile.

use std::path::PathBuf;

use tracing::info;

use super::common::{format_headers, format_size, RequestArgs, TileArgs};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the tile command.
pub struct FetchArgs {
    pub source: Option<String>,
    pub tile: TileArgs,
    pub request: RequestArgs,
    pub output: Option<PathBuf>,
}

/// Run the tile command.
pub async fn run(runner: &CliRunner, args: FetchArgs) -> Result<(), CliError> {
    runner.log_startup("tile");

    let backend = runner.open_backend(args.source.as_deref())?;
    let options = args.request.to_options(runner.config());
    let TileArgs { z, x, y } = args.tile;

    let tile = backend.get_tile(z, x, y, &options).await?;
    backend.cache().log_stats();
    backend.shutdown();

    info!(
        requested = %tile.requested,
        served = %tile.address,
        reason = ?tile.reason,
        src_bytes = tile.src_bytes,
        "Tile resolved"
    );

    println!("Tile {} served from {} ({:?})", tile.requested, tile.address, tile.reason);
    for line in format_headers(&tile.headers) {
        println!("  {}", line);
    }
    println!("  Upstream size: {}", format_size(tile.src_bytes));

    if let Some(path) = args.output {
        std::fs::write(&path, tile.bytes()).map_err(|e| CliError::FileWrite {
            path: path.display().to_string(),
            error: e,
        })?;
        println!("Saved {} to {}", format_size(tile.bytes().len()), path.display());
    }

    Ok(())
}
