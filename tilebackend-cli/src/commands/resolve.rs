//! Resolve command - show which upstream tiles a request maps to.

use tilebackend::coord::Resolution;

use super::common::{RequestArgs, TileArgs};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the resolve command. Nothing is fetched.
pub async fn run(
    runner: &CliRunner,
    source: Option<&str>,
    tile: TileArgs,
    request: &RequestArgs,
) -> Result<(), CliError> {
    runner.log_startup("resolve");

    let backend = runner.open_backend(source)?;
    let options = request.to_options(runner.config());

    let resolution = backend.resolve(tile.z, tile.x, tile.y, &options).await?;
    backend.shutdown();

    for line in describe(&resolution) {
        println!("{}", line);
    }
    Ok(())
}

/// One line for the request, then one per candidate in priority order.
fn describe(resolution: &Resolution) -> Vec<String> {
    let mut lines = vec![format!("Requested: {}", resolution.requested)];
    for (i, candidate) in resolution.candidates().iter().enumerate() {
        lines.push(format!(
            "  [{}] {} ({:?})",
            i + 1,
            candidate.address,
            candidate.reason
        ));
    }
    lines
}
