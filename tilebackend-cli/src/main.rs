//! tilebackend CLI - Command-line interface
//!
//! Resolves and fetches tiles through the tilebackend library. Useful for
//! checking what a source serves at a given coordinate and which fallback
//! path a request takes.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tilebackend::config::default_config_path;

use commands::common::{RequestArgs, TileArgs};
use error::CliError;
use runner::CliRunner;

#[derive(Parser)]
#[command(name = "tilebackend")]
#[command(version = tilebackend::VERSION)]
#[command(about = "Zoom-resolving tile backend for tiled map pyramids", long_about = None)]
struct Cli {
    /// Config file (defaults to <config dir>/tilebackend/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Tile source: file:///path, a directory, or an http(s) URL template
    /// with {z}/{x}/{y} placeholders
    #[arg(long, global = true)]
    source: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,

    /// Fetch a tile and print its headers
    Tile {
        #[command(flatten)]
        tile: TileArgs,

        #[command(flatten)]
        request: RequestArgs,

        /// Write the tile bytes to this file
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Show which upstream tiles a request resolves to, without fetching
    Resolve {
        #[command(flatten)]
        tile: TileArgs,

        #[command(flatten)]
        request: RequestArgs,
    },

    /// Show source metadata and capabilities
    Info,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        e.exit();
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let Cli {
        config,
        source,
        command,
    } = cli;

    match command {
        Commands::Init => {
            let path = config.unwrap_or_else(default_config_path);
            commands::init::run(&path, source)
        }
        Commands::Tile {
            tile,
            request,
            output,
        } => {
            let runner = CliRunner::new(config)?;
            let args = commands::tile::FetchArgs {
                source,
                tile,
                request,
                output,
            };
            commands::tile::run(&runner, args).await
        }
        Commands::Resolve { tile, request } => {
            let runner = CliRunner::new(config)?;
            commands::resolve::run(&runner, source.as_deref(), tile, &request).await
        }
        Commands::Info => {
            let runner = CliRunner::new(config)?;
            commands::info::run(&runner, source.as_deref()).await
        }
    }
}
