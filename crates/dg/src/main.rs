//! DG CLI - Diagram generation service.
//!
//! Provides commands for:
//! - `serve`: Start the diagram generation server

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};

use commands::ServeArgs;
use output::Output;

/// Application version from Cargo.toml.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// DG - Diagram generation service.
#[derive(Parser)]
#[command(name = "dg", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the diagram generation server.
    Serve(ServeArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    let result = match cli.command {
        Commands::Serve(args) => {
            let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
            rt.block_on(args.execute(VERSION))
        }
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
