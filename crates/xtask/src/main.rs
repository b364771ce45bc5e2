//! Development tasks for the modifier engine
//!
//! This binary provides development utilities using the cargo-xtask pattern.
//! Run with: `cargo xtask <command>`

mod commands;
mod utils;

use anyhow::Result;
use clap::Parser;
use commands::{CheckContent, CompareStores, ReadStore};

/// Development tasks for the modifier engine
#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Development tools for the modifier engine", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Read and inspect a persisted modifier store
    ReadStore(ReadStore),

    /// Compare two participants' stores to locate an out-of-sync
    CompareStores(CompareStores),

    /// Load a content directory and report its templates
    CheckContent(CheckContent),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::ReadStore(cmd) => cmd.execute(),
        Command::CompareStores(cmd) => cmd.execute(),
        Command::CheckContent(cmd) => cmd.execute(),
    }
}
