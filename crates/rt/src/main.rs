//! roundtripper - round-trip editing of Confluence pages.
//!
//! Provides commands for:
//! - `config`: Show and edit the configuration file
//! - `ping`: Check the connection and credentials
//! - `pull`: Download pages as formatted storage XML
//! - `diff`: Show local changes
//! - `push`: Upload changed pages with a version message

mod commands;
mod error;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{ConfigCommand, DiffArgs, PingArgs, PullArgs, PushArgs};
use output::Output;

/// roundtripper - edit Confluence pages as local files.
#[derive(Parser)]
#[command(name = "roundtripper", version, about)]
struct Cli {
    /// Enable verbose output (info-level logs).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file (default: auto-discover roundtripper.toml).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or edit configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Check the connection to Confluence.
    Ping(PingArgs),
    /// Download pages into the local workspace.
    Pull(PullArgs),
    /// Show differences between working copies and Confluence.
    Diff(DiffArgs),
    /// Upload changed pages to Confluence.
    Push(PushArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Config(cmd) => cmd.execute(config),
        Commands::Ping(args) => args.execute(config),
        Commands::Pull(args) => args.execute(config),
        Commands::Diff(args) => args.execute(config),
        Commands::Push(args) => args.execute(config),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
