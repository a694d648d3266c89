//! Binary entry point for obsidian-mcp.
//!
//! Runs the MCP server over stdio, or prints the resolved configuration.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, Subcommand};
use obsidian_mcp::ServerConfig;
use obsidian_mcp::mcp::McpServer;
use obsidian_mcp::observability;
use std::path::PathBuf;
use std::process::ExitCode;

/// MCP server for an Obsidian vault via the Local REST API plugin.
#[derive(Parser)]
#[command(name = "obsidian-mcp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available commands.
#[derive(Subcommand, Default)]
enum Commands {
    /// Run the MCP server on stdio (default).
    #[default]
    Serve,

    /// Print the resolved configuration with secrets redacted.
    Config,
}

/// Main entry point.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ServerConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init_from_settings(&config.logging, cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    let result = match cli.command.unwrap_or_default() {
        Commands::Serve => serve(&config).await,
        Commands::Config => {
            println!("{}", config.redacted_summary());
            Ok(())
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Server exited with an error");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the stdio server until EOF or a termination signal.
async fn serve(config: &ServerConfig) -> obsidian_mcp::Result<()> {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = %config.api.base_url(),
        "Starting obsidian-mcp"
    );
    let server = McpServer::from_config(config)?;
    server.run_stdio().await
}
