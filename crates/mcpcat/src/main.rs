//! mcpcat - probe and catalog MCP servers.
//!
//! This is the main entry point for the mcpcat CLI.

mod commands;

use clap::{Parser, Subcommand};
use commands::{handle_check, handle_probe, init_logging, show_config};
use mcpcat_mcp::TransportType;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mcpcat")]
#[command(author, version, about = "Probe MCP servers and keep a catalog of their tools", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe one MCP server and print what it reports
    Probe {
        /// Endpoint URL (http, https, ws, wss) or stdio command
        endpoint: String,

        /// Transport type: streamable or stdio
        #[arg(short, long, default_value = "streamable")]
        transport: TransportType,

        /// Budget per MCP call in milliseconds (overrides config)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Re-check every server in a catalog file
    Check {
        /// Catalog JSON file (array of entries or `{ "servers": [...] }`)
        catalog: PathBuf,

        /// Print updated entries as JSON
        #[arg(long)]
        json: bool,

        /// Write updated entries back to the catalog file
        #[arg(long)]
        write: bool,
    },

    /// Show the effective configuration
    Config,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;

    let (config, sources) = mcpcat_core::Config::load(Some(cwd.as_path())).await?;
    init_logging(cli.verbose, &config);
    tracing::debug!(sources = ?sources, "Configuration loaded");

    match cli.command {
        Commands::Probe {
            endpoint,
            transport,
            timeout_ms,
            json,
        } => handle_probe(&config, endpoint, transport, timeout_ms, json).await,
        Commands::Check {
            catalog,
            json,
            write,
        } => handle_check(&config, &catalog, json, write).await,
        Commands::Config => show_config(&config, &sources),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Print version information.
fn print_version() {
    println!("mcpcat {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Probe MCP servers over HTTP, SSE and WebSocket and catalog their tools.");
}
