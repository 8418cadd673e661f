//! PajakGate CLI — the main entry point.
//!
//! Commands:
//! - `onboard`  — Initialize config and a sample keyword file
//! - `gateway`  — Start the HTTP server
//! - `check`    — Run the scope gate on messages from the command line
//! - `doctor`   — Diagnose configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "pajakgate",
    about = "PajakGate — scope-gated Indonesian tax assistant",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Onboard,

    /// Start the HTTP gateway server
    Gateway {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check whether user messages are in scope
    Check {
        /// User messages, oldest first
        #[arg(required = true)]
        messages: Vec<String>,

        /// Override the window size
        #[arg(short, long)]
        window: Option<usize>,

        /// Extra keyword file (one phrase per line)
        #[arg(short, long)]
        keywords: Option<PathBuf>,

        /// Print the verdict as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Gateway { port } => commands::gateway::run(port).await?,
        Commands::Check {
            messages,
            window,
            keywords,
            json,
        } => commands::check::run(messages, window, keywords, json).await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
