//! whoop - WHOOP MCP server and OAuth helper.
//!
//! Main entry point for the whoop CLI.

use std::path::Path;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod commands;

use commands::{auth, serve, verify};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// whoop - MCP server for the WHOOP fitness API
#[derive(Parser)]
#[command(name = "whoop")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Command to run (default: serve)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the MCP server on stdio
    Serve(serve::ServeArgs),

    /// Authentication management
    Auth(auth::AuthArgs),

    /// Check API access against every endpoint
    Verify(verify::VerifyArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_dir = whoop_config::config_dir()
        .ok()
        .map(|d| d.join(whoop_config::paths::LOG_DIR));
    // Interactive commands keep the console quiet unless asked otherwise.
    let interactive = !matches!(cli.command, None | Some(Commands::Serve(_)));
    let _guard = init_logging(cli.verbose, interactive, log_dir.as_deref());

    let settings = whoop_config::Settings::from_env().context("Failed to load configuration")?;

    let ctx = commands::Context {
        json_output: cli.json,
        verbose: cli.verbose,
        settings,
    };

    match cli.command.unwrap_or(Commands::Serve(serve::ServeArgs::default())) {
        Commands::Serve(args) => serve::run(args, &ctx).await,
        Commands::Auth(args) => auth::run(args, &ctx).await,
        Commands::Verify(args) => verify::run(args, &ctx).await,
    }
}

/// Console (human-readable, stderr) + rotating JSON file.
///
/// stdout carries MCP traffic, so nothing is logged there.
fn init_logging(verbose: bool, interactive: bool, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let default_filter = if verbose {
        "whoop=debug,whoop_mcp=debug,whoop_oauth=debug,whoop_client=debug,whoop_config=debug,info"
    } else if interactive {
        "warn"
    } else {
        "whoop=info,whoop_mcp=info,whoop_oauth=info,whoop_client=info,whoop_config=info,warn"
    };
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let file_appender = log_dir.and_then(|dir| {
        std::fs::create_dir_all(dir).ok()?;
        RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("whoop")
            .filename_suffix("log")
            .build(dir)
            .ok()
    });
    let (file_layer, guard) = match file_appender {
        Some(appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(EnvFilter::new(
                    "whoop=debug,whoop_mcp=debug,whoop_oauth=debug,whoop_client=debug,whoop_config=debug,info",
                ));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_filter(console_filter),
        )
        .with(file_layer)
        .init();

    guard
}
