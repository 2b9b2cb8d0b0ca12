// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0

//! # contextfuse CLI
//!
//! The `ctxfuse` binary hosts one context-analysis pipeline on this machine.
//!
//! ## Commands
//!
//! - `ctxfuse analyze` - Run MOTION, LOCATION, FUSION and print the report
//! - `ctxfuse history show|clear` - Persisted motion detections
//! - `ctxfuse location show|clear` - Last location analysis
//! - `ctxfuse config show|validate|generate` - Configuration management
//! - `ctxfuse health` - Inference backend health checks

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use contextfuse::commands::{self, ConfigCommand, HistoryCommand, LocationCommand};
use contextfuse::logging;

/// contextfuse - Motion, location and context fusion analysis
#[derive(Parser)]
#[command(name = "ctxfuse")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "CONTEXTFUSE_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "CONTEXTFUSE_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one full analysis and print every phase message
    #[command(name = "analyze")]
    Analyze {
        /// Print only the final report
        #[arg(long)]
        quiet: bool,
    },

    /// Persisted motion detection history
    #[command(name = "history")]
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// Last persisted location analysis
    #[command(name = "location")]
    Location {
        #[command(subcommand)]
        command: LocationCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Check that the inference backends are reachable
    #[command(name = "health")]
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    // API keys may be referenced as env:VAR and kept in .env
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    logging::init_logging(cli.log_level.as_deref(), cli.config.clone())?;

    match cli.command {
        Some(Commands::Analyze { quiet }) => commands::analyze::execute(cli.config, quiet).await,
        Some(Commands::History { command }) => {
            commands::history::handle_command(command, cli.config).await
        }
        Some(Commands::Location { command }) => {
            commands::location::handle_command(command, cli.config).await
        }
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        Some(Commands::Health) => commands::health::execute(cli.config).await,
        None => {
            // No command provided - show help
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}
