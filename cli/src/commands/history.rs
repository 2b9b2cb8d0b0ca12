// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0

//! Motion history commands
//!
//! Commands: show, clear

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use contextfuse_core::domain::motion::MotionDetectionRecord;
use contextfuse_core::infrastructure::repositories::{format_motion_history, BoundedHistoryStore};

use super::open_medium;

#[derive(Subcommand)]
pub enum HistoryCommand {
    /// Show persisted motion detections, oldest first
    Show {
        /// Print the raw records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove every persisted motion detection
    Clear,
}

pub async fn handle_command(command: HistoryCommand, config_override: Option<PathBuf>) -> Result<()> {
    let (config, medium) = open_medium(config_override)?;
    let store = BoundedHistoryStore::<MotionDetectionRecord>::new(
        medium,
        config.spec.storage.motion_file.clone(),
        config.spec.motion.history_capacity,
    );

    match command {
        HistoryCommand::Show { json } => {
            let read = store.read_all();
            if json {
                let body = serde_json::to_string_pretty(read.records())
                    .context("Failed to serialize motion history")?;
                println!("{}", body);
            } else {
                println!("{}", format_motion_history(&read).trim_end());
            }
        }
        HistoryCommand::Clear => {
            if store.clear() {
                println!("{}", "✓ Motion history cleared".green());
            } else {
                println!("{}", "No motion history to clear".yellow());
            }
        }
    }
    Ok(())
}
