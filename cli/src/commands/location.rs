// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0

//! Location analysis commands
//!
//! Commands: show, clear, analyze

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

use contextfuse_core::application::LocationAnalyzer;
use contextfuse_core::infrastructure::repositories::SingleSlotStore;

use super::{load_platform, open_medium};

#[derive(Subcommand)]
pub enum LocationCommand {
    /// Show the last persisted location analysis
    Show,

    /// Remove the persisted location analysis
    Clear,

    /// Scan nearby networks and run a single location analysis
    Analyze,
}

pub async fn handle_command(command: LocationCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        LocationCommand::Show => {
            let (config, medium) = open_medium(config_override)?;
            let slot = SingleSlotStore::new(medium, config.spec.storage.location_file.clone());
            match slot.read() {
                Some(text) => println!("{}", text.trim_end()),
                None => println!("{}", "No location analysis recorded".yellow()),
            }
        }
        LocationCommand::Clear => {
            let (config, medium) = open_medium(config_override)?;
            let slot = SingleSlotStore::new(medium, config.spec.storage.location_file.clone());
            if slot.clear() {
                println!("{}", "✓ Location analysis cleared".green());
            } else {
                println!("{}", "No location analysis to clear".yellow());
            }
        }
        LocationCommand::Analyze => {
            let (_, platform) = load_platform(config_override)?;
            let analyzer = LocationAnalyzer::new(
                platform.scanner.clone(),
                platform.backends.location(),
                Arc::clone(&platform.location_slot),
            );
            let report = analyzer
                .analyze()
                .await
                .context("Location analysis failed")?;

            println!("{}", "Nearby networks:".bold());
            if report.networks.is_empty() {
                println!("  {}", "(none)".dimmed());
            }
            for ssid in &report.networks {
                println!("  - {}", ssid);
            }
            println!();
            println!("{}", "Analysis:".bold());
            println!("{}", report.analysis);
        }
    }
    Ok(())
}
