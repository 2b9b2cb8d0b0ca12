// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0

//! Run one analysis
//!
//! Prints every phase message as it arrives. Ctrl-C stops the run and resets
//! the pipeline to NONE.

use anyhow::{bail, Result};
use colored::{ColoredString, Colorize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use contextfuse_core::application::PhaseOrchestrator;
use contextfuse_core::domain::phase::{AnalysisPhase, PhaseCallback};

use super::load_platform;

pub async fn execute(config_path: Option<PathBuf>, quiet: bool) -> Result<()> {
    let (config, platform) = load_platform(config_path)?;
    info!(device = %config.metadata.name, "Starting analysis");

    let orchestrator = PhaseOrchestrator::new(&platform);
    let (tx, mut rx) = mpsc::unbounded_channel::<(String, AnalysisPhase)>();
    let callback: PhaseCallback = Arc::new(move |message: &str, phase: AnalysisPhase| {
        let _ = tx.send((message.to_string(), phase));
    });

    if !quiet {
        println!(
            "{}",
            format!(
                "Analyzing context ({}s motion window)...",
                config.spec.motion.window_seconds
            )
            .bold()
        );
    }
    orchestrator.start_analysis(callback);

    let mut report = None;
    let mut stopped = false;
    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Some((message, phase)) => print_message(&message, phase, quiet, &mut report),
                None => break,
            },
            _ = orchestrator.wait_until_idle() => {
                while let Ok((message, phase)) = rx.try_recv() {
                    print_message(&message, phase, quiet, &mut report);
                }
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                eprintln!("{}", "Stopping analysis...".yellow());
                orchestrator.stop_analysis();
                stopped = true;
                break;
            }
        }
    }
    orchestrator.close();

    if stopped {
        bail!("Analysis stopped");
    }
    if report.is_none() {
        bail!("Analysis did not complete");
    }
    if !quiet {
        println!("{}", "✓ Analysis complete".green());
    }
    Ok(())
}

fn print_message(message: &str, phase: AnalysisPhase, quiet: bool, report: &mut Option<String>) {
    if phase == AnalysisPhase::Complete {
        println!("{}", message);
        *report = Some(message.to_string());
        return;
    }
    if !quiet {
        println!("{} {}", phase_tag(phase), message);
    }
}

fn phase_tag(phase: AnalysisPhase) -> ColoredString {
    let tag = format!("[{}]", phase);
    match phase {
        AnalysisPhase::None => tag.red(),
        AnalysisPhase::Motion => tag.cyan(),
        AnalysisPhase::Location => tag.blue(),
        AnalysisPhase::Fusion => tag.magenta(),
        AnalysisPhase::Complete => tag.green(),
    }
}
