// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0

//! Inference backend health checks

use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use contextfuse_core::domain::pipeline_config::PipelineConfigManifest;
use contextfuse_core::infrastructure::llm::ProviderRegistry;

pub async fn execute(config_override: Option<PathBuf>) -> Result<()> {
    let config = PipelineConfigManifest::load_or_default(config_override)
        .context("Failed to load configuration")?;
    let registry =
        ProviderRegistry::from_config(&config).context("Failed to initialize inference backends")?;

    println!("{}", "Inference backends:".bold());
    let mut failures = 0;
    for (name, result) in registry.health_check_all().await {
        match result {
            Ok(()) => println!("  {} {}", "✓".green(), name),
            Err(e) => {
                failures += 1;
                println!("  {} {} ({})", "✗".red(), name, e);
            }
        }
    }
    println!(
        "  Location analysis uses: {:?}",
        registry.location_backend()
    );

    if failures > 0 {
        bail!("{} backend(s) unhealthy", failures);
    }
    Ok(())
}
