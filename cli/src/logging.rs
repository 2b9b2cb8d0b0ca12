// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0

//! Tracing subscriber setup
//!
//! Level precedence: `RUST_LOG`, then `--log-level` / `CONTEXTFUSE_LOG_LEVEL`,
//! then `spec.observability.logging.level`, then `info`. The output format
//! (`text` or `json`) comes from the configuration file.

use anyhow::{Context, Result};
use std::path::PathBuf;

use contextfuse_core::domain::pipeline_config::PipelineConfigManifest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
    pub json: bool,
}

/// Resolve level and format without installing anything.
pub fn resolve(level_override: Option<&str>, config: Option<&PipelineConfigManifest>) -> LogSettings {
    let logging = config
        .and_then(|c| c.spec.observability.as_ref())
        .and_then(|o| o.logging.as_ref());

    let level = level_override
        .map(str::to_string)
        .or_else(|| logging.map(|l| l.level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let json = logging
        .map(|l| l.format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    LogSettings { level, json }
}

/// Initialize tracing subscriber for logging
pub fn init_logging(level_override: Option<&str>, config_path: Option<PathBuf>) -> Result<()> {
    // Config errors are reported by the command itself once logging is up
    let config = PipelineConfigManifest::load_or_default(config_path).ok();
    let settings = resolve(level_override, config.as_ref());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&settings.level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if settings.json {
        builder.json().init();
    } else {
        builder.compact().init();
    }

    Ok(())
}
