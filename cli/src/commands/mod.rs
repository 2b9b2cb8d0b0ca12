// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the contextfuse CLI

pub mod analyze;
pub mod config;
pub mod health;
pub mod history;
pub mod location;

pub use self::config::ConfigCommand;
pub use self::history::HistoryCommand;
pub use self::location::LocationCommand;

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use contextfuse_core::application::Platform;
use contextfuse_core::domain::pipeline_config::PipelineConfigManifest;
use contextfuse_core::domain::storage::PersistenceMedium;
use contextfuse_core::infrastructure::storage::LocalFileMedium;

/// Load, validate and wire up the platform shared by every command.
pub(crate) fn load_platform(config_path: Option<PathBuf>) -> Result<(PipelineConfigManifest, Arc<Platform>)> {
    let config = PipelineConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;
    config
        .validate()
        .context("Configuration validation failed")?;
    let platform = Platform::from_config(&config).context("Failed to initialize platform")?;
    Ok((config, Arc::new(platform)))
}

/// Load configuration and open only the storage directory.
pub(crate) fn open_medium(config_path: Option<PathBuf>) -> Result<(PipelineConfigManifest, Arc<dyn PersistenceMedium>)> {
    let config = PipelineConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;
    let data_dir = config.spec.storage.resolve_data_dir();
    let medium = LocalFileMedium::new(&data_dir)
        .with_context(|| format!("Failed to open data directory {:?}", data_dir))?;
    Ok((config, Arc::new(medium)))
}
