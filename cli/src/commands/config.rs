// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use contextfuse_core::domain::pipeline_config::PipelineConfigManifest;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./contextfuse-config.yaml)
        #[arg(short, long, default_value = "./contextfuse-config.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = PipelineConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. CONTEXTFUSE_CONFIG_PATH: {}",
            std::env::var("CONTEXTFUSE_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./contextfuse-config.yaml");
        println!("  4. ~/.contextfuse/config.yaml");
        println!("  5. /etc/contextfuse/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!();

    let spec = &config.spec;
    println!("{}", "Device:".bold());
    println!("  Name: {}", config.metadata.name);
    if let Some(version) = &config.metadata.version {
        println!("  Version: {}", version);
    }
    println!();

    println!("{}", "Storage:".bold());
    println!("  Data dir: {}", spec.storage.resolve_data_dir().display());
    println!("  Motion history: {}", spec.storage.motion_file);
    println!("  Location result: {}", spec.storage.location_file);
    println!("  Fusion result: {}", spec.storage.fusion_file);
    println!("  Report prefix: {}", spec.storage.report_prefix);
    println!();

    println!("{}", "Pipeline:".bold());
    println!("  Motion window: {}s", spec.motion.window_seconds);
    println!("  History capacity: {}", spec.motion.history_capacity);
    println!("  Location backend: {:?}", spec.location.backend);
    println!("  Fusion latch timeout: {}s", spec.fusion.latch_timeout_seconds);
    println!("  Prompt tail: {} chars", spec.fusion.prompt_tail_chars);
    println!();

    println!("{}", "Inference Backends:".bold());
    println!(
        "  {} {:?} {} ({}), model path {}, max tokens {}",
        "on-device".bold(),
        spec.on_device.engine.backend_type,
        spec.on_device.engine.model,
        spec.on_device.engine.endpoint,
        spec.on_device.model_path,
        spec.on_device.max_tokens
    );
    println!(
        "  {} {:?} {} ({}), timeout {}s",
        "remote".bold(),
        spec.remote.backend_type,
        spec.remote.model,
        spec.remote.endpoint,
        spec.remote.timeout_seconds
    );
    println!();

    println!("{}", "Sources:".bold());
    match &spec.sensors.replay_file {
        Some(path) => println!("  Sensor replay: {}", path.display()),
        None => println!("  Sensor replay: {}", "(none)".dimmed()),
    }
    println!("  Wireless scanner: {:?}", spec.wireless.scanner);
    for ssid in &spec.wireless.networks {
        println!("    - {}", ssid);
    }
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = PipelineConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    };

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_generate_writes_minimal_template() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("contextfuse-config.yaml");

        generate(output.clone(), false).await.unwrap();

        let config = PipelineConfigManifest::from_yaml_file(&output).unwrap();
        assert_eq!(config.metadata.name, "contextfuse-device");
        config.validate().unwrap();
    }

    #[test]
    fn test_templates_parse_and_validate() {
        for sample in [
            include_str!("../../templates/config-minimal.yaml"),
            include_str!("../../templates/config-with-examples.yaml"),
        ] {
            let config = PipelineConfigManifest::from_yaml_str(sample).expect("template parses");
            config.validate().expect("template validates");
        }
    }
}
