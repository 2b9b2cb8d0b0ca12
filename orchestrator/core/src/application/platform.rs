// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0
//! Platform
//!
//! Everything the pipeline borrows from its host: sensors, scanner, inference
//! backends, persistence and the memory probe. The orchestrator only holds a
//! `Weak` handle; when the host drops the platform every phase fails with
//! "Context no longer available".
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Composition root for pipeline collaborators

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use crate::domain::motion::MotionDetectionRecord;
use crate::domain::pipeline_config::{PipelineConfigManifest, PipelineConfigSpec, ScannerKind};
use crate::domain::sensor::SensorFeed;
use crate::domain::storage::PersistenceMedium;
use crate::domain::telemetry::MemoryProbe;
use crate::domain::wireless::WirelessScanner;
use crate::infrastructure::llm::ProviderRegistry;
use crate::infrastructure::memory_probe::ProcMemoryProbe;
use crate::infrastructure::repositories::{BoundedHistoryStore, SingleSlotStore};
use crate::infrastructure::sensors::ReplaySensorFeed;
use crate::infrastructure::storage::LocalFileMedium;
use crate::infrastructure::wireless::{NmcliScanner, StaticScanner};

/// Fixed per-platform pipeline parameters.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub motion_window: Duration,
    pub latch_timeout: Duration,
    pub prompt_tail_chars: usize,
    pub report_prefix: String,
}

impl PipelineSettings {
    pub fn from_spec(spec: &PipelineConfigSpec) -> Self {
        Self {
            motion_window: Duration::from_secs(spec.motion.window_seconds),
            latch_timeout: Duration::from_secs(spec.fusion.latch_timeout_seconds),
            prompt_tail_chars: spec.fusion.prompt_tail_chars,
            report_prefix: spec.storage.report_prefix.clone(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_spec(&PipelineConfigSpec::default())
    }
}

/// Externally constructed collaborators.
pub struct PlatformComponents {
    pub medium: Arc<dyn PersistenceMedium>,
    pub sensor_feed: Arc<dyn SensorFeed>,
    pub scanner: Arc<dyn WirelessScanner>,
    pub backends: ProviderRegistry,
    pub memory_probe: Arc<dyn MemoryProbe>,
}

pub struct Platform {
    pub settings: PipelineSettings,
    pub medium: Arc<dyn PersistenceMedium>,
    pub sensor_feed: Arc<dyn SensorFeed>,
    pub scanner: Arc<dyn WirelessScanner>,
    pub backends: ProviderRegistry,
    pub memory_probe: Arc<dyn MemoryProbe>,
    pub motion_history: Arc<BoundedHistoryStore<MotionDetectionRecord>>,
    pub location_slot: Arc<SingleSlotStore>,
    pub fusion_slot: Arc<SingleSlotStore>,
}

impl Platform {
    pub fn new(components: PlatformComponents, config: &PipelineConfigManifest) -> Self {
        let storage = &config.spec.storage;
        let medium = components.medium;
        Self {
            settings: PipelineSettings::from_spec(&config.spec),
            motion_history: Arc::new(BoundedHistoryStore::new(
                medium.clone(),
                storage.motion_file.clone(),
                config.spec.motion.history_capacity,
            )),
            location_slot: Arc::new(SingleSlotStore::new(
                medium.clone(),
                storage.location_file.clone(),
            )),
            fusion_slot: Arc::new(SingleSlotStore::new(medium.clone(), storage.fusion_file.clone())),
            medium,
            sensor_feed: components.sensor_feed,
            scanner: components.scanner,
            backends: components.backends,
            memory_probe: components.memory_probe,
        }
    }

    /// Build the host collaborators described by the configuration.
    pub fn from_config(config: &PipelineConfigManifest) -> anyhow::Result<Self> {
        let spec = &config.spec;

        let data_dir = spec.storage.resolve_data_dir();
        info!("Using data directory {:?}", data_dir);
        let medium: Arc<dyn PersistenceMedium> = Arc::new(
            LocalFileMedium::new(&data_dir)
                .with_context(|| format!("Failed to open data directory {:?}", data_dir))?,
        );

        let sensor_feed: Arc<dyn SensorFeed> = match &spec.sensors.replay_file {
            Some(path) => Arc::new(
                ReplaySensorFeed::from_file(path)
                    .with_context(|| format!("Failed to load sensor recording {:?}", path))?,
            ),
            None => {
                info!("No sensor recording configured; motion window will see no readings");
                Arc::new(ReplaySensorFeed::empty())
            }
        };

        let scanner: Arc<dyn WirelessScanner> = match spec.wireless.scanner {
            ScannerKind::Nmcli => Arc::new(NmcliScanner::new()),
            ScannerKind::Static => Arc::new(StaticScanner::new(spec.wireless.networks.clone())),
        };

        let backends =
            ProviderRegistry::from_config(config).context("Failed to initialize inference backends")?;

        Ok(Self::new(
            PlatformComponents {
                medium,
                sensor_feed,
                scanner,
                backends,
                memory_probe: Arc::new(ProcMemoryProbe::new()),
            },
            config,
        ))
    }
}
