// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0
//! Location Analyzer
//!
//! Scans nearby wireless networks, asks the configured backend where the
//! device probably is and stores the answer in the location slot.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::llm::{GenerationOptions, LLMError, LLMProvider};
use crate::domain::wireless::WirelessScanner;
use crate::infrastructure::repositories::SingleSlotStore;

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("inference failed: {0}")]
    Inference(#[from] LLMError),
}

#[derive(Debug, Clone)]
pub struct LocationReport {
    pub networks: Vec<String>,
    pub analysis: String,
}

pub struct LocationAnalyzer {
    scanner: Arc<dyn WirelessScanner>,
    backend: Arc<dyn LLMProvider>,
    slot: Arc<SingleSlotStore>,
    options: GenerationOptions,
}

impl LocationAnalyzer {
    pub fn new(
        scanner: Arc<dyn WirelessScanner>,
        backend: Arc<dyn LLMProvider>,
        slot: Arc<SingleSlotStore>,
    ) -> Self {
        Self {
            scanner,
            backend,
            slot,
            options: GenerationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Scan, infer and persist.
    pub async fn analyze(&self) -> Result<LocationReport, LocationError> {
        let networks = self.scanner.scan().await;
        info!(count = networks.len(), "Wireless networks scanned");

        let analysis = self.analyze_networks(&networks).await?;
        Ok(LocationReport { networks, analysis })
    }

    pub async fn analyze_networks(&self, networks: &[String]) -> Result<String, LocationError> {
        let prompt = build_location_prompt(networks);
        debug!(%prompt, "Sending location prompt");

        let response = self.backend.generate(&prompt, &self.options).await?;
        debug!(provider = %response.provider, text = %response.text, "Location response received");

        if !self.slot.write(&response.text) {
            warn!("Location analysis was not persisted");
        }
        Ok(response.text)
    }

    pub fn last_analysis(&self) -> Option<String> {
        self.slot.read()
    }

    pub fn clear_history(&self) -> bool {
        self.slot.clear()
    }
}

pub fn build_location_prompt(networks: &[String]) -> String {
    format!(
        "Based on the following WiFi network names, analyze where this location might be \
         (respond with a summary within 50 words):\n{}\nProvide a brief analysis of the likely location.",
        networks.join("\n")
    )
}
