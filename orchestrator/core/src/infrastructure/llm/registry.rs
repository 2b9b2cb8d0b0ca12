// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0

// Inference Backend Registry
//
// Builds the two inference backends the pipeline needs (on-device engine and
// remote HTTP backend) from configuration and resolves which one serves the
// location analysis. Backends are a closed set selected by `type`; there is no
// retry or fallback between them.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::anthropic::AnthropicAdapter;
use super::ollama::OllamaAdapter;
use super::on_device::{EngineParams, OnDeviceEngine, RuntimeLoader};
use super::openai::OpenAIAdapter;
use crate::domain::llm::{GenerationOptions, LLMError, LLMProvider};
use crate::domain::pipeline_config::{
    BackendConfig, BackendType, LocationBackend, PipelineConfigManifest,
};

pub struct ProviderRegistry {
    on_device: Arc<dyn LLMProvider>,
    remote: Arc<dyn LLMProvider>,
    location_backend: LocationBackend,
    remote_options: GenerationOptions,
}

impl ProviderRegistry {
    pub fn new(
        on_device: Arc<dyn LLMProvider>,
        remote: Arc<dyn LLMProvider>,
        location_backend: LocationBackend,
    ) -> Self {
        Self {
            on_device,
            remote,
            location_backend,
            remote_options: GenerationOptions::default(),
        }
    }

    /// Create both backends from the pipeline configuration
    pub fn from_config(config: &PipelineConfigManifest) -> anyhow::Result<Self> {
        let spec = &config.spec;
        info!("Initializing inference backend registry");

        let runtime = Self::create_provider(&spec.on_device.engine)?;
        let on_device = OnDeviceEngine::global(
            EngineParams {
                model_path: spec.on_device.model_path.clone(),
                max_tokens: spec.on_device.max_tokens,
            },
            Box::new(RuntimeLoader::new(runtime)),
        );

        info!(
            "Remote backend: {:?} {} ({})",
            spec.remote.backend_type, spec.remote.model, spec.remote.endpoint
        );
        let remote = Self::create_provider(&spec.remote)?;

        let defaults = GenerationOptions::default();
        Ok(Self {
            on_device,
            remote,
            location_backend: spec.location.backend,
            remote_options: GenerationOptions {
                max_tokens: spec.remote.max_tokens.or(defaults.max_tokens),
                temperature: spec.remote.temperature.or(defaults.temperature),
            },
        })
    }

    /// Create a backend instance from configuration
    pub fn create_provider(config: &BackendConfig) -> anyhow::Result<Arc<dyn LLMProvider>> {
        let api_key = Self::resolve_api_key(&config.api_key)?;
        let timeout = Duration::from_secs(config.timeout_seconds);

        let provider: Arc<dyn LLMProvider> = match config.backend_type {
            BackendType::Ollama => Arc::new(OllamaAdapter::new(
                config.endpoint.clone(),
                config.model.clone(),
                config.mode,
                timeout,
            )),
            BackendType::OpenAI => Arc::new(OpenAIAdapter::new(
                config.endpoint.clone(),
                api_key,
                config.model.clone(),
                timeout,
            )),
            BackendType::OpenAICompatible => Arc::new(OpenAIAdapter::compatible(
                config.endpoint.clone(),
                api_key,
                config.model.clone(),
                timeout,
            )),
            BackendType::Anthropic => {
                if api_key.is_empty() {
                    anyhow::bail!("Anthropic backend requires an api_key");
                }
                Arc::new(AnthropicAdapter::new(
                    config.endpoint.clone(),
                    api_key,
                    config.model.clone(),
                    timeout,
                ))
            }
        };

        Ok(provider)
    }

    /// Resolve API key from config (supports "env:VAR_NAME" syntax)
    pub fn resolve_api_key(key: &Option<String>) -> anyhow::Result<String> {
        match key {
            Some(k) => match k.strip_prefix("env:") {
                Some(var_name) => std::env::var(var_name)
                    .map_err(|_| anyhow::anyhow!("Environment variable not set: {}", var_name)),
                None => Ok(k.clone()),
            },
            // Local runtimes without auth
            None => Ok(String::new()),
        }
    }

    pub fn on_device(&self) -> Arc<dyn LLMProvider> {
        self.on_device.clone()
    }

    pub fn remote(&self) -> Arc<dyn LLMProvider> {
        self.remote.clone()
    }

    /// Backend serving the location analysis
    pub fn location(&self) -> Arc<dyn LLMProvider> {
        match self.location_backend {
            LocationBackend::OnDevice => self.on_device.clone(),
            LocationBackend::Remote => self.remote.clone(),
        }
    }

    pub fn location_backend(&self) -> LocationBackend {
        self.location_backend
    }

    pub fn remote_options(&self) -> &GenerationOptions {
        &self.remote_options
    }

    /// Check health of both backends concurrently
    pub async fn health_check_all(&self) -> BTreeMap<&'static str, Result<(), LLMError>> {
        info!("Health checking inference backends");
        let (on_device, remote) =
            futures::join!(self.on_device.health_check(), self.remote.health_check());
        BTreeMap::from([("on-device", on_device), ("remote", remote)])
    }
}
