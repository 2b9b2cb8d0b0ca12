// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0

// On-Device Inference Engine
//
// Process-wide engine handle, initialized once on first use from fixed
// parameters (model path, token limit). Every later caller shares the same
// loaded engine; parameters passed after initialization are ignored.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::domain::llm::{GenerationOptions, GenerationResponse, LLMError, LLMProvider};

/// Fixed initialization parameters, read once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineParams {
    pub model_path: String,
    pub max_tokens: u32,
}

/// Loads the engine runtime. Called at most once per `OnDeviceEngine`.
pub trait EngineLoader: Send + Sync {
    fn load(&self, params: &EngineParams) -> Result<Arc<dyn LLMProvider>, LLMError>;
}

/// Loader that hands back an already-constructed runtime client.
pub struct RuntimeLoader {
    runtime: Arc<dyn LLMProvider>,
}

impl RuntimeLoader {
    pub fn new(runtime: Arc<dyn LLMProvider>) -> Self {
        Self { runtime }
    }
}

impl EngineLoader for RuntimeLoader {
    fn load(&self, params: &EngineParams) -> Result<Arc<dyn LLMProvider>, LLMError> {
        if params.model_path.is_empty() {
            return Err(LLMError::EngineUnavailable("model path is empty".into()));
        }
        Ok(self.runtime.clone())
    }
}

pub struct OnDeviceEngine {
    params: EngineParams,
    loader: Box<dyn EngineLoader>,
    engine: OnceCell<Arc<dyn LLMProvider>>,
}

static GLOBAL_ENGINE: OnceCell<Arc<OnDeviceEngine>> = OnceCell::new();

impl OnDeviceEngine {
    pub fn new(params: EngineParams, loader: Box<dyn EngineLoader>) -> Self {
        Self {
            params,
            loader,
            engine: OnceCell::new(),
        }
    }

    /// Shared process-wide engine. The first caller's parameters win.
    pub fn global(params: EngineParams, loader: Box<dyn EngineLoader>) -> Arc<OnDeviceEngine> {
        GLOBAL_ENGINE
            .get_or_init(|| Arc::new(OnDeviceEngine::new(params, loader)))
            .clone()
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    pub fn is_loaded(&self) -> bool {
        self.engine.get().is_some()
    }

    fn engine(&self) -> Result<&Arc<dyn LLMProvider>, LLMError> {
        self.engine.get_or_try_init(|| {
            info!(
                model_path = %self.params.model_path,
                max_tokens = self.params.max_tokens,
                "Initializing on-device inference engine"
            );
            self.loader.load(&self.params)
        })
    }
}

#[async_trait]
impl LLMProvider for OnDeviceEngine {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationResponse, LLMError> {
        let engine = self.engine()?;
        let options = GenerationOptions {
            max_tokens: Some(
                options
                    .max_tokens
                    .map_or(self.params.max_tokens, |t| t.min(self.params.max_tokens)),
            ),
            temperature: options.temperature,
        };
        debug!(prompt_chars = prompt.len(), "On-device generation");

        let mut response = engine.generate(prompt, &options).await?;
        response.provider = "on-device".to_string();
        Ok(response)
    }

    async fn health_check(&self) -> Result<(), LLMError> {
        self.engine()?.health_check().await
    }
}
