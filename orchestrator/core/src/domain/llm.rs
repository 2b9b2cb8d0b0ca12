// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0
//! Inference Backends
//!
//! Domain interface shared by the on-device engine and the remote HTTP
//! backends. The pipeline only ever sees this trait; the closed set of
//! concrete adapters lives in `infrastructure/llm/`.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Text-generation contract and its error taxonomy

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Text generation backend (on-device or remote).
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion for a single user prompt
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationResponse, LLMError>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> Result<(), LLMError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    pub temperature: Option<f32>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_tokens: Some(1024),
            temperature: Some(0.7),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationResponse {
    pub text: String,

    pub usage: TokenUsage,

    /// Backend kind that served the call (e.g. "ollama", "on-device")
    pub provider: String,

    pub model: String,

    pub finish_reason: FinishReason,
}

#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
}

impl FinishReason {
    pub fn from_provider(reason: Option<&str>) -> Self {
        match reason {
            Some("length") | Some("max_tokens") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Stop,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Engine not initialized: {0}")]
    EngineUnavailable(String),
}

impl LLMError {
    /// Map a transport failure, keeping timeouts distinguishable.
    pub fn from_transport(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            LLMError::Timeout(timeout_secs)
        } else {
            LLMError::Network(err.to_string())
        }
    }

    /// Map a non-success HTTP status the same way for every remote backend.
    pub fn from_status(status: reqwest::StatusCode, body: String, model: &str) -> Self {
        match status.as_u16() {
            401 | 403 => LLMError::Authentication(body),
            429 => LLMError::RateLimit,
            404 => LLMError::ModelNotFound(model.to_string()),
            _ => LLMError::Provider(format!("HTTP {}: {}", status, body)),
        }
    }
}
