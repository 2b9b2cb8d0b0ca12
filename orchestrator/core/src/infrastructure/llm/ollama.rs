// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0

// Ollama LLM Provider Adapter
//
// Anti-Corruption Layer for Ollama local models.
// Serves both the chat endpoint (remote fusion backend) and the generate
// endpoint (local runtime behind the on-device engine).

use std::time::Duration;

use crate::domain::llm::{
    FinishReason, GenerationOptions, GenerationResponse, LLMError, LLMProvider, TokenUsage,
};
use crate::domain::pipeline_config::ChatMode;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub struct OllamaAdapter {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    mode: ChatMode,
    timeout: Duration,
}

#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<i32>,
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
    done: bool,
    done_reason: Option<String>,
    eval_count: Option<u32>,
    prompt_eval_count: Option<u32>,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
    done: bool,
    done_reason: Option<String>,
    eval_count: Option<u32>,
    prompt_eval_count: Option<u32>,
}

impl OllamaAdapter {
    pub fn new(endpoint: String, model: String, mode: ChatMode, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            model,
            mode,
            timeout,
        }
    }

    fn options(options: &GenerationOptions) -> Option<OllamaOptions> {
        Some(OllamaOptions {
            temperature: options.temperature,
            num_predict: options.max_tokens.map(|t| t as i32),
        })
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<reqwest::Response, LLMError> {
        let url = format!("{}{}", self.endpoint.trim_end_matches('/'), path);
        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| LLMError::from_transport(e, self.timeout.as_secs()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LLMError::from_status(status, error_text, &self.model));
        }
        Ok(response)
    }

    fn response(
        &self,
        text: String,
        done: bool,
        done_reason: Option<&str>,
        prompt_tokens: Option<u32>,
        completion_tokens: Option<u32>,
    ) -> GenerationResponse {
        let prompt_tokens = prompt_tokens.unwrap_or(0);
        let completion_tokens = completion_tokens.unwrap_or(0);
        GenerationResponse {
            text,
            usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
            provider: "ollama".to_string(),
            model: self.model.clone(),
            finish_reason: if done {
                FinishReason::from_provider(done_reason)
            } else {
                FinishReason::Length
            },
        }
    }
}

#[async_trait]
impl LLMProvider for OllamaAdapter {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationResponse, LLMError> {
        match self.mode {
            ChatMode::Generate => {
                let request = OllamaGenerateRequest {
                    model: &self.model,
                    prompt,
                    stream: false,
                    options: Self::options(options),
                };
                let body: OllamaGenerateResponse = self
                    .post("/api/generate", &request)
                    .await?
                    .json()
                    .await
                    .map_err(|e| LLMError::Provider(format!("Failed to parse response: {}", e)))?;

                Ok(self.response(
                    body.response,
                    body.done,
                    body.done_reason.as_deref(),
                    body.prompt_eval_count,
                    body.eval_count,
                ))
            }
            ChatMode::Chat => {
                let request = OllamaChatRequest {
                    model: &self.model,
                    messages: vec![OllamaMessage {
                        role: "user".to_string(),
                        content: prompt.to_string(),
                    }],
                    stream: false,
                    options: Self::options(options),
                };
                let body: OllamaChatResponse = self
                    .post("/api/chat", &request)
                    .await?
                    .json()
                    .await
                    .map_err(|e| LLMError::Provider(format!("Failed to parse response: {}", e)))?;

                Ok(self.response(
                    body.message.content,
                    body.done,
                    body.done_reason.as_deref(),
                    body.prompt_eval_count,
                    body.eval_count,
                ))
            }
        }
    }

    async fn health_check(&self) -> Result<(), LLMError> {
        // Listing local models proves the server is up
        let url = format!("{}/api/tags", self.endpoint.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| LLMError::from_transport(e, self.timeout.as_secs()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(LLMError::Network(format!("HTTP {}", response.status())))
        }
    }
}
