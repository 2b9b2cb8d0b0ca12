// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0

// Inference Backend Infrastructure - Anti-Corruption Layer Implementations
//
// Each adapter translates between the domain `LLMProvider` interface and an
// external API or local runtime.

pub mod anthropic;
pub mod ollama;
pub mod on_device;
pub mod openai;
pub mod registry;

pub use on_device::{EngineLoader, EngineParams, OnDeviceEngine};
pub use registry::ProviderRegistry;
