// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Pure types and collaborator contracts of the context-analysis pipeline.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Phases, motion rules, sensor/scanner/storage/inference contracts, telemetry

pub mod phase;
pub mod motion;
pub mod sensor;
pub mod wireless;
pub mod storage;
pub mod llm;
pub mod telemetry;
pub mod pipeline_config;
