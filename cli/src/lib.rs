// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0
//! contextfuse CLI library - exposes testable components
//!
//! # Architecture
//!
//! - **Layer:** Interface / Presentation Layer
//! - **Purpose:** Command handlers and logging setup for the `ctxfuse` binary

pub mod commands;
pub mod logging;
