// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0
//! Lib
//!
//! Context-analysis pipeline: motion classification, location inference and
//! context fusion over a fixed phase graph.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Crate root

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
