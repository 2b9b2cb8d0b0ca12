// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0

pub mod llm;
pub mod memory_probe;
pub mod repositories;
pub mod sensors;
pub mod storage;
pub mod wireless;

pub use memory_probe::ProcMemoryProbe;
