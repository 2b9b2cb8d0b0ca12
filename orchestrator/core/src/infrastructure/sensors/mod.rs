// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0

//! Sensor feed implementations.

pub mod replay;

pub use replay::{ReplayEvent, ReplaySensorFeed};
