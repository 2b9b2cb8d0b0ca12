// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0

//! Store Implementations
//!
//! Persistent stores layered over a `PersistenceMedium`.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve analysis artifacts
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! - **BoundedHistoryStore** - fixed-capacity FIFO log stored as a JSON array
//! - **SingleSlotStore** - overwrite-on-write text artifact with a timestamp header
//!
//! Failures never propagate: reads degrade to "no data", writes report `false`
//! and log a warning.

pub mod history;
pub mod slot;

pub use history::{format_motion_history, BoundedHistoryStore, HistoryRead, NO_MOTION_HISTORY};
pub use slot::SingleSlotStore;

/// Header timestamp format shared by text renderings
pub const HEADER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
