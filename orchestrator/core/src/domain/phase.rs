// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0
//! Analysis Phase
//!
//! Phases of the fixed pipeline and the single-listener callback each phase
//! reports through.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Phase identifiers, run identity and caller-facing callback type

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// One stage of the pipeline.
///
/// `None` is both the initial state and the terminal state after failure or
/// cancellation. `Complete` is terminal on success and is immediately followed
/// by cleanup back to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisPhase {
    #[default]
    None,
    Motion,
    Location,
    Fusion,
    Complete,
}

impl AnalysisPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisPhase::None => "NONE",
            AnalysisPhase::Motion => "MOTION",
            AnalysisPhase::Location => "LOCATION",
            AnalysisPhase::Fusion => "FUSION",
            AnalysisPhase::Complete => "COMPLETE",
        }
    }
}

impl fmt::Display for AnalysisPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied listener. Receives a human-readable message for every
/// transition, including failures, tagged with the phase it belongs to.
pub type PhaseCallback = Arc<dyn Fn(&str, AnalysisPhase) + Send + Sync>;

/// Identity of a single `start_analysis` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_display_matches_wire_name() {
        assert_eq!(AnalysisPhase::Motion.to_string(), "MOTION");
        assert_eq!(
            serde_json::to_string(&AnalysisPhase::Complete).unwrap(),
            "\"COMPLETE\""
        );
        assert_eq!(AnalysisPhase::default(), AnalysisPhase::None);
    }
}
