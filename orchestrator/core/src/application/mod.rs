// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0

pub mod platform;
pub mod motion;
pub mod location;
pub mod motion_location;
pub mod fusion_coordinator;
pub mod report_builder;
pub mod orchestrator;

// Re-export use cases for convenience
pub use platform::{PipelineSettings, Platform, PlatformComponents};
pub use motion::{LabelsListener, MotionDetector, MotionSession};
pub use location::{LocationAnalyzer, LocationError, LocationReport};
pub use motion_location::{CombinedAnalysis, MotionLocationPipeline, SubPipelineEvent, SubPipelineListener};
pub use fusion_coordinator::{FusionCoordinator, FusionOutcome, TimedInference};
pub use report_builder::{build_report, report_artifact_name, ReportInput};
pub use orchestrator::{PhaseError, PhaseOrchestrator};
