// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0
//! Report Builder
//!
//! Renders the end-of-run report from store contents and phase telemetry.
//! Pure: identical inputs give byte-identical output. The caller persists it.

use chrono::{DateTime, Utc};

use super::fusion_coordinator::FusionOutcome;
use super::motion_location::NO_LOCATION_DATA_AVAILABLE;
use crate::domain::motion::MotionDetectionRecord;
use crate::domain::phase::AnalysisPhase;
use crate::domain::telemetry::{MemoryDelta, PhaseTelemetry};
use crate::infrastructure::repositories::{format_motion_history, HistoryRead};

pub const NO_FUSION_DATA_AVAILABLE: &str = "No fusion data available";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

pub struct ReportInput<'a> {
    pub motion_history: &'a HistoryRead<MotionDetectionRecord>,
    pub location_text: Option<&'a str>,
    pub fusion_text: Option<&'a str>,
    pub fusion: Option<&'a FusionOutcome>,
    pub telemetry: &'a PhaseTelemetry,
}

pub fn build_report(input: &ReportInput<'_>) -> String {
    let mut out = String::from("=== Context Analysis Report ===\n\n");

    out.push_str("--- Phase Timing ---\n");
    if input.telemetry.is_empty() {
        out.push_str("No phase timing recorded\n");
    }
    for mark in input.telemetry.marks() {
        out.push_str(&format!(
            "{}: {}\n",
            mark.phase,
            mark.started_at.format(TIMESTAMP_FORMAT)
        ));
    }

    out.push_str("\n--- Motion Results ---\n");
    out.push_str(format_motion_history(input.motion_history).trim_end());

    out.push_str("\n\n--- Location Results ---\n");
    out.push_str(
        input
            .location_text
            .unwrap_or(NO_LOCATION_DATA_AVAILABLE)
            .trim_end(),
    );

    out.push_str("\n\n--- Fusion Results ---\n");
    out.push_str(
        input
            .fusion_text
            .unwrap_or(NO_FUSION_DATA_AVAILABLE)
            .trim_end(),
    );
    if let Some(fusion) = input.fusion {
        out.push_str("\n\nBackend timing:\n");
        for inference in fusion.inferences() {
            out.push_str(&format!("  {}\n", inference.timing_line()));
        }
    } else {
        out.push('\n');
    }

    out.push('\n');
    out.push_str(&total_elapsed_line(
        input.telemetry.started_at(AnalysisPhase::Motion),
        input.telemetry.started_at(AnalysisPhase::Complete),
    ));

    out.push_str("\n\n--- Memory Snapshots ---\n");
    if input.telemetry.is_empty() {
        out.push_str("No memory snapshots recorded\n");
    }
    for mark in input.telemetry.marks() {
        let m = &mark.memory;
        out.push_str(&format!(
            "{}: heap used {} MB / max {} MB, native heap {} MB, PSS {} MB, RSS {} MB\n",
            mark.phase, m.heap_used_mb, m.heap_max_mb, m.native_heap_mb, m.pss_mb, m.rss_mb
        ));
    }

    out.push_str("\n--- Memory Deltas ---\n");
    let deltas = input.telemetry.deltas();
    if deltas.is_empty() {
        out.push_str("Not enough snapshots for deltas\n");
    }
    for delta in &deltas {
        out.push_str(&delta_line(delta));
    }

    out
}

fn total_elapsed_line(motion: Option<DateTime<Utc>>, complete: Option<DateTime<Utc>>) -> String {
    match (motion, complete) {
        (Some(start), Some(end)) => {
            let elapsed = end - start;
            format!(
                "Total elapsed: {} ms ({:.3} s)",
                elapsed.num_milliseconds(),
                elapsed.num_milliseconds() as f64 / 1000.0
            )
        }
        _ => "Total elapsed: unavailable".to_string(),
    }
}

fn delta_line(delta: &MemoryDelta) -> String {
    format!(
        "{} -> {}: heap used {:+} MB, heap max {:+} MB, native heap {:+} MB, PSS {:+} MB, RSS {:+} MB\n",
        delta.from,
        delta.to,
        delta.heap_used_mb,
        delta.heap_max_mb,
        delta.native_heap_mb,
        delta.pss_mb,
        delta.rss_mb
    )
}

/// Artifact name for a report finished at `at`.
pub fn report_artifact_name(prefix: &str, at: DateTime<Utc>) -> String {
    format!("{}_{}.txt", prefix, at.format("%Y%m%d_%H%M%S"))
}
