// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0
//! Phase Telemetry
//!
//! Per-phase start timestamps and memory snapshots, used only for reporting.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** `TelemetryRecorder`, `MemorySnapshot`, inter-phase deltas

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::phase::AnalysisPhase;

/// Memory usage at a point in time, in whole megabytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub heap_used_mb: i64,
    pub heap_max_mb: i64,
    pub native_heap_mb: i64,
    pub pss_mb: i64,
    pub rss_mb: i64,
}

/// Source of memory snapshots (procfs on Linux, fixed values in tests).
pub trait MemoryProbe: Send + Sync {
    fn snapshot(&self) -> MemorySnapshot;
}

/// Difference between two consecutive phase snapshots (second minus first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryDelta {
    pub from: AnalysisPhase,
    pub to: AnalysisPhase,
    pub heap_used_mb: i64,
    pub heap_max_mb: i64,
    pub native_heap_mb: i64,
    pub pss_mb: i64,
    pub rss_mb: i64,
}

impl MemoryDelta {
    pub fn between(
        from: (AnalysisPhase, &MemorySnapshot),
        to: (AnalysisPhase, &MemorySnapshot),
    ) -> Self {
        let (a, b) = (from.1, to.1);
        Self {
            from: from.0,
            to: to.0,
            heap_used_mb: b.heap_used_mb - a.heap_used_mb,
            heap_max_mb: b.heap_max_mb - a.heap_max_mb,
            native_heap_mb: b.native_heap_mb - a.native_heap_mb,
            pss_mb: b.pss_mb - a.pss_mb,
            rss_mb: b.rss_mb - a.rss_mb,
        }
    }
}

/// Telemetry captured when a phase starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseMark {
    pub phase: AnalysisPhase,
    pub started_at: DateTime<Utc>,
    pub memory: MemorySnapshot,
}

/// Insertion-ordered phase → (timestamp, snapshot) map.
///
/// A phase that recurs overwrites its entry in place, so ordering reflects the
/// first time the phase was seen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseTelemetry {
    marks: Vec<PhaseMark>,
}

impl PhaseTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mark: PhaseMark) {
        match self.marks.iter_mut().find(|m| m.phase == mark.phase) {
            Some(existing) => *existing = mark,
            None => self.marks.push(mark),
        }
    }

    pub fn marks(&self) -> &[PhaseMark] {
        &self.marks
    }

    pub fn started_at(&self, phase: AnalysisPhase) -> Option<DateTime<Utc>> {
        self.get(phase).map(|m| m.started_at)
    }

    pub fn get(&self, phase: AnalysisPhase) -> Option<&PhaseMark> {
        self.marks.iter().find(|m| m.phase == phase)
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    pub fn clear(&mut self) {
        self.marks.clear();
    }

    /// Per-metric differences for each adjacent pair, in insertion order.
    pub fn deltas(&self) -> Vec<MemoryDelta> {
        self.marks
            .windows(2)
            .map(|pair| {
                MemoryDelta::between(
                    (pair[0].phase, &pair[0].memory),
                    (pair[1].phase, &pair[1].memory),
                )
            })
            .collect()
    }
}

/// Records a (timestamp, memory snapshot) pair per phase transition.
pub struct TelemetryRecorder {
    probe: Arc<dyn MemoryProbe>,
    telemetry: PhaseTelemetry,
}

impl TelemetryRecorder {
    pub fn new(probe: Arc<dyn MemoryProbe>) -> Self {
        Self {
            probe,
            telemetry: PhaseTelemetry::new(),
        }
    }

    pub fn record_phase_memory(&mut self, phase: AnalysisPhase) -> PhaseMark {
        let mark = PhaseMark {
            phase,
            started_at: Utc::now(),
            memory: self.probe.snapshot(),
        };
        self.telemetry.insert(mark);
        mark
    }

    pub fn deltas(&self) -> Vec<MemoryDelta> {
        self.telemetry.deltas()
    }

    pub fn telemetry(&self) -> &PhaseTelemetry {
        &self.telemetry
    }

    pub fn clear(&mut self) {
        self.telemetry.clear();
    }
}
