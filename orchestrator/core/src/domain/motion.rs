// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0
//! Motion Classification
//!
//! Rule-based mapping from a sensor sample to a set of motion labels.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure classifier plus the record persisted in the motion history
//!
//! Labels are not mutually exclusive. Every rule is evaluated independently
//! (except the stationary / limited-motion pair, which is an if/else-if) and
//! each matching rule contributes its label, so one sample can yield zero, one
//! or several labels. Rules use the cumulative step count, not a per-tick delta.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard sea-level pressure in hPa.
pub const PRESSURE_STANDARD_ATMOSPHERE: f64 = 1013.25;

/// One fused sensor sample, consumed immediately by [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MotionSample {
    /// Cumulative step counter value
    pub step_count: u32,
    /// Linear acceleration magnitude (m/s², gravity excluded)
    pub linear_acceleration: f64,
    /// Signed altitude change since the previous pressure sample (m)
    pub altitude_change: f64,
    /// Ground speed (m/s)
    pub speed: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotionLabel {
    #[serde(rename = "stationary")]
    Stationary,
    #[serde(rename = "limited motion")]
    LimitedMotion,
    #[serde(rename = "jogging/running")]
    JoggingRunning,
    #[serde(rename = "walking")]
    Walking,
    #[serde(rename = "cycling")]
    Cycling,
    #[serde(rename = "vehicle/subway/ferry/train")]
    Vehicle,
    #[serde(rename = "escalator/elevator")]
    EscalatorElevator,
}

impl MotionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            MotionLabel::Stationary => "stationary",
            MotionLabel::LimitedMotion => "limited motion",
            MotionLabel::JoggingRunning => "jogging/running",
            MotionLabel::Walking => "walking",
            MotionLabel::Cycling => "cycling",
            MotionLabel::Vehicle => "vehicle/subway/ferry/train",
            MotionLabel::EscalatorElevator => "escalator/elevator",
        }
    }
}

impl fmt::Display for MotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a sample. Output order follows rule order.
pub fn classify(sample: &MotionSample) -> Vec<MotionLabel> {
    let MotionSample {
        step_count,
        linear_acceleration,
        altitude_change,
        speed,
    } = *sample;

    let mut labels = Vec::new();

    if step_count <= 2
        && linear_acceleration <= 0.1
        && altitude_change.abs() <= 0.1
        && speed <= 0.1
    {
        labels.push(MotionLabel::Stationary);
    } else if step_count <= 10 && altitude_change.abs() <= 1.0 && speed < 0.5 {
        labels.push(MotionLabel::LimitedMotion);
    }

    if step_count >= 140 && (2.0..=5.0).contains(&speed) {
        labels.push(MotionLabel::JoggingRunning);
    }

    if step_count >= 50 && speed < 1.8 {
        labels.push(MotionLabel::Walking);
    }

    if step_count >= 50 && speed >= 4.0 {
        labels.push(MotionLabel::Cycling);
    }

    if (step_count <= 5 && speed > 2.0) || speed > 5.0 {
        labels.push(MotionLabel::Vehicle);
    }

    if step_count <= 10 && altitude_change > 2.5 && speed < 2.0 {
        labels.push(MotionLabel::EscalatorElevator);
    }

    labels
}

/// Join labels the way every message and report renders them.
pub fn format_labels(labels: &[MotionLabel]) -> String {
    labels
        .iter()
        .map(MotionLabel::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Altitude in metres for a barometric pressure reading in hPa.
pub fn altitude_from_pressure(pressure_hpa: f64) -> f64 {
    44330.0 * (1.0 - (pressure_hpa / PRESSURE_STANDARD_ATMOSPHERE).powf(1.0 / 5.255))
}

/// Immutable entry of the bounded motion history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionDetectionRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "motions")]
    pub labels: Vec<MotionLabel>,
}

impl MotionDetectionRecord {
    pub fn new(labels: Vec<MotionLabel>) -> Self {
        Self {
            timestamp: Utc::now(),
            labels,
        }
    }

    pub fn at(timestamp: DateTime<Utc>, labels: Vec<MotionLabel>) -> Self {
        Self { timestamp, labels }
    }
}
