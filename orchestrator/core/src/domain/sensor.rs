// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0
//! Sensor Feed
//!
//! Collaborator interface for the motion sensors and the accumulator that
//! fuses their independent readings into classifiable samples.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** `SensorFeed` trait, reading types, `MotionTracker`

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use super::motion::{altitude_from_pressure, MotionSample};

/// A single reading delivered asynchronously by the feed.
///
/// Acceleration, step and speed updates arrive independently; only a pressure
/// reading triggers classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "sensor", content = "value", rename_all = "snake_case")]
pub enum SensorReading {
    LinearAcceleration(f64),
    StepCounter(u32),
    /// Barometric pressure in hPa
    Pressure(f64),
    /// Ground speed in m/s
    Speed(f64),
}

pub type SensorListener = Arc<dyn Fn(SensorReading) + Send + Sync>;

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("Sensor unavailable: {0}")]
    Unavailable(String),

    #[error("Sensor feed already active")]
    AlreadyActive,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

/// Activate / deactivate contract of the device sensors.
///
/// `deactivate` must unregister every listener and be safe to call when the
/// feed is not active.
pub trait SensorFeed: Send + Sync {
    fn activate(&self, listener: SensorListener) -> Result<(), SensorError>;

    fn deactivate(&self);

    fn is_active(&self) -> bool;
}

/// Keeps the latest value of every independent reading.
#[derive(Debug, Default)]
pub struct MotionTracker {
    last_acceleration: f64,
    step_count: u32,
    current_speed: f64,
    last_altitude: Option<f64>,
}

impl MotionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a reading. Returns a sample when the reading triggers classification.
    pub fn apply(&mut self, reading: SensorReading) -> Option<MotionSample> {
        match reading {
            SensorReading::LinearAcceleration(value) => {
                self.last_acceleration = value;
                None
            }
            SensorReading::StepCounter(steps) => {
                self.step_count = steps;
                None
            }
            SensorReading::Speed(speed) => {
                self.current_speed = speed.max(0.0);
                None
            }
            SensorReading::Pressure(pressure) => {
                let altitude = altitude_from_pressure(pressure);
                // First pressure sample has no reference altitude
                let altitude_change = self
                    .last_altitude
                    .map(|previous| altitude - previous)
                    .unwrap_or(0.0);
                self.last_altitude = Some(altitude);

                Some(MotionSample {
                    step_count: self.step_count,
                    linear_acceleration: self.last_acceleration,
                    altitude_change,
                    speed: self.current_speed,
                })
            }
        }
    }
}
