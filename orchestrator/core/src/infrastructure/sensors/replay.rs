// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0

//! Replay Sensor Feed
//!
//! Plays back recorded readings at their recorded offsets from activation.
//! Stands in for device sensors on hosts without them.
//!
//! Recording format (JSON array):
//!
//! ```json
//! [
//!   { "offset_ms": 0,    "reading": { "sensor": "step_counter", "value": 60 } },
//!   { "offset_ms": 1000, "reading": { "sensor": "pressure", "value": 1012.8 } }
//! ]
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::sensor::{SensorError, SensorFeed, SensorListener, SensorReading};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayEvent {
    pub offset_ms: u64,
    pub reading: SensorReading,
}

struct ActiveReplay {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

pub struct ReplaySensorFeed {
    events: Arc<Vec<ReplayEvent>>,
    listener: Arc<Mutex<Option<SensorListener>>>,
    active: Mutex<Option<ActiveReplay>>,
}

impl ReplaySensorFeed {
    pub fn new(mut events: Vec<ReplayEvent>) -> Self {
        events.sort_by_key(|e| e.offset_ms);
        Self {
            events: Arc::new(events),
            listener: Arc::new(Mutex::new(None)),
            active: Mutex::new(None),
        }
    }

    /// Feed that never delivers a reading.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SensorError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SensorError::Unavailable(format!("cannot read {}: {}", path.display(), e))
        })?;
        let events: Vec<ReplayEvent> = serde_json::from_str(&contents).map_err(|e| {
            SensorError::Unavailable(format!("invalid recording {}: {}", path.display(), e))
        })?;
        info!(events = events.len(), path = %path.display(), "Loaded sensor recording");
        Ok(Self::new(events))
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl SensorFeed for ReplaySensorFeed {
    fn activate(&self, listener: SensorListener) -> Result<(), SensorError> {
        let mut active = self.active.lock();
        if active.is_some() {
            return Err(SensorError::AlreadyActive);
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SensorError::Unavailable(format!("no async runtime: {}", e)))?;

        *self.listener.lock() = Some(listener);

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let events = self.events.clone();
        let slot = self.listener.clone();

        let task = runtime.spawn(async move {
            let started = tokio::time::Instant::now();
            for event in events.iter() {
                let due = started + Duration::from_millis(event.offset_ms);
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = tokio::time::sleep_until(due) => {}
                }
                // Cloned out so a listener may call deactivate() itself
                let listener = slot.lock().clone();
                match listener {
                    Some(listener) if !token.is_cancelled() => listener(event.reading),
                    _ => return,
                }
            }
            debug!("Sensor recording exhausted");
        });

        *active = Some(ActiveReplay { cancel, task });
        debug!("Replay sensor feed activated");
        Ok(())
    }

    fn deactivate(&self) {
        if let Some(replay) = self.active.lock().take() {
            replay.cancel.cancel();
            replay.task.abort();
            debug!("Replay sensor feed deactivated");
        }
        self.listener.lock().take();
    }

    fn is_active(&self) -> bool {
        self.active.lock().is_some()
    }
}

impl Drop for ReplaySensorFeed {
    fn drop(&mut self) {
        self.deactivate();
    }
}
