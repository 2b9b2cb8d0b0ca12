// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0
//! Motion Detector
//!
//! Registers on the sensor feed, fuses readings with `MotionTracker`, classifies
//! every pressure-triggered sample, appends it to the motion history and hands
//! the labels to the caller.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::domain::motion::{classify, MotionDetectionRecord, MotionLabel};
use crate::domain::sensor::{MotionTracker, SensorError, SensorFeed, SensorListener};
use crate::infrastructure::repositories::BoundedHistoryStore;

pub type LabelsListener = Arc<dyn Fn(&[MotionLabel]) + Send + Sync>;

pub struct MotionDetector {
    feed: Arc<dyn SensorFeed>,
    history: Arc<BoundedHistoryStore<MotionDetectionRecord>>,
}

impl MotionDetector {
    pub fn new(
        feed: Arc<dyn SensorFeed>,
        history: Arc<BoundedHistoryStore<MotionDetectionRecord>>,
    ) -> Self {
        Self { feed, history }
    }

    /// Activate the feed. Detection runs until the returned session is stopped or dropped.
    pub fn start(&self, on_labels: LabelsListener) -> Result<MotionSession, SensorError> {
        let tracker = Mutex::new(MotionTracker::new());
        let history = self.history.clone();

        let listener: SensorListener = Arc::new(move |reading| {
            let Some(sample) = tracker.lock().apply(reading) else {
                return;
            };
            let labels = classify(&sample);
            debug!(?sample, ?labels, "Motion sample classified");

            if !history.append(MotionDetectionRecord::new(labels.clone())) {
                warn!("Motion detection record was not persisted");
            }
            on_labels(&labels);
        });

        self.feed.activate(listener)?;
        Ok(MotionSession {
            feed: Some(self.feed.clone()),
        })
    }
}

/// Active registration on the sensor feed. Dropping it deactivates the feed.
pub struct MotionSession {
    feed: Option<Arc<dyn SensorFeed>>,
}

impl MotionSession {
    pub fn stop(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(feed) = self.feed.take() {
            feed.deactivate();
            debug!("Motion detection stopped");
        }
    }
}

impl Drop for MotionSession {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sensor::SensorReading;
    use crate::infrastructure::storage::InMemoryMedium;

    /// Feed that lets the test push readings synchronously.
    #[derive(Default)]
    struct ManualFeed {
        listener: Mutex<Option<SensorListener>>,
    }

    impl ManualFeed {
        fn push(&self, reading: SensorReading) {
            let listener = self.listener.lock().clone();
            if let Some(listener) = listener {
                listener(reading);
            }
        }
    }

    impl SensorFeed for ManualFeed {
        fn activate(&self, listener: SensorListener) -> Result<(), SensorError> {
            *self.listener.lock() = Some(listener);
            Ok(())
        }

        fn deactivate(&self) {
            self.listener.lock().take();
        }

        fn is_active(&self) -> bool {
            self.listener.lock().is_some()
        }
    }

    #[test]
    fn test_pressure_reading_classifies_and_persists() {
        let feed = Arc::new(ManualFeed::default());
        let history = Arc::new(BoundedHistoryStore::new(
            Arc::new(InMemoryMedium::new()),
            "motion_detections.json",
            10,
        ));
        let seen = Arc::new(Mutex::new(Vec::<Vec<MotionLabel>>::new()));
        let sink = seen.clone();

        let detector = MotionDetector::new(feed.clone(), history.clone());
        let session = detector
            .start(Arc::new(move |labels: &[MotionLabel]| sink.lock().push(labels.to_vec())))
            .unwrap();

        feed.push(SensorReading::StepCounter(60));
        feed.push(SensorReading::Speed(1.2));
        assert!(seen.lock().is_empty());

        feed.push(SensorReading::Pressure(1013.25));
        assert_eq!(seen.lock().as_slice(), &[vec![MotionLabel::Walking]]);
        assert_eq!(history.read_all().records().len(), 1);

        session.stop();
        assert!(!feed.is_active());
        feed.push(SensorReading::Pressure(1013.0));
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_dropping_session_deactivates_feed() {
        let feed = Arc::new(ManualFeed::default());
        let history = Arc::new(BoundedHistoryStore::new(
            Arc::new(InMemoryMedium::new()),
            "motion_detections.json",
            10,
        ));
        {
            let _session = MotionDetector::new(feed.clone(), history)
                .start(Arc::new(|_| {}))
                .unwrap();
            assert!(feed.is_active());
        }
        assert!(!feed.is_active());
    }
}
