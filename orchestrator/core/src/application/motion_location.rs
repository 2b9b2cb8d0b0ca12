// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0
//! Motion-Location Pass
//!
//! Self-contained pass used inside FUSION: a fresh motion window, a fresh
//! location analysis, then the combined results read back from both stores.
//! Progress is reported through a listener; the pass announces its outcome
//! with exactly one `CombinedResults` or `Failed` event.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::location::LocationAnalyzer;
use super::motion::MotionDetector;
use super::platform::Platform;
use crate::domain::motion::{format_labels, MotionDetectionRecord, MotionLabel};
use crate::infrastructure::repositories::{format_motion_history, HistoryRead};

pub const NO_LOCATION_DATA_AVAILABLE: &str = "No location data available";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubPipelineEvent {
    Progress(String),
    CombinedResults(String),
    Failed(String),
}

pub type SubPipelineListener = Arc<dyn Fn(SubPipelineEvent) + Send + Sync>;

/// A nested analysis pass that can be started and stopped.
pub trait CombinedAnalysis: Send + Sync {
    /// Start a pass. Returns `false` (after notifying the listener) when it cannot start.
    fn start_analysis(&self, listener: SubPipelineListener) -> bool;

    /// Cancel a running pass. Safe to call when idle.
    fn stop_analysis(&self);
}

struct ActivePass {
    id: Uuid,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

pub struct MotionLocationPipeline {
    platform: Weak<Platform>,
    active: Arc<Mutex<Option<ActivePass>>>,
}

impl MotionLocationPipeline {
    pub fn new(platform: Weak<Platform>) -> Self {
        Self {
            platform,
            active: Arc::new(Mutex::new(None)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.lock().is_some()
    }
}

impl CombinedAnalysis for MotionLocationPipeline {
    fn start_analysis(&self, listener: SubPipelineListener) -> bool {
        let mut active = self.active.lock();
        if active.is_some() {
            drop(active);
            warn!("Motion-location pass already in progress");
            listener(SubPipelineEvent::Failed("Analysis already in progress".into()));
            return false;
        }
        if self.platform.upgrade().is_none() {
            drop(active);
            listener(SubPipelineEvent::Failed("Error: Context no longer available".into()));
            return false;
        }
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                drop(active);
                listener(SubPipelineEvent::Failed(format!("Error during analysis: {}", e)));
                return false;
            }
        };

        let id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let platform = self.platform.clone();
        let slot = self.active.clone();

        let task = runtime.spawn(async move {
            let outcome = run_pass(&platform, &listener, &token).await;
            if !token.is_cancelled() {
                match outcome {
                    Ok(results) => listener(SubPipelineEvent::CombinedResults(results)),
                    Err(reason) => {
                        warn!("Motion-location pass failed: {}", reason);
                        listener(SubPipelineEvent::Failed(format!("Error during analysis: {}", reason)))
                    }
                }
            }
            let mut active = slot.lock();
            if active.as_ref().map(|pass| pass.id) == Some(id) {
                *active = None;
            }
        });

        *active = Some(ActivePass {
            id,
            cancel,
            task: Some(task),
        });
        info!(pass_id = %id, "Motion-location pass started");
        true
    }

    fn stop_analysis(&self) {
        let Some(mut pass) = self.active.lock().take() else {
            return;
        };
        pass.cancel.cancel();
        if let Some(task) = pass.task.take() {
            task.abort();
        }
        // The aborted task drops its motion session later; release the feed now
        if let Some(platform) = self.platform.upgrade() {
            if platform.sensor_feed.is_active() {
                platform.sensor_feed.deactivate();
            }
        }
        debug!(pass_id = %pass.id, "Motion-location pass stopped");
    }
}

impl Drop for MotionLocationPipeline {
    fn drop(&mut self) {
        self.stop_analysis();
    }
}

async fn run_pass(
    platform: &Weak<Platform>,
    listener: &SubPipelineListener,
    token: &CancellationToken,
) -> Result<String, String> {
    let unavailable = || "Context no longer available".to_string();

    listener(SubPipelineEvent::Progress("Starting motion detection phase...".into()));
    let (detector, window) = {
        let p = platform.upgrade().ok_or_else(unavailable)?;
        (
            MotionDetector::new(p.sensor_feed.clone(), p.motion_history.clone()),
            p.settings.motion_window,
        )
    };
    let progress = listener.clone();
    let session = detector
        .start(Arc::new(move |labels: &[MotionLabel]| {
            progress(SubPipelineEvent::Progress(format!(
                "Current motions: {}",
                format_labels(labels)
            )))
        }))
        .map_err(|e| format!("Motion detection failed: {}", e))?;
    tokio::select! {
        _ = token.cancelled() => return Err("cancelled".into()),
        _ = tokio::time::sleep(window) => {}
    }
    session.stop();

    listener(SubPipelineEvent::Progress("Starting location analysis phase...".into()));
    let analyzer = {
        let p = platform.upgrade().ok_or_else(unavailable)?;
        LocationAnalyzer::new(p.scanner.clone(), p.backends.location(), p.location_slot.clone())
    };
    tokio::select! {
        _ = token.cancelled() => return Err("cancelled".into()),
        result = analyzer.analyze() => {
            result.map_err(|e| format!("Location analysis failed: {}", e))?;
        }
    }
    drop(analyzer);

    listener(SubPipelineEvent::Progress("Retrieving combined results...".into()));
    let p = platform.upgrade().ok_or_else(unavailable)?;
    Ok(render_combined_results(
        &p.motion_history.read_all(),
        p.location_slot.read().as_deref(),
    ))
}

pub fn render_combined_results(
    motion: &HistoryRead<MotionDetectionRecord>,
    location: Option<&str>,
) -> String {
    format!(
        "=== Motion Analysis Results ===\n{}\n\n=== Location Analysis Results ===\n{}",
        format_motion_history(motion),
        location.unwrap_or(NO_LOCATION_DATA_AVAILABLE)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::NO_MOTION_HISTORY;

    #[test]
    fn test_combined_results_with_no_data() {
        assert_eq!(
            render_combined_results(&HistoryRead::NoData, None),
            format!(
                "=== Motion Analysis Results ===\n{}\n\n=== Location Analysis Results ===\n{}",
                NO_MOTION_HISTORY, NO_LOCATION_DATA_AVAILABLE
            )
        );
    }

    #[tokio::test]
    async fn test_start_without_platform_fails_fast() {
        let pipeline = MotionLocationPipeline::new(Weak::new());
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();

        assert!(!pipeline.start_analysis(Arc::new(move |event| sink.lock().push(event))));
        assert!(!pipeline.is_running());
        assert_eq!(
            events.lock().as_slice(),
            &[SubPipelineEvent::Failed("Error: Context no longer available".into())]
        );
        pipeline.stop_analysis();
    }
}
