// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0
//! Phase Orchestrator
//!
//! Drives one analysis run through the fixed phase graph
//! `NONE -> MOTION -> LOCATION -> FUSION -> COMPLETE`, reporting every
//! transition to the caller's callback. Any phase may fall back to `NONE` on
//! cancellation or failure; `COMPLETE` resets to `NONE` after the report is
//! delivered.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Run lifecycle, cancellation and cleanup
//!
//! # Concurrency
//!
//! Phases run sequentially on one spawned task per run. Mutable run state
//! (phase, cancellation handle, held sensor/location resources) lives behind a
//! single mutex and is only changed by the run task or by `cleanup`, which is
//! synchronous and idempotent. Every mutation from the run task is checked
//! against its `RunId`, so a stale task cannot touch a newer run.

use std::future::Future;
use std::sync::{Arc, Weak};

use chrono::Utc;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, info, warn};

use super::fusion_coordinator::FusionCoordinator;
use super::location::{LocationAnalyzer, LocationError};
use super::motion::{LabelsListener, MotionDetector, MotionSession};
use super::motion_location::{CombinedAnalysis, MotionLocationPipeline};
use super::platform::Platform;
use super::report_builder::{build_report, report_artifact_name, ReportInput};
use crate::domain::motion::{format_labels, MotionLabel};
use crate::domain::phase::{AnalysisPhase, PhaseCallback, RunId};
use crate::domain::sensor::SensorError;
use crate::domain::telemetry::TelemetryRecorder;

#[derive(Debug, Error)]
pub enum PhaseError {
    #[error("Analysis cancelled")]
    Cancelled,

    #[error("Context no longer available")]
    ContextUnavailable,

    #[error("Motion detection failed: {0}")]
    Motion(#[from] SensorError),

    #[error("Location analysis failed: {0}")]
    Location(#[from] LocationError),

    #[error("Error in fusion analysis: {0}")]
    Fusion(String),
}

impl PhaseError {
    /// Phase the failure is reported under.
    pub fn reported_phase(&self) -> AnalysisPhase {
        match self {
            PhaseError::Cancelled | PhaseError::ContextUnavailable => AnalysisPhase::None,
            PhaseError::Motion(_) => AnalysisPhase::Motion,
            PhaseError::Location(_) => AnalysisPhase::Location,
            PhaseError::Fusion(_) => AnalysisPhase::Fusion,
        }
    }
}

#[derive(Default)]
struct RunState {
    phase: AnalysisPhase,
    is_analyzing: bool,
    run_id: Option<RunId>,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
    motion_session: Option<MotionSession>,
    location: Option<Arc<LocationAnalyzer>>,
    closed: bool,
}

struct Inner {
    platform: Weak<Platform>,
    sub_pipeline: Arc<dyn CombinedAnalysis>,
    state: Mutex<RunState>,
    telemetry: Mutex<TelemetryRecorder>,
    status: watch::Sender<AnalysisPhase>,
    root: CancellationToken,
}

pub struct PhaseOrchestrator {
    inner: Arc<Inner>,
}

impl PhaseOrchestrator {
    pub fn new(platform: &Arc<Platform>) -> Self {
        let sub_pipeline = Arc::new(MotionLocationPipeline::new(Arc::downgrade(platform)));
        Self::with_sub_pipeline(platform, sub_pipeline)
    }

    /// Use a specific nested motion-location pass for FUSION.
    pub fn with_sub_pipeline(platform: &Arc<Platform>, sub_pipeline: Arc<dyn CombinedAnalysis>) -> Self {
        let (status, _) = watch::channel(AnalysisPhase::None);
        Self {
            inner: Arc::new(Inner {
                platform: Arc::downgrade(platform),
                sub_pipeline,
                state: Mutex::new(RunState::default()),
                telemetry: Mutex::new(TelemetryRecorder::new(platform.memory_probe.clone())),
                status,
                root: CancellationToken::new(),
            }),
        }
    }

    /// Start a run. Returns `None` (after notifying the callback) when no run was started.
    pub fn start_analysis(&self, callback: PhaseCallback) -> Option<RunId> {
        let inner = &self.inner;
        let mut state = inner.state.lock();

        if state.closed {
            drop(state);
            callback("Analysis pipeline has been closed", AnalysisPhase::None);
            return None;
        }
        if state.is_analyzing {
            let phase = state.phase;
            drop(state);
            warn!("Analysis already in progress");
            callback("Analysis already in progress", phase);
            return None;
        }
        let Some(platform) = inner.platform.upgrade() else {
            drop(state);
            callback("Context no longer available", AnalysisPhase::None);
            return None;
        };
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                drop(state);
                callback(&format!("Cannot start analysis: {}", e), AnalysisPhase::None);
                return None;
            }
        };

        // Per-run state starts empty
        inner.telemetry.lock().clear();
        platform.fusion_slot.clear();
        drop(platform);

        let run_id = RunId::new();
        let token = inner.root.child_token();
        state.run_id = Some(run_id);
        state.is_analyzing = true;
        state.phase = AnalysisPhase::Motion;
        state.cancel = Some(token.clone());
        state.task = Some(runtime.spawn(run(inner.clone(), run_id, token, callback)));
        inner.status.send_replace(AnalysisPhase::Motion);
        drop(state);

        info!(run_id = %run_id, "Analysis started");
        Some(run_id)
    }

    /// Cancel the current run and reset to `NONE`. Safe to call when idle.
    pub fn stop_analysis(&self) {
        if self.inner.cleanup(None) {
            info!("Analysis stopped");
        }
    }

    /// Stop and retire the orchestrator; later starts are refused.
    pub fn close(&self) {
        self.stop_analysis();
        let already_closed = std::mem::replace(&mut self.inner.state.lock().closed, true);
        if !already_closed {
            self.inner.root.cancel();
            info!("Analysis pipeline closed");
        }
    }

    pub fn get_current_phase(&self) -> AnalysisPhase {
        self.inner.state.lock().phase
    }

    pub fn is_analyzing(&self) -> bool {
        self.inner.state.lock().is_analyzing
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    pub fn current_run(&self) -> Option<RunId> {
        self.inner.state.lock().run_id
    }

    /// Phase changes as they happen.
    pub fn watch_phase(&self) -> watch::Receiver<AnalysisPhase> {
        self.inner.status.subscribe()
    }

    /// Resolve once no run is active and its last callback has been delivered.
    pub async fn wait_until_idle(&self) {
        let mut rx = self.inner.status.subscribe();
        let _ = rx.wait_for(|phase| *phase == AnalysisPhase::None).await;
    }
}

impl Drop for PhaseOrchestrator {
    fn drop(&mut self) {
        self.close();
    }
}

impl Inner {
    fn platform(&self) -> Result<Arc<Platform>, PhaseError> {
        self.platform.upgrade().ok_or(PhaseError::ContextUnavailable)
    }

    fn is_current(&self, run_id: RunId) -> bool {
        self.state.lock().run_id == Some(run_id)
    }

    fn enter_phase(&self, run_id: RunId, phase: AnalysisPhase) -> Result<(), PhaseError> {
        {
            let mut state = self.state.lock();
            if state.run_id != Some(run_id) {
                return Err(PhaseError::Cancelled);
            }
            state.phase = phase;
            self.status.send_replace(phase);
        }
        let mark = self.telemetry.lock().record_phase_memory(phase);
        info!(
            run_id = %run_id,
            phase = %phase,
            rss_mb = mark.memory.rss_mb,
            "Phase started"
        );
        Ok(())
    }

    fn emit(&self, run_id: RunId, callback: &PhaseCallback, message: &str, phase: AnalysisPhase) {
        if self.is_current(run_id) {
            callback(message, phase);
        }
    }

    fn hold_motion(&self, run_id: RunId, session: MotionSession) -> Result<(), PhaseError> {
        let mut state = self.state.lock();
        if state.run_id != Some(run_id) {
            drop(state);
            session.stop();
            return Err(PhaseError::Cancelled);
        }
        state.motion_session = Some(session);
        Ok(())
    }

    fn release_motion(&self, run_id: RunId) {
        let session = {
            let mut state = self.state.lock();
            if state.run_id == Some(run_id) {
                state.motion_session.take()
            } else {
                None
            }
        };
        if let Some(session) = session {
            session.stop();
        }
    }

    fn hold_location(&self, run_id: RunId, analyzer: Arc<LocationAnalyzer>) -> Result<(), PhaseError> {
        let mut state = self.state.lock();
        if state.run_id != Some(run_id) {
            return Err(PhaseError::Cancelled);
        }
        state.location = Some(analyzer);
        Ok(())
    }

    fn release_location(&self, run_id: RunId) {
        let analyzer = {
            let mut state = self.state.lock();
            if state.run_id == Some(run_id) {
                state.location.take()
            } else {
                None
            }
        };
        drop(analyzer);
    }

    /// Tear down and publish idle.
    fn cleanup(&self, only: Option<RunId>) -> bool {
        let had_run = self.teardown(only);
        self.publish_idle();
        had_run
    }

    /// Cancel pending work, release sensor and location resources, reset to `NONE`.
    ///
    /// With `only` set, does nothing unless that run is still current. Returns
    /// whether a run was torn down. Idle is not published; see `publish_idle`.
    fn teardown(&self, only: Option<RunId>) -> bool {
        let (had_run, task, session, location) = {
            let mut state = self.state.lock();
            if only.is_some() && state.run_id != only {
                return false;
            }
            if let Some(token) = state.cancel.take() {
                token.cancel();
            }
            let had_run = state.run_id.take().is_some();
            state.is_analyzing = false;
            state.phase = AnalysisPhase::None;
            (
                had_run,
                state.task.take(),
                state.motion_session.take(),
                state.location.take(),
            )
        };

        if let Some(session) = session {
            session.stop();
        }
        drop(location);
        self.sub_pipeline.stop_analysis();
        if let Some(platform) = self.platform.upgrade() {
            if platform.sensor_feed.is_active() {
                platform.sensor_feed.deactivate();
            }
        }
        if let Some(task) = task {
            task.abort();
        }

        debug!(had_run, "Cleanup complete");
        had_run
    }

    /// Announce `NONE` to `wait_until_idle`, unless a new run already started.
    fn publish_idle(&self) {
        let state = self.state.lock();
        if !state.is_analyzing {
            self.status.send_replace(AnalysisPhase::None);
        }
    }
}

async fn run(inner: Arc<Inner>, run_id: RunId, token: CancellationToken, callback: PhaseCallback) {
    match drive(&inner, run_id, &token, &callback).await {
        Ok(()) => info!(run_id = %run_id, "Analysis complete"),
        Err(PhaseError::Cancelled) => debug!(run_id = %run_id, "Analysis run cancelled"),
        Err(error) => {
            warn!(run_id = %run_id, "Analysis failed: {}", error);
            // The failure message goes out before idle is published
            if inner.teardown(Some(run_id)) {
                callback(&error.to_string(), error.reported_phase());
            }
            inner.publish_idle();
        }
    }
}

async fn cancellable<F: Future>(token: &CancellationToken, work: F) -> Result<F::Output, PhaseError> {
    tokio::select! {
        _ = token.cancelled() => Err(PhaseError::Cancelled),
        output = work => Ok(output),
    }
}

async fn drive(
    inner: &Arc<Inner>,
    run_id: RunId,
    token: &CancellationToken,
    callback: &PhaseCallback,
) -> Result<(), PhaseError> {
    // MOTION
    inner.enter_phase(run_id, AnalysisPhase::Motion)?;
    let (detector, window) = {
        let platform = inner.platform()?;
        (
            MotionDetector::new(platform.sensor_feed.clone(), platform.motion_history.clone()),
            platform.settings.motion_window,
        )
    };
    let on_labels = {
        let callback = callback.clone();
        let token = token.clone();
        let listener: LabelsListener = Arc::new(move |labels: &[MotionLabel]| {
            if !token.is_cancelled() {
                callback(
                    &format!("Current motions: {}", format_labels(labels)),
                    AnalysisPhase::Motion,
                );
            }
        });
        listener
    };
    inner.hold_motion(run_id, detector.start(on_labels)?)?;
    cancellable(token, tokio::time::sleep(window)).await?;
    inner.release_motion(run_id);

    // LOCATION
    inner.enter_phase(run_id, AnalysisPhase::Location)?;
    inner.emit(run_id, callback, "Starting location analysis...", AnalysisPhase::Location);
    let analyzer = {
        let platform = inner.platform()?;
        Arc::new(LocationAnalyzer::new(
            platform.scanner.clone(),
            platform.backends.location(),
            platform.location_slot.clone(),
        ))
    };
    inner.hold_location(run_id, analyzer.clone())?;
    let result = cancellable(token, analyzer.analyze()).await;
    drop(analyzer);
    inner.release_location(run_id);
    let location = result??;
    inner.emit(
        run_id,
        callback,
        &format!("Location analysis complete: {}", location.analysis),
        AnalysisPhase::Location,
    );

    // FUSION
    inner.enter_phase(run_id, AnalysisPhase::Fusion)?;
    inner.emit(run_id, callback, "Starting context fusion...", AnalysisPhase::Fusion);
    inner.release_location(run_id);
    let coordinator = {
        let platform = inner.platform()?;
        FusionCoordinator::new(&platform, inner.sub_pipeline.clone())
    };
    let fusion = AbortOnDropHandle::new(tokio::spawn(async move { coordinator.run().await }));
    let outcome = cancellable(token, fusion)
        .await?
        .map_err(|e| PhaseError::Fusion(e.to_string()))?;
    inner.emit(run_id, callback, &outcome.render(), AnalysisPhase::Fusion);

    // COMPLETE
    inner.enter_phase(run_id, AnalysisPhase::Complete)?;
    let report = {
        let platform = inner.platform()?;
        let telemetry = inner.telemetry.lock().telemetry().clone();
        let history = platform.motion_history.read_all();
        let location_text = platform.location_slot.read();
        let fusion_text = platform.fusion_slot.read();
        let report = build_report(&ReportInput {
            motion_history: &history,
            location_text: location_text.as_deref(),
            fusion_text: fusion_text.as_deref(),
            fusion: Some(&outcome),
            telemetry: &telemetry,
        });

        let artifact = report_artifact_name(&platform.settings.report_prefix, Utc::now());
        match platform.medium.write(&artifact, &report) {
            Ok(()) => info!(run_id = %run_id, %artifact, "Report written"),
            Err(e) => warn!(run_id = %run_id, %artifact, "Failed to write report: {}", e),
        }
        report
    };
    inner.emit(run_id, callback, &report, AnalysisPhase::Complete);
    inner.cleanup(Some(run_id));
    Ok(())
}
