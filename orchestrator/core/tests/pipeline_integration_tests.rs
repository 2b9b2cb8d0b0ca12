// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for the phase orchestrator
//!
//! These tests drive full runs against in-memory collaborators:
//! 1. Phase ordering and callback messages on success
//! 2. Report artifact persistence
//! 3. Bounded fusion latch when the nested pass never reports
//! 4. Cancellation and failure paths back to NONE
//! 5. Fusion placeholders when one backend fails

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use contextfuse_core::application::{
    CombinedAnalysis, PhaseOrchestrator, Platform, PlatformComponents, SubPipelineEvent,
    SubPipelineListener,
};
use contextfuse_core::domain::llm::{
    FinishReason, GenerationOptions, GenerationResponse, LLMError, LLMProvider, TokenUsage,
};
use contextfuse_core::domain::phase::{AnalysisPhase, PhaseCallback};
use contextfuse_core::domain::pipeline_config::{LocationBackend, PipelineConfigManifest};
use contextfuse_core::domain::sensor::SensorReading;
use contextfuse_core::domain::telemetry::{MemoryProbe, MemorySnapshot};
use contextfuse_core::infrastructure::llm::ProviderRegistry;
use contextfuse_core::infrastructure::sensors::{ReplayEvent, ReplaySensorFeed};
use contextfuse_core::infrastructure::storage::InMemoryMedium;
use contextfuse_core::infrastructure::wireless::StaticScanner;

struct FixedProbe;

impl MemoryProbe for FixedProbe {
    fn snapshot(&self) -> MemorySnapshot {
        MemorySnapshot {
            heap_used_mb: 10,
            heap_max_mb: 512,
            native_heap_mb: 20,
            pss_mb: 80,
            rss_mb: 120,
        }
    }
}

/// Backend returning a fixed answer (or error) after an optional delay, counting calls.
struct ScriptedBackend {
    answer: Result<&'static str, &'static str>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    fn answering(answer: &'static str) -> Arc<Self> {
        Self::answering_after(answer, Duration::ZERO)
    }

    fn answering_after(answer: &'static str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            answer: Ok(answer),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(reason: &'static str) -> Arc<Self> {
        Arc::new(Self {
            answer: Err(reason),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LLMProvider for ScriptedBackend {
    async fn generate(
        &self,
        _prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<GenerationResponse, LLMError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.answer {
            Ok(text) => Ok(GenerationResponse {
                text: text.to_string(),
                usage: TokenUsage::default(),
                provider: "scripted".into(),
                model: "scripted".into(),
                finish_reason: FinishReason::Stop,
            }),
            Err(reason) => Err(LLMError::Provider(reason.to_string())),
        }
    }

    async fn health_check(&self) -> Result<(), LLMError> {
        Ok(())
    }
}

/// Nested pass that either accepts and stays silent, or refuses to start.
struct SilentPass {
    refuse_with: Option<&'static str>,
    stops: AtomicUsize,
}

impl CombinedAnalysis for SilentPass {
    fn start_analysis(&self, listener: SubPipelineListener) -> bool {
        match self.refuse_with {
            Some(reason) => {
                listener(SubPipelineEvent::Failed(reason.to_string()));
                false
            }
            None => {
                listener(SubPipelineEvent::Progress("Starting motion detection phase...".into()));
                true
            }
        }
    }

    fn stop_analysis(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Clone, Default)]
struct Transcript {
    entries: Arc<Mutex<Vec<(String, AnalysisPhase)>>>,
}

impl Transcript {
    fn callback(&self) -> PhaseCallback {
        let entries = self.entries.clone();
        Arc::new(move |message: &str, phase: AnalysisPhase| {
            entries.lock().push((message.to_string(), phase));
        })
    }

    fn entries(&self) -> Vec<(String, AnalysisPhase)> {
        self.entries.lock().clone()
    }

    fn phases(&self) -> Vec<AnalysisPhase> {
        self.entries.lock().iter().map(|(_, phase)| *phase).collect()
    }

    fn find(&self, phase: AnalysisPhase, needle: &str) -> Option<String> {
        self.entries
            .lock()
            .iter()
            .find(|(message, p)| *p == phase && message.contains(needle))
            .map(|(message, _)| message.clone())
    }
}

struct Harness {
    platform: Arc<Platform>,
    medium: InMemoryMedium,
    on_device: Arc<ScriptedBackend>,
    remote: Arc<ScriptedBackend>,
}

fn stationary_recording() -> Vec<ReplayEvent> {
    vec![
        ReplayEvent {
            offset_ms: 100,
            reading: SensorReading::StepCounter(0),
        },
        ReplayEvent {
            offset_ms: 500,
            reading: SensorReading::Pressure(1013.25),
        },
    ]
}

/// Collaborators for one harness; `Default` is a stationary run with both backends answering.
struct Setup {
    config: PipelineConfigManifest,
    on_device: Arc<ScriptedBackend>,
    remote: Arc<ScriptedBackend>,
    location_backend: LocationBackend,
    networks: Vec<String>,
    recording: Vec<ReplayEvent>,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            config: PipelineConfigManifest::default(),
            on_device: ScriptedBackend::answering("on-device: stationary at a cafe"),
            remote: ScriptedBackend::answering("a coffee shop"),
            location_backend: LocationBackend::Remote,
            networks: vec!["cafe-guest".into(), "Starbucks WiFi".into()],
            recording: stationary_recording(),
        }
    }
}

fn harness_with(setup: Setup) -> Harness {
    let medium = InMemoryMedium::new();
    let platform = Arc::new(Platform::new(
        PlatformComponents {
            medium: Arc::new(medium.clone()),
            sensor_feed: Arc::new(ReplaySensorFeed::new(setup.recording)),
            scanner: Arc::new(StaticScanner::new(setup.networks)),
            backends: ProviderRegistry::new(
                setup.on_device.clone(),
                setup.remote.clone(),
                setup.location_backend,
            ),
            memory_probe: Arc::new(FixedProbe),
        },
        &setup.config,
    ));
    Harness {
        platform,
        medium,
        on_device: setup.on_device,
        remote: setup.remote,
    }
}

fn harness() -> Harness {
    harness_with(Setup::default())
}

#[tokio::test(start_paused = true)]
async fn test_full_run_reports_every_phase_in_order() {
    let h = harness();
    let orchestrator = PhaseOrchestrator::new(&h.platform);
    let transcript = Transcript::default();

    assert!(orchestrator.start_analysis(transcript.callback()).is_some());
    orchestrator.wait_until_idle().await;

    assert_eq!(orchestrator.get_current_phase(), AnalysisPhase::None);
    assert!(!orchestrator.is_analyzing());

    // Phases never go backwards
    let phases = transcript.phases();
    let mut sorted = phases.clone();
    sorted.sort_by_key(|p| *p as u8);
    assert_eq!(phases, sorted);
    assert_eq!(phases.last(), Some(&AnalysisPhase::Complete));

    assert!(transcript
        .find(AnalysisPhase::Motion, "Current motions: stationary")
        .is_some());
    assert!(transcript
        .find(AnalysisPhase::Location, "Starting location analysis...")
        .is_some());
    assert!(transcript
        .find(AnalysisPhase::Location, "Location analysis complete: a coffee shop")
        .is_some());
    assert!(transcript
        .find(AnalysisPhase::Fusion, "Starting context fusion...")
        .is_some());

    let fusion = transcript
        .find(AnalysisPhase::Fusion, "=== Context Fusion Analysis ===")
        .expect("fusion block delivered");
    assert!(fusion.contains("=== Motion Location Analysis ==="));
    assert!(fusion.contains("on-device: stationary at a cafe"));
    assert!(!fusion.contains("Additional analysis failed"));

    let report = transcript
        .find(AnalysisPhase::Complete, "=== Context Analysis Report ===")
        .expect("report delivered");
    assert!(report.contains("--- Memory Deltas ---"));

    // Location inference ran twice (LOCATION and the nested pass) plus one remote fusion call
    assert_eq!(h.remote.calls(), 3);
    assert_eq!(h.on_device.calls(), 1);
    assert!(!h.platform.sensor_feed.is_active());
}

#[tokio::test(start_paused = true)]
async fn test_report_artifact_is_persisted() {
    let h = harness();
    let orchestrator = PhaseOrchestrator::new(&h.platform);
    let transcript = Transcript::default();

    orchestrator.start_analysis(transcript.callback());
    orchestrator.wait_until_idle().await;

    let slots = h.medium.slots.lock();
    let (name, contents) = slots
        .iter()
        .find(|(name, _)| name.starts_with("analysis_report_") && name.ends_with(".txt"))
        .expect("report artifact written");
    let report = transcript
        .find(AnalysisPhase::Complete, "=== Context Analysis Report ===")
        .unwrap_or_default();
    assert_eq!(contents, &report, "artifact {name} differs from delivered report");
    assert!(slots.contains_key("fusion_result.txt"));
    assert!(slots.contains_key("motion_detections.json"));
}

#[tokio::test(start_paused = true)]
async fn test_silent_sub_pipeline_hits_bounded_latch() {
    let mut config = PipelineConfigManifest::default();
    config.spec.fusion.latch_timeout_seconds = 5;
    let h = harness_with(Setup {
        config,
        remote: ScriptedBackend::answering("a park"),
        networks: Vec::new(),
        recording: Vec::new(),
        ..Setup::default()
    });
    let pass = Arc::new(SilentPass {
        refuse_with: None,
        stops: AtomicUsize::new(0),
    });
    let orchestrator = PhaseOrchestrator::with_sub_pipeline(&h.platform, pass.clone());
    let transcript = Transcript::default();

    orchestrator.start_analysis(transcript.callback());
    orchestrator.wait_until_idle().await;

    let fusion = transcript
        .find(AnalysisPhase::Fusion, "=== Context Fusion Analysis ===")
        .expect("fusion still reported");
    assert!(fusion.contains("Additional analysis failed: motion-location analysis timed out after 5s"));
    assert!(fusion.contains("analysis failed: motion-location analysis timed out after 5s"));
    assert_eq!(h.on_device.calls(), 0);
    // Only the LOCATION phase reached the remote backend
    assert_eq!(h.remote.calls(), 1);
    assert!(pass.stops.load(Ordering::SeqCst) >= 1);
    assert!(transcript
        .find(AnalysisPhase::Complete, "=== Context Analysis Report ===")
        .is_some());
}

#[tokio::test(start_paused = true)]
async fn test_refused_sub_pipeline_uses_its_reason() {
    let h = harness_with(Setup {
        remote: ScriptedBackend::answering("an office"),
        recording: Vec::new(),
        ..Setup::default()
    });
    let pass = Arc::new(SilentPass {
        refuse_with: Some("Analysis already in progress"),
        stops: AtomicUsize::new(0),
    });
    let orchestrator = PhaseOrchestrator::with_sub_pipeline(&h.platform, pass);
    let transcript = Transcript::default();

    orchestrator.start_analysis(transcript.callback());
    orchestrator.wait_until_idle().await;

    assert!(transcript
        .find(AnalysisPhase::Fusion, "Additional analysis failed: Analysis already in progress")
        .is_some());
    assert_eq!(h.on_device.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_location_failure_resets_to_none() {
    let h = harness_with(Setup {
        remote: ScriptedBackend::failing("backend offline"),
        ..Setup::default()
    });
    let orchestrator = PhaseOrchestrator::new(&h.platform);
    let transcript = Transcript::default();

    orchestrator.start_analysis(transcript.callback());
    orchestrator.wait_until_idle().await;

    let (message, phase) = transcript.entries().pop().expect("failure reported");
    assert_eq!(phase, AnalysisPhase::Location);
    assert!(message.starts_with("Location analysis failed:"));
    assert!(message.contains("backend offline"));
    assert_eq!(orchestrator.get_current_phase(), AnalysisPhase::None);
    assert!(transcript.find(AnalysisPhase::Fusion, "").is_none());
    assert!(transcript.find(AnalysisPhase::Complete, "").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_stop_mid_motion_silences_the_run() {
    let h = harness();
    let orchestrator = PhaseOrchestrator::new(&h.platform);
    let transcript = Transcript::default();

    orchestrator.start_analysis(transcript.callback());
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(orchestrator.get_current_phase(), AnalysisPhase::Motion);

    orchestrator.stop_analysis();
    orchestrator.stop_analysis();
    assert_eq!(orchestrator.get_current_phase(), AnalysisPhase::None);
    assert!(!h.platform.sensor_feed.is_active());

    let seen = transcript.entries().len();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(transcript.entries().len(), seen);
    assert_eq!(h.remote.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_orchestrator_can_run_again_after_completion() {
    let h = harness();
    let orchestrator = PhaseOrchestrator::new(&h.platform);

    let first = Transcript::default();
    let first_run = orchestrator.start_analysis(first.callback());
    orchestrator.wait_until_idle().await;

    let second = Transcript::default();
    let second_run = orchestrator.start_analysis(second.callback());
    orchestrator.wait_until_idle().await;

    assert!(first_run.is_some() && second_run.is_some());
    assert_ne!(first_run, second_run);
    assert!(second
        .find(AnalysisPhase::Complete, "=== Context Analysis Report ===")
        .is_some());

    orchestrator.close();
    let refused = Transcript::default();
    assert!(orchestrator.start_analysis(refused.callback()).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_on_device_failure_leaves_placeholder_and_completes() {
    let h = harness_with(Setup {
        on_device: ScriptedBackend::failing("engine crashed"),
        ..Setup::default()
    });
    let orchestrator = PhaseOrchestrator::new(&h.platform);
    let transcript = Transcript::default();

    orchestrator.start_analysis(transcript.callback());
    orchestrator.wait_until_idle().await;

    let fusion = transcript
        .find(AnalysisPhase::Fusion, "=== Context Fusion Analysis ===")
        .expect("fusion block delivered");
    assert!(fusion.contains("[on-device] start:"));
    assert!(fusion.contains("(failed)\nanalysis failed: Provider error: engine crashed"));
    let remote_block = fusion.split("[remote] start:").nth(1).expect("remote inference rendered");
    assert!(!remote_block.contains("(failed)"));
    assert!(remote_block.contains("a coffee shop"));

    assert_eq!(h.remote.calls(), 3);
    assert_eq!(h.on_device.calls(), 1);
    assert_eq!(transcript.phases().last(), Some(&AnalysisPhase::Complete));
    assert!(transcript
        .find(AnalysisPhase::Complete, "=== Context Analysis Report ===")
        .is_some());
}

#[tokio::test(start_paused = true)]
async fn test_remote_failure_leaves_placeholder_and_completes() {
    let h = harness_with(Setup {
        on_device: ScriptedBackend::answering("on-device: seated indoors"),
        remote: ScriptedBackend::failing("HTTP 503: unavailable"),
        location_backend: LocationBackend::OnDevice,
        ..Setup::default()
    });
    let orchestrator = PhaseOrchestrator::new(&h.platform);
    let transcript = Transcript::default();

    orchestrator.start_analysis(transcript.callback());
    orchestrator.wait_until_idle().await;

    assert!(transcript
        .find(AnalysisPhase::Location, "Location analysis complete: on-device: seated indoors")
        .is_some());
    let fusion = transcript
        .find(AnalysisPhase::Fusion, "=== Context Fusion Analysis ===")
        .expect("fusion block delivered");
    let remote_block = fusion.split("[remote] start:").nth(1).expect("remote inference rendered");
    assert!(remote_block.contains("(failed)\nanalysis failed: Provider error: HTTP 503: unavailable"));
    let on_device_block = fusion
        .split("[on-device] start:")
        .nth(1)
        .and_then(|rest| rest.split("[remote]").next())
        .expect("on-device inference rendered");
    assert!(!on_device_block.contains("(failed)"));

    // Both location passes and the on-device fusion call ran locally
    assert_eq!(h.on_device.calls(), 3);
    assert_eq!(h.remote.calls(), 1);
    assert!(transcript
        .find(AnalysisPhase::Complete, "=== Context Analysis Report ===")
        .is_some());
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_fusion_wait_releases_the_feed() {
    let h = harness();
    let orchestrator = PhaseOrchestrator::new(&h.platform);
    let transcript = Transcript::default();

    orchestrator.start_analysis(transcript.callback());
    // Past the 10s motion window; the nested pass is inside its own motion window
    tokio::time::sleep(Duration::from_secs(13)).await;
    assert_eq!(orchestrator.get_current_phase(), AnalysisPhase::Fusion);
    assert!(h.platform.sensor_feed.is_active());

    orchestrator.stop_analysis();
    assert_eq!(orchestrator.get_current_phase(), AnalysisPhase::None);
    assert!(!orchestrator.is_analyzing());
    assert!(!h.platform.sensor_feed.is_active());

    let seen = transcript.entries().len();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(transcript.entries().len(), seen);
    assert_eq!(h.on_device.calls(), 0);

    let next = Transcript::default();
    assert!(orchestrator.start_analysis(next.callback()).is_some());
    orchestrator.wait_until_idle().await;
    assert!(next
        .find(AnalysisPhase::Complete, "=== Context Analysis Report ===")
        .is_some());
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_location_silences_the_run() {
    let h = harness_with(Setup {
        remote: ScriptedBackend::answering_after("a library", Duration::from_secs(5)),
        ..Setup::default()
    });
    let orchestrator = PhaseOrchestrator::new(&h.platform);
    let transcript = Transcript::default();

    orchestrator.start_analysis(transcript.callback());
    tokio::time::sleep(Duration::from_secs(12)).await;
    assert_eq!(orchestrator.get_current_phase(), AnalysisPhase::Location);
    assert_eq!(h.remote.calls(), 1);

    orchestrator.stop_analysis();
    assert_eq!(orchestrator.get_current_phase(), AnalysisPhase::None);
    assert!(!h.platform.sensor_feed.is_active());

    let seen = transcript.entries().len();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(transcript.entries().len(), seen);
    assert!(transcript.find(AnalysisPhase::Location, "Location analysis complete").is_none());
    assert!(transcript.find(AnalysisPhase::Fusion, "").is_none());
    assert_eq!(h.remote.calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failure_message_arrives_before_idle() {
    let mut config = PipelineConfigManifest::default();
    config.spec.motion.window_seconds = 1;
    let h = harness_with(Setup {
        config,
        remote: ScriptedBackend::failing("backend offline"),
        ..Setup::default()
    });
    let orchestrator = PhaseOrchestrator::new(&h.platform);
    let transcript = Transcript::default();

    orchestrator.start_analysis(transcript.callback());
    tokio::time::timeout(Duration::from_secs(30), orchestrator.wait_until_idle())
        .await
        .expect("run reaches NONE");

    // Nothing further is delivered once idle has been observed
    let (message, phase) = transcript.entries().pop().expect("failure reported");
    assert_eq!(phase, AnalysisPhase::Location);
    assert!(message.starts_with("Location analysis failed:"));
    assert!(!orchestrator.is_analyzing());
}
