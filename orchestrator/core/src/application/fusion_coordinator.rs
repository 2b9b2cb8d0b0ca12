// Copyright (c) 2026 contextfuse contributors
// SPDX-License-Identifier: AGPL-3.0
//! Fusion Coordinator
//!
//! Runs inside the FUSION phase:
//!
//! 1. read the current motion history and location slot
//! 2. run a motion-location pass and block on its one-shot completion latch
//!    (bounded by the latch timeout)
//! 3. when the pass produced output, call the on-device backend, then the
//!    remote backend, strictly one after the other, timing each call
//! 4. assemble everything into one text block and store it in the fusion slot
//!
//! A failing inference call only replaces its own result with a placeholder.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Implements the FUSION phase work

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::motion_location::{CombinedAnalysis, SubPipelineEvent};
use super::platform::Platform;
use crate::domain::llm::{GenerationOptions, LLMProvider};
use crate::domain::motion::MotionDetectionRecord;
use crate::infrastructure::repositories::{format_motion_history, BoundedHistoryStore, SingleSlotStore};

pub const NO_LOCATION_DATA: &str = "No location data";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Outcome of one inference call, with its wall-clock window.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedInference {
    pub backend: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub text: String,
    pub succeeded: bool,
}

impl TimedInference {
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    fn placeholder(backend: &str, reason: &str, at: DateTime<Utc>) -> Self {
        Self {
            backend: backend.to_string(),
            started_at: at,
            finished_at: at,
            text: format!("analysis failed: {}", reason),
            succeeded: false,
        }
    }

    pub fn timing_line(&self) -> String {
        format!(
            "[{}] start: {} | end: {} | duration: {} ms{}",
            self.backend,
            self.started_at.format(TIMESTAMP_FORMAT),
            self.finished_at.format(TIMESTAMP_FORMAT),
            self.duration_ms(),
            if self.succeeded { "" } else { " (failed)" }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FusionOutcome {
    pub motion_text: String,
    pub location_text: String,
    /// Combined-results text of the motion-location pass, or its failure notice
    pub narrative: String,
    pub on_device: TimedInference,
    pub remote: TimedInference,
}

impl FusionOutcome {
    pub fn inferences(&self) -> [&TimedInference; 2] {
        [&self.on_device, &self.remote]
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("=== Initial Analysis ===\n");
        out.push_str(&format!("Motion: {}\n", self.motion_text));
        out.push_str(&format!("Location: {}\n\n", self.location_text));
        out.push_str("=== Motion Location Analysis ===\n");
        out.push_str(&self.narrative);
        out.push_str("\n\n=== Context Fusion Analysis ===\n");
        for inference in self.inferences() {
            out.push_str(&inference.timing_line());
            out.push('\n');
            out.push_str(&inference.text);
            out.push_str("\n\n");
        }
        out.truncate(out.trim_end().len());
        out
    }
}

pub struct FusionCoordinator {
    motion_history: Arc<BoundedHistoryStore<MotionDetectionRecord>>,
    location_slot: Arc<SingleSlotStore>,
    fusion_slot: Arc<SingleSlotStore>,
    on_device: Arc<dyn LLMProvider>,
    remote: Arc<dyn LLMProvider>,
    remote_options: GenerationOptions,
    sub_pipeline: Arc<dyn CombinedAnalysis>,
    latch_timeout: Duration,
    tail_chars: usize,
}

impl FusionCoordinator {
    pub fn new(platform: &Platform, sub_pipeline: Arc<dyn CombinedAnalysis>) -> Self {
        Self {
            motion_history: platform.motion_history.clone(),
            location_slot: platform.location_slot.clone(),
            fusion_slot: platform.fusion_slot.clone(),
            on_device: platform.backends.on_device(),
            remote: platform.backends.remote(),
            remote_options: platform.backends.remote_options().clone(),
            sub_pipeline,
            latch_timeout: platform.settings.latch_timeout,
            tail_chars: platform.settings.prompt_tail_chars,
        }
    }

    pub async fn run(&self) -> FusionOutcome {
        let (motion_text, location_text) = self.read_context();

        // Stop the pass on every exit, including cancellation of this future
        let sub_pipeline = self.sub_pipeline.clone();
        let _stop_guard = scopeguard::guard((), move |_| sub_pipeline.stop_analysis());

        let narrative = self.await_combined_results().await;
        self.sub_pipeline.stop_analysis();

        let (narrative, on_device, remote) = match narrative {
            Ok(text) if !text.trim().is_empty() => {
                // The pass refreshed both stores
                let (motion_now, location_now) = self.read_context();
                let prompt = build_fusion_prompt(&motion_now, &location_now, self.tail_chars);
                debug!(%prompt, "Sending fusion prompt");

                let on_device = timed_call(
                    "on-device",
                    self.on_device.as_ref(),
                    &prompt,
                    &GenerationOptions::default(),
                )
                .await;
                let remote =
                    timed_call("remote", self.remote.as_ref(), &prompt, &self.remote_options).await;
                (text, on_device, remote)
            }
            Ok(_) => {
                let reason = "motion-location analysis produced no output";
                let now = Utc::now();
                (
                    format!("Additional analysis failed: {}", reason),
                    TimedInference::placeholder("on-device", reason, now),
                    TimedInference::placeholder("remote", reason, now),
                )
            }
            Err(reason) => {
                warn!("Motion-location pass did not complete: {}", reason);
                let now = Utc::now();
                (
                    format!("Additional analysis failed: {}", reason),
                    TimedInference::placeholder("on-device", &reason, now),
                    TimedInference::placeholder("remote", &reason, now),
                )
            }
        };

        let outcome = FusionOutcome {
            motion_text,
            location_text,
            narrative,
            on_device,
            remote,
        };
        if !self.fusion_slot.write(&outcome.render()) {
            warn!("Fusion result was not persisted");
        }
        outcome
    }

    fn read_context(&self) -> (String, String) {
        (
            format_motion_history(&self.motion_history.read_all()),
            self.location_slot
                .read()
                .unwrap_or_else(|| NO_LOCATION_DATA.to_string()),
        )
    }

    /// Start the pass and wait on its one-shot latch.
    async fn await_combined_results(&self) -> Result<String, String> {
        let (tx, mut rx) = oneshot::channel::<Result<String, String>>();
        let latch = Arc::new(Mutex::new(Some(tx)));

        let fulfil = latch.clone();
        let started = self.sub_pipeline.start_analysis(Arc::new(move |event| {
            let outcome = match event {
                SubPipelineEvent::Progress(message) => {
                    debug!(%message, "Motion-location progress");
                    return;
                }
                SubPipelineEvent::CombinedResults(text) => Ok(text),
                SubPipelineEvent::Failed(reason) => Err(reason),
            };
            // Only the first outcome is delivered
            if let Some(tx) = fulfil.lock().take() {
                let _ = tx.send(outcome);
            }
        }));

        if !started {
            // The listener has already been told why; prefer its reason
            if let Ok(outcome) = rx.try_recv() {
                return outcome;
            }
            return Err("motion-location analysis could not start".into());
        }
        info!(timeout_secs = self.latch_timeout.as_secs(), "Waiting for motion-location results");

        match tokio::time::timeout(self.latch_timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err("motion-location analysis ended without results".into()),
            Err(_) => {
                latch.lock().take();
                Err(format!(
                    "motion-location analysis timed out after {}s",
                    self.latch_timeout.as_secs()
                ))
            }
        }
    }
}

async fn timed_call(
    backend: &str,
    provider: &dyn LLMProvider,
    prompt: &str,
    options: &GenerationOptions,
) -> TimedInference {
    let started_at = Utc::now();
    let result = provider.generate(prompt, options).await;
    let finished_at = Utc::now();

    let (text, succeeded) = match result {
        Ok(response) => (response.text, true),
        Err(e) => {
            warn!(backend, "Fusion inference failed: {}", e);
            (format!("analysis failed: {}", e), false)
        }
    };
    let timed = TimedInference {
        backend: backend.to_string(),
        started_at,
        finished_at,
        text,
        succeeded,
    };
    info!(backend, duration_ms = timed.duration_ms(), succeeded, "Fusion inference finished");
    timed
}

/// Last `n` characters of `text`, on a char boundary.
pub fn tail(text: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match text.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

pub fn build_fusion_prompt(motion: &str, location: &str, tail_chars: usize) -> String {
    format!(
        "Select the most probable motion with location and motion context within 50 words:\nMotion: {}\nLocation: {}",
        tail(motion, tail_chars),
        tail(location, tail_chars)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_tail_respects_char_boundaries() {
        assert_eq!(tail("abcdef", 3), "def");
        assert_eq!(tail("ab", 5), "ab");
        assert_eq!(tail("caféé", 2), "éé");
        assert_eq!(tail("abc", 0), "");
    }

    #[test]
    fn test_fusion_prompt_uses_last_characters() {
        let motion = format!("{}walking", "x".repeat(500));
        let prompt = build_fusion_prompt(&motion, "gym", 10);
        assert_eq!(
            prompt,
            "Select the most probable motion with location and motion context within 50 words:\nMotion: xxxwalking\nLocation: gym"
        );
    }

    #[test]
    fn test_render_sections_in_order() {
        let at = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();
        let outcome = FusionOutcome {
            motion_text: "m".into(),
            location_text: "l".into(),
            narrative: "n".into(),
            on_device: TimedInference {
                backend: "on-device".into(),
                started_at: at,
                finished_at: at + chrono::Duration::milliseconds(1500),
                text: "local answer".into(),
                succeeded: true,
            },
            remote: TimedInference::placeholder("remote", "timeout", at),
        };

        let rendered = outcome.render();
        let initial = rendered.find("=== Initial Analysis ===").unwrap();
        let narrative = rendered.find("=== Motion Location Analysis ===").unwrap();
        let fusion = rendered.find("=== Context Fusion Analysis ===").unwrap();
        assert!(initial < narrative && narrative < fusion);
        assert!(rendered.contains("[on-device] start: 2026-05-01 09:00:00.000 | end: 2026-05-01 09:00:01.500 | duration: 1500 ms\nlocal answer"));
        assert!(rendered.ends_with("duration: 0 ms (failed)\nanalysis failed: timeout"));
    }
}
