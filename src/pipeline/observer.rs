//! Pipeline observation
//!
//! The pipeline never configures logging itself. Callers inject a
//! [`PipelineObserver`]; the default forwards everything to `tracing`.

use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dsp::{SkipReason, StageKind, StageOutcome};

/// Summary of one completed stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: StageKind,
    /// Sample count entering the stage (bytes for encode)
    pub input_len: usize,
    /// Sample count leaving the stage (bytes for encode)
    pub output_len: usize,
    #[serde(with = "duration_micros")]
    pub elapsed: Duration,
    /// What the mono stages did, if anything
    pub outcome: Option<StageOutcome>,
}

/// Receives progress callbacks from a pipeline run
///
/// All methods default to doing nothing.
pub trait PipelineObserver: Send + Sync {
    fn stage_started(&self, _stage: StageKind) {}

    fn stage_finished(&self, _report: &StageReport) {}

    fn stage_skipped(&self, _stage: StageKind, _reason: &SkipReason) {}

    /// A packet failed to decode and was dropped
    fn packet_skipped(&self, _packet_index: usize, _reason: &str) {}

    /// The decoding context was torn down
    fn decoder_released(&self) {}
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl PipelineObserver for NullObserver {}

/// Emits every event as a `tracing` event
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn stage_started(&self, stage: StageKind) {
        tracing::debug!(stage = %stage, "stage started");
    }

    fn stage_finished(&self, report: &StageReport) {
        tracing::info!(
            stage = %report.stage,
            input_len = report.input_len,
            output_len = report.output_len,
            elapsed_us = report.elapsed.as_micros() as u64,
            outcome = ?report.outcome,
            "stage finished"
        );
    }

    fn stage_skipped(&self, stage: StageKind, reason: &SkipReason) {
        tracing::info!(stage = %stage, reason = %reason, "stage skipped");
    }

    fn packet_skipped(&self, packet_index: usize, reason: &str) {
        tracing::warn!(packet_index, reason, "decode error, skipping packet");
    }

    fn decoder_released(&self) {
        tracing::trace!("decoder released");
    }
}

/// Event captured by [`RecordingObserver`]
#[derive(Debug, Clone, PartialEq)]
pub enum ObserverEvent {
    Started(StageKind),
    Finished(StageReport),
    Skipped(StageKind, SkipReason),
    PacketSkipped(usize),
    DecoderReleased,
}

/// Keeps every event in memory, in order
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObserverEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events seen so far
    pub fn events(&self) -> Vec<ObserverEvent> {
        self.lock().clone()
    }

    /// Reports of every finished stage
    pub fn reports(&self) -> Vec<StageReport> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                ObserverEvent::Finished(report) => Some(report.clone()),
                _ => None,
            })
            .collect()
    }

    /// Stages that fell back to a no-op
    pub fn skipped(&self) -> Vec<(StageKind, SkipReason)> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                ObserverEvent::Skipped(stage, reason) => Some((*stage, reason.clone())),
                _ => None,
            })
            .collect()
    }

    /// Number of times a decoding context was released
    pub fn decoder_releases(&self) -> usize {
        self.lock()
            .iter()
            .filter(|event| matches!(event, ObserverEvent::DecoderReleased))
            .count()
    }

    fn push(&self, event: ObserverEvent) {
        self.lock().push(event);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ObserverEvent>> {
        // A poisoned log is still a readable log
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PipelineObserver for RecordingObserver {
    fn stage_started(&self, stage: StageKind) {
        self.push(ObserverEvent::Started(stage));
    }

    fn stage_finished(&self, report: &StageReport) {
        self.push(ObserverEvent::Finished(report.clone()));
    }

    fn stage_skipped(&self, stage: StageKind, reason: &SkipReason) {
        self.push(ObserverEvent::Skipped(stage, reason.clone()));
    }

    fn packet_skipped(&self, packet_index: usize, _reason: &str) {
        self.push(ObserverEvent::PacketSkipped(packet_index));
    }

    fn decoder_released(&self) {
        self.push(ObserverEvent::DecoderReleased);
    }
}

mod duration_micros {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_micros() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_micros)
    }
}
