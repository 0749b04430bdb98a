//! Stage trait definition
//!
//! Base trait for the in-memory processing stages that sit between the
//! channel reducer and the WAV encoder.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::MonoBuffer;

/// Identifies a pipeline step in reports and observer callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Decode,
    Downmix,
    HighPass,
    Trim,
    Normalize,
    Encode,
    Validate,
}

impl StageKind {
    /// Short identifier used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Decode => "decode",
            StageKind::Downmix => "downmix",
            StageKind::HighPass => "high_pass",
            StageKind::Trim => "trim",
            StageKind::Normalize => "normalize",
            StageKind::Encode => "encode",
            StageKind::Validate => "validate",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a stage left its input untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Stage switched off in configuration
    Disabled,
    /// No sample rose above the silence threshold
    NoSignalAboveThreshold,
    /// Trimming would have kept less than the retention ratio
    WouldRemoveTooMuch { kept: usize, original: usize },
    /// RMS below the silence floor, gain would only amplify noise
    BelowSilenceFloor { rms: f32 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Disabled => write!(f, "disabled"),
            SkipReason::NoSignalAboveThreshold => write!(f, "no signal above threshold"),
            SkipReason::WouldRemoveTooMuch { kept, original } => {
                write!(f, "trim would keep only {} of {} samples", kept, original)
            }
            SkipReason::BelowSilenceFloor { rms } => {
                write!(f, "rms {:.6} below silence floor", rms)
            }
        }
    }
}

/// What a stage did to the buffer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageDetail {
    Filtered {
        cutoff_hz: f32,
        alpha: f32,
    },
    Trimmed {
        leading: usize,
        trailing: usize,
    },
    Normalized {
        gain: f32,
        /// Gain was reduced from the RMS target to respect the peak ceiling
        peak_limited: bool,
        /// Samples reshaped by the soft knee
        knee_samples: usize,
        /// Samples caught by the final hard clamp
        clamped_samples: usize,
    },
}

/// Result of running a stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageOutcome {
    Applied(StageDetail),
    Skipped(SkipReason),
}

impl StageOutcome {
    /// Check if the stage fell back to a no-op
    pub fn is_skipped(&self) -> bool {
        matches!(self, StageOutcome::Skipped(_))
    }
}

/// A mono processing stage
///
/// Stages take the buffer by value and hand back the buffer that supersedes
/// it. A stage that cannot do anything useful returns its input unchanged
/// together with a [`SkipReason`] instead of failing.
pub trait Stage: Send + Sync {
    /// Which step this is
    fn kind(&self) -> StageKind;

    /// Check if the stage is enabled
    fn is_enabled(&self) -> bool;

    /// Process the buffer
    fn process(&self, buffer: MonoBuffer) -> (MonoBuffer, StageOutcome);

    /// Process, or pass through with [`SkipReason::Disabled`] when disabled
    fn run(&self, buffer: MonoBuffer) -> (MonoBuffer, StageOutcome) {
        if !self.is_enabled() {
            return (buffer, StageOutcome::Skipped(SkipReason::Disabled));
        }
        self.process(buffer)
    }
}
