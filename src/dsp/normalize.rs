//! Loudness normalization with soft-knee peak limiting
//!
//! Brings a recording to a target RMS level without letting the loudest
//! sample cross the peak ceiling:
//!
//! 1. Measure RMS and peak. Below the silence floor the buffer is returned
//!    untouched (no divide-by-near-zero, no noise-floor amplification).
//! 2. `gain = target_rms / rms`, reduced to `ceiling / peak` if that gain
//!    would push the peak past the ceiling.
//! 3. Apply the gain.
//! 4. Above `knee_ratio * ceiling`, compress the excess with an exponential
//!    saturation curve that approaches the ceiling smoothly.
//! 5. Hard clamp to the ceiling as a last resort.

use serde::{Deserialize, Serialize};

use super::stage::{SkipReason, Stage, StageDetail, StageKind, StageOutcome};
use crate::engine::buffer::{db_to_linear, LevelStats};
use crate::engine::MonoBuffer;
use crate::error::{Result, VoicePrepError};

// ============================================================================
// Constants
// ============================================================================

/// Default target RMS in dBFS
pub const DEFAULT_TARGET_RMS_DB: f32 = -18.0;

/// Default peak ceiling in dBFS
pub const DEFAULT_PEAK_CEILING_DB: f32 = -3.0;

/// RMS below which normalization is skipped (linear)
pub const DEFAULT_SILENCE_FLOOR: f32 = 1e-4;

// ============================================================================
// Parameters
// ============================================================================

/// Loudness parameters
///
/// The defaults follow one voice-cloning provider's recommendations. They are
/// tuning values, not physical constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoudnessParams {
    pub enabled: bool,
    /// Target RMS level in dBFS
    pub target_rms_db: f32,
    /// Peak ceiling in dBFS
    pub peak_ceiling_db: f32,
    /// Knee start as a fraction of the ceiling
    pub knee_ratio: f32,
    /// Steepness of the saturation curve above the knee (4 = 4:1)
    pub compression_ratio: f32,
    /// RMS below which the buffer is left alone (linear)
    pub silence_floor: f32,
}

impl Default for LoudnessParams {
    fn default() -> Self {
        Self {
            enabled: true,
            target_rms_db: DEFAULT_TARGET_RMS_DB,
            peak_ceiling_db: DEFAULT_PEAK_CEILING_DB,
            knee_ratio: 0.85,
            compression_ratio: 4.0,
            silence_floor: DEFAULT_SILENCE_FLOOR,
        }
    }
}

impl LoudnessParams {
    /// Validate parameters are within range
    pub fn validate(&self) -> Result<()> {
        if !self.target_rms_db.is_finite() || self.target_rms_db > 0.0 {
            return Err(VoicePrepError::invalid_param(
                "loudness.target_rms_db",
                self.target_rms_db,
                "<= 0 dBFS",
            ));
        }
        if !self.peak_ceiling_db.is_finite() || self.peak_ceiling_db > 0.0 {
            return Err(VoicePrepError::invalid_param(
                "loudness.peak_ceiling_db",
                self.peak_ceiling_db,
                "<= 0 dBFS",
            ));
        }
        if !(self.knee_ratio > 0.0 && self.knee_ratio < 1.0) {
            return Err(VoicePrepError::invalid_param(
                "loudness.knee_ratio",
                self.knee_ratio,
                "0 < ratio < 1",
            ));
        }
        if !self.compression_ratio.is_finite() || self.compression_ratio <= 0.0 {
            return Err(VoicePrepError::invalid_param(
                "loudness.compression_ratio",
                self.compression_ratio,
                "> 0",
            ));
        }
        if !self.silence_floor.is_finite() || self.silence_floor < 0.0 {
            return Err(VoicePrepError::invalid_param(
                "loudness.silence_floor",
                self.silence_floor,
                ">= 0",
            ));
        }
        Ok(())
    }

    /// Target RMS (linear)
    pub fn target_rms_linear(&self) -> f32 {
        db_to_linear(self.target_rms_db)
    }

    /// Peak ceiling (linear)
    pub fn peak_ceiling_linear(&self) -> f32 {
        db_to_linear(self.peak_ceiling_db)
    }
}

// ============================================================================
// Gain Computation
// ============================================================================

/// Gain chosen for a buffer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainDecision {
    pub gain: f32,
    /// The RMS-driven gain was reduced to keep the peak under the ceiling
    pub peak_limited: bool,
}

/// Choose the gain for measured levels
///
/// `None` when the RMS is under the silence floor.
pub fn compute_gain(stats: &LevelStats, params: &LoudnessParams) -> Option<GainDecision> {
    if stats.rms < params.silence_floor || stats.rms <= 0.0 {
        return None;
    }

    let ceiling = params.peak_ceiling_linear();
    let gain = params.target_rms_linear() / stats.rms;

    if stats.peak * gain > ceiling {
        Some(GainDecision {
            gain: ceiling / stats.peak,
            peak_limited: true,
        })
    } else {
        Some(GainDecision {
            gain,
            peak_limited: false,
        })
    }
}

// ============================================================================
// Soft Knee
// ============================================================================

/// Exponential soft-knee shaper
///
/// Magnitudes up to `knee_start` pass unchanged. The excess above it is
/// mapped onto `knee_range * (1 - exp(-excess / knee_range * ratio))`, which
/// never reaches `knee_start + knee_range`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftKnee {
    knee_start: f32,
    knee_range: f32,
    ratio: f32,
}

impl SoftKnee {
    /// Knee for a linear `ceiling`, starting at `knee_ratio * ceiling`
    pub fn new(ceiling: f32, knee_ratio: f32, ratio: f32) -> Self {
        let knee_start = knee_ratio * ceiling;
        Self {
            knee_start,
            knee_range: ceiling - knee_start,
            ratio,
        }
    }

    /// Magnitude where compression begins
    pub fn knee_start(&self) -> f32 {
        self.knee_start
    }

    /// Shape one sample. Returns `None` when it is below the knee.
    #[inline]
    pub fn shape(&self, sample: f32) -> Option<f32> {
        let magnitude = sample.abs();
        if magnitude <= self.knee_start {
            return None;
        }

        let excess = magnitude - self.knee_start;
        let compressed = self.knee_range * (1.0 - (-excess / self.knee_range * self.ratio).exp());
        Some(sample.signum() * (self.knee_start + compressed))
    }
}

// ============================================================================
// Normalization
// ============================================================================

/// Normalize loudness and limit peaks
///
/// Length is preserved. On return every sample satisfies
/// `|s| <= peak_ceiling_linear`.
pub fn normalize_loudness(
    mut buffer: MonoBuffer,
    params: &LoudnessParams,
) -> (MonoBuffer, StageOutcome) {
    let stats = buffer.stats();
    let Some(decision) = compute_gain(&stats, params) else {
        return (
            buffer,
            StageOutcome::Skipped(SkipReason::BelowSilenceFloor { rms: stats.rms }),
        );
    };

    let ceiling = params.peak_ceiling_linear();
    let knee = SoftKnee::new(ceiling, params.knee_ratio, params.compression_ratio);
    let mut knee_samples = 0;
    let mut clamped_samples = 0;

    for sample in buffer.samples_mut() {
        let mut value = *sample * decision.gain;

        if let Some(shaped) = knee.shape(value) {
            value = shaped;
            knee_samples += 1;
        }

        if value.abs() > ceiling {
            value = value.signum() * ceiling;
            clamped_samples += 1;
        }

        *sample = value;
    }

    (
        buffer,
        StageOutcome::Applied(StageDetail::Normalized {
            gain: decision.gain,
            peak_limited: decision.peak_limited,
            knee_samples,
            clamped_samples,
        }),
    )
}

/// Loudness normalization stage
#[derive(Debug, Clone, Default)]
pub struct LoudnessNormalizer {
    params: LoudnessParams,
}

impl LoudnessNormalizer {
    pub fn new(params: LoudnessParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &LoudnessParams {
        &self.params
    }
}

impl Stage for LoudnessNormalizer {
    fn kind(&self) -> StageKind {
        StageKind::Normalize
    }

    fn is_enabled(&self) -> bool {
        self.params.enabled
    }

    fn process(&self, buffer: MonoBuffer) -> (MonoBuffer, StageOutcome) {
        normalize_loudness(buffer, &self.params)
    }
}

// ============================================================================
// Tests
// ============================================================================
