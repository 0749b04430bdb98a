//! High-pass filter
//!
//! Single-pole RC high-pass that removes hum and rumble below the voice
//! fundamental band (roughly 85-255 Hz).

use serde::{Deserialize, Serialize};

use super::stage::{Stage, StageDetail, StageKind, StageOutcome};
use crate::engine::MonoBuffer;
use crate::error::{Result, VoicePrepError};

/// Default cutoff frequency in Hz
pub const DEFAULT_CUTOFF_HZ: f32 = 80.0;

/// High-pass parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighPassParams {
    pub enabled: bool,
    /// Cutoff frequency in Hz
    pub cutoff_hz: f32,
}

impl Default for HighPassParams {
    fn default() -> Self {
        Self {
            enabled: true,
            cutoff_hz: DEFAULT_CUTOFF_HZ,
        }
    }
}

impl HighPassParams {
    /// Validate the cutoff against the rate it will run at
    pub fn validate(&self, sample_rate: u32) -> Result<()> {
        let nyquist = sample_rate as f32 / 2.0;
        if !self.cutoff_hz.is_finite() || self.cutoff_hz <= 0.0 || self.cutoff_hz >= nyquist {
            return Err(VoicePrepError::invalid_param(
                "highpass.cutoff_hz",
                self.cutoff_hz,
                &format!("0 < cutoff < {} Hz", nyquist),
            ));
        }
        Ok(())
    }
}

/// Smoothing coefficient of the RC high-pass
///
/// `rc = 1/(2*pi*cutoff)`, `dt = 1/sample_rate`, `alpha = rc/(rc+dt)`.
#[inline]
pub fn rc_alpha(cutoff_hz: f32, sample_rate: u32) -> f32 {
    let rc = 1.0 / (2.0 * std::f64::consts::PI * cutoff_hz as f64);
    let dt = 1.0 / sample_rate as f64;
    (rc / (rc + dt)) as f32
}

/// Filter a buffer in place
///
/// `y[0] = x[0]`, then `y[n] = alpha * (y[n-1] + x[n] - x[n-1])`.
pub fn high_pass(mut buffer: MonoBuffer, cutoff_hz: f32) -> MonoBuffer {
    if buffer.is_empty() {
        return buffer;
    }

    let alpha = rc_alpha(cutoff_hz, buffer.sample_rate());
    let samples = buffer.samples_mut();

    let first = samples[0];
    let mut prev_x = first;
    let mut prev_y = first;
    for sample in samples.iter_mut().skip(1) {
        let x = *sample;
        let y = alpha * (prev_y + x - prev_x);
        *sample = y;
        prev_x = x;
        prev_y = y;
    }

    buffer
}

/// RC high-pass stage
#[derive(Debug, Clone, Default)]
pub struct HighPassFilter {
    params: HighPassParams,
}

impl HighPassFilter {
    pub fn new(params: HighPassParams) -> Self {
        Self { params }
    }

    /// Cutoff frequency in Hz
    pub fn cutoff_hz(&self) -> f32 {
        self.params.cutoff_hz
    }
}

impl Stage for HighPassFilter {
    fn kind(&self) -> StageKind {
        StageKind::HighPass
    }

    fn is_enabled(&self) -> bool {
        self.params.enabled
    }

    fn process(&self, buffer: MonoBuffer) -> (MonoBuffer, StageOutcome) {
        let alpha = rc_alpha(self.params.cutoff_hz, buffer.sample_rate());
        let filtered = high_pass(buffer, self.params.cutoff_hz);
        (
            filtered,
            StageOutcome::Applied(StageDetail::Filtered {
                cutoff_hz: self.params.cutoff_hz,
                alpha,
            }),
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
