//! Silence trimming
//!
//! Cuts quiet lead-in and tail-out from a recording, keeping a safety margin
//! around the first and last samples above the threshold. When the cut would
//! leave less than `min_retention` of the recording, the stage is a no-op so a
//! legitimately quiet take is never destroyed.

use serde::{Deserialize, Serialize};

use super::stage::{SkipReason, Stage, StageDetail, StageKind, StageOutcome};
use crate::engine::MonoBuffer;
use crate::error::{Result, VoicePrepError};

/// Trim parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimParams {
    pub enabled: bool,
    /// Amplitude a sample must exceed to count as signal (linear)
    pub threshold: f32,
    /// Audio kept before the first and after the last signal sample, in ms
    pub margin_ms: f32,
    /// Smallest fraction of the original length a trim may leave
    pub min_retention: f32,
}

impl Default for TrimParams {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 0.01,
            margin_ms: 300.0,
            min_retention: 0.5,
        }
    }
}

impl TrimParams {
    /// Validate parameters are within range
    pub fn validate(&self) -> Result<()> {
        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(VoicePrepError::invalid_param(
                "trim.threshold",
                self.threshold,
                "0 < threshold < 1",
            ));
        }
        if !self.margin_ms.is_finite() || self.margin_ms < 0.0 {
            return Err(VoicePrepError::invalid_param(
                "trim.margin_ms",
                self.margin_ms,
                ">= 0 ms",
            ));
        }
        if !(self.min_retention > 0.0 && self.min_retention <= 1.0) {
            return Err(VoicePrepError::invalid_param(
                "trim.min_retention",
                self.min_retention,
                "0 < ratio <= 1",
            ));
        }
        Ok(())
    }

    /// Margin converted to whole samples at `sample_rate`
    pub fn margin_samples(&self, sample_rate: u32) -> usize {
        (self.margin_ms as f64 * sample_rate as f64 / 1000.0).round() as usize
    }
}

/// Locate the region worth keeping
///
/// Returns `(start, end)` with `end` exclusive: `margin` samples before the
/// first sample above `threshold`, through `margin` samples after the last,
/// clamped to the buffer. `None` when nothing exceeds the threshold.
pub fn find_trim_bounds(samples: &[f32], threshold: f32, margin: usize) -> Option<(usize, usize)> {
    let first = samples.iter().position(|s| s.abs() > threshold)?;
    let last = samples.iter().rposition(|s| s.abs() > threshold)?;

    let start = first.saturating_sub(margin);
    let end = last.saturating_add(1).saturating_add(margin).min(samples.len());
    Some((start, end))
}

/// Trim leading and trailing silence
pub fn trim_silence(mut buffer: MonoBuffer, params: &TrimParams) -> (MonoBuffer, StageOutcome) {
    let original = buffer.len();
    let margin = params.margin_samples(buffer.sample_rate());

    let Some((start, end)) = find_trim_bounds(buffer.samples(), params.threshold, margin) else {
        return (buffer, StageOutcome::Skipped(SkipReason::NoSignalAboveThreshold));
    };

    let kept = end - start;
    if (kept as f64) < original as f64 * params.min_retention as f64 {
        return (
            buffer,
            StageOutcome::Skipped(SkipReason::WouldRemoveTooMuch { kept, original }),
        );
    }

    buffer.retain_range(start, end);
    (
        buffer,
        StageOutcome::Applied(StageDetail::Trimmed {
            leading: start,
            trailing: original - end,
        }),
    )
}

/// Silence trimming stage
#[derive(Debug, Clone, Default)]
pub struct SilenceTrimmer {
    params: TrimParams,
}

impl SilenceTrimmer {
    pub fn new(params: TrimParams) -> Self {
        Self { params }
    }
}

impl Stage for SilenceTrimmer {
    fn kind(&self) -> StageKind {
        StageKind::Trim
    }

    fn is_enabled(&self) -> bool {
        self.params.enabled
    }

    fn process(&self, buffer: MonoBuffer) -> (MonoBuffer, StageOutcome) {
        trim_silence(buffer, &self.params)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    /// `pad` zeros, `body` samples of 0.5, `pad` zeros
    fn padded(pad: usize, body: usize, sample_rate: u32) -> MonoBuffer {
        let mut samples = vec![0.0; pad];
        samples.extend(std::iter::repeat(0.5).take(body));
        samples.extend(std::iter::repeat(0.0).take(pad));
        MonoBuffer::new(samples, sample_rate)
    }

    /// Params whose margin is exactly `margin` samples at 1 kHz
    fn params_with_margin(margin: usize) -> TrimParams {
        TrimParams {
            margin_ms: margin as f32,
            ..Default::default()
        }
    }

    #[test_case(100, 1000, 20 ; "small pad")]
    #[test_case(200, 600, 50 ; "pad near guard")]
    #[test_case(10, 100, 0 ; "no margin")]
    #[test_case(30, 200, 30 ; "margin equals pad")]
    fn test_trim_length(pad: usize, body: usize, margin: usize) {
        let input = padded(pad, body, 1000);
        let input_len = input.len();
        let (out, outcome) = trim_silence(input, &params_with_margin(margin));

        assert_eq!(out.len(), input_len - 2 * pad + 2 * margin);
        assert_eq!(
            outcome,
            StageOutcome::Applied(StageDetail::Trimmed {
                leading: pad - margin,
                trailing: pad - margin,
            })
        );
    }

    #[test]
    fn test_margin_larger_than_padding_clamps() {
        let input = padded(10, 200, 1000);
        let (out, _) = trim_silence(input.clone(), &params_with_margin(50));
        assert_eq!(out, input);
    }

    #[test]
    fn test_guard_skips_over_aggressive_trim() {
        // 400 + 100 + 400: trimmed length 100 + 2*20 = 140 < 450
        let input = padded(400, 100, 1000);
        let (out, outcome) = trim_silence(input.clone(), &params_with_margin(20));

        assert_eq!(out, input);
        assert_eq!(
            outcome,
            StageOutcome::Skipped(SkipReason::WouldRemoveTooMuch {
                kept: 140,
                original: 900,
            })
        );
    }

    #[test]
    fn test_guard_boundary_exactly_half_is_kept() {
        // 250 + 500 + 250 with no margin keeps exactly 50%
        let input = padded(250, 500, 1000);
        let (out, outcome) = trim_silence(input, &params_with_margin(0));
        assert_eq!(out.len(), 500);
        assert!(!outcome.is_skipped());
    }

    #[test]
    fn test_all_silent_is_noop() {
        let input = MonoBuffer::new(vec![0.005; 1000], 1000);
        let (out, outcome) = trim_silence(input.clone(), &TrimParams::default());
        assert_eq!(out, input);
        assert_eq!(outcome, StageOutcome::Skipped(SkipReason::NoSignalAboveThreshold));
    }

    #[test]
    fn test_negative_samples_count_as_signal() {
        let mut samples = vec![0.0; 100];
        samples[10] = -0.2;
        samples[90] = -0.2;
        let (out, _) = trim_silence(MonoBuffer::new(samples, 1000), &params_with_margin(5));
        // 10-5 ..= 90+5
        assert_eq!(out.len(), 91);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let samples = vec![0.01, 0.01, 0.5, 0.01, 0.01];
        assert_eq!(find_trim_bounds(&samples, 0.01, 0), Some((2, 3)));
    }

    #[test]
    fn test_empty_buffer() {
        let empty = MonoBuffer::new(Vec::new(), 44100);
        let (out, outcome) = trim_silence(empty, &TrimParams::default());
        assert!(out.is_empty());
        assert!(outcome.is_skipped());
    }

    #[test]
    fn test_margin_samples() {
        let params = TrimParams::default();
        assert_eq!(params.margin_samples(44100), 13230);
        assert_eq!(params.margin_samples(48000), 14400);
    }

    #[test]
    fn test_params_validation() {
        assert!(TrimParams::default().validate().is_ok());
        let bad = TrimParams {
            min_retention: 0.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let bad = TrimParams {
            margin_ms: -1.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
