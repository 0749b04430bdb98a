//! Audio Buffer Types
//!
//! Two buffer shapes flow through the pipeline:
//! - [`RawAudioBuffer`]: decoder output, one `Vec<f32>` per channel
//! - [`MonoBuffer`]: single channel, owned by exactly one stage at a time

use serde::{Deserialize, Serialize};

use crate::error::{Result, VoicePrepError};

// ============================================================================
// Constants
// ============================================================================

/// Default sample rate of the decoding context (44.1kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Lowest sample rate accepted from a decoded stream or a configuration
pub const MIN_SAMPLE_RATE: u32 = 8000;

/// Highest sample rate accepted from a decoded stream or a configuration
pub const MAX_SAMPLE_RATE: u32 = 192_000;

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert decibels to linear amplitude
///
/// # Arguments
/// * `db` - Value in decibels
///
/// # Returns
/// Linear amplitude (0.0 to 1.0+ range)
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to decibels
///
/// Returns `-f32::INFINITY` for zero input.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// Root mean square of a slice (linear). Zero for an empty slice.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_squares / samples.len() as f64).sqrt() as f32
}

/// Largest absolute sample value (linear). Zero for an empty slice.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0_f32, f32::max)
}

// ============================================================================
// Level Statistics
// ============================================================================

/// Loudness measurements of a mono buffer
///
/// Serializes with the derived dBFS levels alongside the linear ones; a
/// silent buffer has `null` dB levels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "LevelStatsRepr", from = "LevelStatsRepr")]
pub struct LevelStats {
    /// RMS level (linear)
    pub rms: f32,
    /// Peak level (linear)
    pub peak: f32,
}

impl LevelStats {
    /// Measure a slice of samples
    pub fn measure(samples: &[f32]) -> Self {
        Self {
            rms: rms(samples),
            peak: peak(samples),
        }
    }

    /// RMS level in dBFS
    pub fn rms_db(&self) -> f32 {
        linear_to_db(self.rms)
    }

    /// Peak level in dBFS
    pub fn peak_db(&self) -> f32 {
        linear_to_db(self.peak)
    }

    /// Peak-to-RMS ratio in dB. Infinite for silence.
    pub fn crest_factor_db(&self) -> f32 {
        if self.rms <= 0.0 {
            return f32::INFINITY;
        }
        linear_to_db(self.peak / self.rms)
    }
}

#[derive(Serialize, Deserialize)]
struct LevelStatsRepr {
    rms: f32,
    peak: f32,
    #[serde(default, skip_deserializing)]
    rms_db: Option<f32>,
    #[serde(default, skip_deserializing)]
    peak_db: Option<f32>,
}

impl From<LevelStats> for LevelStatsRepr {
    fn from(stats: LevelStats) -> Self {
        let finite = |db: f32| db.is_finite().then_some(db);
        Self {
            rms: stats.rms,
            peak: stats.peak,
            rms_db: finite(stats.rms_db()),
            peak_db: finite(stats.peak_db()),
        }
    }
}

impl From<LevelStatsRepr> for LevelStats {
    fn from(repr: LevelStatsRepr) -> Self {
        Self {
            rms: repr.rms,
            peak: repr.peak,
        }
    }
}

// ============================================================================
// Raw Audio Buffer
// ============================================================================

/// Multi-channel decoder output
///
/// Stores non-interleaved samples: outer Vec is channels, inner Vec is
/// samples. Consumed by the channel reducer.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAudioBuffer {
    /// Sample data, one Vec per channel
    pub channels: Vec<Vec<f32>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl RawAudioBuffer {
    /// Create a buffer from per-channel data
    ///
    /// All channels must have the same length.
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(VoicePrepError::invalid_param("sample_rate", 0, "> 0 Hz"));
        }
        if let Some(first) = channels.first() {
            let expected = first.len();
            if let Some(bad) = channels.iter().position(|ch| ch.len() != expected) {
                return Err(VoicePrepError::Decode {
                    reason: format!(
                        "channel {} has {} samples, expected {}",
                        bad,
                        channels[bad].len(),
                        expected
                    ),
                    source: None,
                });
            }
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Create a buffer from interleaved data (L, R, L, R, ... for stereo)
    ///
    /// A trailing partial frame is dropped.
    pub fn from_interleaved(
        interleaved: &[f32],
        num_channels: usize,
        sample_rate: u32,
    ) -> Result<Self> {
        if num_channels == 0 {
            return Err(VoicePrepError::invalid_param("channels", 0, ">= 1"));
        }

        let frames = interleaved.len() / num_channels;
        let mut channels = vec![Vec::with_capacity(frames); num_channels];
        for frame in interleaved.chunks_exact(num_channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                channels[ch].push(sample);
            }
        }

        Self::new(channels, sample_rate)
    }

    /// Number of channels
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Number of samples per channel
    #[inline]
    pub fn len(&self) -> usize {
        self.channels.first().map(|ch| ch.len()).unwrap_or(0)
    }

    /// Check if the buffer holds no samples
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Duration in seconds
    #[inline]
    pub fn duration_secs(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }
}

// ============================================================================
// Mono Buffer
// ============================================================================

/// Single-channel sample buffer passed between processing stages
///
/// Samples are expected in [-1, 1]. Stages take the buffer by value, so a
/// stage's output always supersedes its input.
#[derive(Debug, Clone, PartialEq)]
pub struct MonoBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl MonoBuffer {
    /// Wrap owned samples at the given rate
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Sample rate in Hz
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the buffer holds no samples
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    #[inline]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Read-only view of the samples
    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Mutable view of the samples
    #[inline]
    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    /// Take the samples out of the buffer
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Keep only `range`, dropping everything outside it in place
    pub(crate) fn retain_range(&mut self, start: usize, end: usize) {
        self.samples.truncate(end);
        self.samples.drain(..start);
    }

    /// Measure RMS and peak
    pub fn stats(&self) -> LevelStats {
        LevelStats::measure(&self.samples)
    }

    /// Check that every sample is finite (no NaN/Inf)
    pub fn is_finite(&self) -> bool {
        self.samples.iter().all(|s| s.is_finite())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_db_to_linear() {
        assert_abs_diff_eq!(db_to_linear(0.0), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(db_to_linear(-6.0), 0.501187, epsilon = 1e-4);
        assert_abs_diff_eq!(db_to_linear(-18.0), 0.125893, epsilon = 1e-4);
        assert_abs_diff_eq!(db_to_linear(-3.0), 0.707946, epsilon = 1e-4);
    }

    #[test]
    fn test_linear_to_db() {
        assert_abs_diff_eq!(linear_to_db(1.0), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(linear_to_db(0.5), -6.0206, epsilon = 1e-3);
        assert_eq!(linear_to_db(0.0), f32::NEG_INFINITY);
    }

    #[test]
    fn test_rms_and_peak() {
        assert_eq!(rms(&[]), 0.0);
        assert_eq!(peak(&[]), 0.0);
        assert_abs_diff_eq!(rms(&[0.5, -0.5, 0.5, -0.5]), 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(peak(&[0.1, -0.9, 0.3]), 0.9, epsilon = 1e-6);
    }

    #[test]
    fn test_sine_rms() {
        let samples: Vec<f32> = (0..48000)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 48000.0).sin())
            .collect();
        let stats = LevelStats::measure(&samples);
        assert_abs_diff_eq!(stats.rms, std::f32::consts::FRAC_1_SQRT_2, epsilon = 1e-3);
        assert_abs_diff_eq!(stats.crest_factor_db(), 3.01, epsilon = 0.05);
    }

    #[test]
    fn test_level_stats_json_carries_db() {
        let stats = LevelStats { rms: 0.1, peak: 0.5 };
        let json = serde_json::to_value(stats).unwrap();

        assert_abs_diff_eq!(json["rms_db"].as_f64().unwrap(), -20.0, epsilon = 1e-4);
        assert_abs_diff_eq!(json["peak_db"].as_f64().unwrap(), -6.0206, epsilon = 1e-3);
        assert_eq!(serde_json::from_value::<LevelStats>(json).unwrap(), stats);
    }

    #[test]
    fn test_silent_level_stats_json_has_null_db() {
        let json = serde_json::to_value(LevelStats { rms: 0.0, peak: 0.0 }).unwrap();

        assert!(json["rms_db"].is_null());
        assert!(json["peak_db"].is_null());
        assert!(serde_json::from_value::<LevelStats>(json).is_ok());
    }

    #[test]
    fn test_raw_from_interleaved() {
        let raw =
            RawAudioBuffer::from_interleaved(&[1.0, 5.0, 2.0, 6.0, 3.0, 7.0], 2, 44100).unwrap();
        assert_eq!(raw.num_channels(), 2);
        assert_eq!(raw.len(), 3);
        assert_eq!(raw.channels[0], vec![1.0, 2.0, 3.0]);
        assert_eq!(raw.channels[1], vec![5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_raw_rejects_ragged_channels() {
        let result = RawAudioBuffer::new(vec![vec![0.0; 4], vec![0.0; 3]], 44100);
        assert!(result.is_err());
    }

    #[test]
    fn test_raw_duration() {
        let raw = RawAudioBuffer::new(vec![vec![0.0; 22050]], 44100).unwrap();
        assert_abs_diff_eq!(raw.duration_secs(), 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_mono_retain_range() {
        let mut buffer = MonoBuffer::new(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0], 10);
        buffer.retain_range(1, 4);
        assert_eq!(buffer.samples(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_mono_is_finite() {
        let buffer = MonoBuffer::new(vec![0.0, f32::NAN], 10);
        assert!(!buffer.is_finite());
    }
}
