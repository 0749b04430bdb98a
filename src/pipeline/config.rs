//! Pipeline configuration
//!
//! Every knob is optional; missing fields fall back to their defaults, so an
//! empty JSON object is a valid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dsp::{HighPassParams, LoudnessParams, TrimParams};
use crate::engine::{DEFAULT_SAMPLE_RATE, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE};
use crate::error::{Result, VoicePrepError};

/// Full configuration of a preprocessing run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Rate of the decoding context and of the produced WAV
    pub target_sample_rate: u32,
    pub highpass: HighPassParams,
    pub trim: TrimParams,
    pub loudness: LoudnessParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: DEFAULT_SAMPLE_RATE,
            highpass: HighPassParams::default(),
            trim: TrimParams::default(),
            loudness: LoudnessParams::default(),
        }
    }
}

impl PipelineConfig {
    /// Default configuration at a different output rate
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self {
            target_sample_rate: sample_rate,
            ..Default::default()
        }
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.target_sample_rate) {
            return Err(VoicePrepError::invalid_param(
                "target_sample_rate",
                self.target_sample_rate,
                "8000 to 192000 Hz",
            ));
        }
        self.highpass.validate(self.target_sample_rate)?;
        self.trim.validate()?;
        self.loudness.validate()?;
        Ok(())
    }

    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Serialize to pretty JSON
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.target_sample_rate, 44100);
        assert_eq!(config.highpass.cutoff_hz, 80.0);
        assert_eq!(config.trim.threshold, 0.01);
        assert_eq!(config.trim.margin_ms, 300.0);
        assert_eq!(config.loudness.target_rms_db, -18.0);
        assert_eq!(config.loudness.peak_ceiling_db, -3.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_json_is_default() {
        let config = PipelineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_partial_json_overrides() {
        let config = PipelineConfig::from_json_str(
            r#"{ "target_sample_rate": 48000, "loudness": { "target_rms_db": -20.0 } }"#,
        )
        .unwrap();
        assert_eq!(config.target_sample_rate, 48000);
        assert_eq!(config.loudness.target_rms_db, -20.0);
        assert_eq!(config.loudness.peak_ceiling_db, -3.0);
        assert!(config.trim.enabled);
    }

    #[test]
    fn test_invalid_json_values_rejected() {
        let err =
            PipelineConfig::from_json_str(r#"{ "highpass": { "cutoff_hz": -5 } }"#).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PARAMETER");

        let err = PipelineConfig::from_json_str("not json").unwrap_err();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
    }

    #[test]
    fn test_json_roundtrip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = PipelineConfig::with_sample_rate(16000);
        std::fs::write(&path, config.to_json_string().unwrap()).unwrap();

        assert_eq!(PipelineConfig::from_json_file(&path).unwrap(), config);
    }

    #[test]
    fn test_sample_rate_bounds() {
        assert!(PipelineConfig::with_sample_rate(4000).validate().is_err());
        assert!(PipelineConfig::with_sample_rate(48000).validate().is_ok());
    }
}
