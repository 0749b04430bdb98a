//! Sample validation
//!
//! Decides whether a finished sample is acceptable for voice cloning. The
//! verdict is data, never an error, so callers can show the message as
//! guidance ("recording too short") without error handling.

use serde::{Deserialize, Serialize};

use super::observer::PipelineObserver;
use crate::engine::decode_native;

/// Default minimum blob size in bytes
pub const DEFAULT_MIN_BYTES: usize = 50_000;

/// Thresholds a sample must meet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationPolicy {
    /// Smallest acceptable blob, checked before decoding
    pub min_bytes: usize,
    pub min_duration_secs: Option<f64>,
    pub max_duration_secs: Option<f64>,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            min_bytes: DEFAULT_MIN_BYTES,
            min_duration_secs: None,
            max_duration_secs: None,
        }
    }
}

impl ValidationPolicy {
    /// One to two minutes of speech, as recommended for instant voice cloning
    pub fn instant_clone() -> Self {
        Self {
            min_bytes: DEFAULT_MIN_BYTES,
            min_duration_secs: Some(60.0),
            max_duration_secs: Some(120.0),
        }
    }

    /// Policy with explicit duration bounds
    pub fn with_duration(min_secs: Option<f64>, max_secs: Option<f64>) -> Self {
        Self {
            min_duration_secs: min_secs,
            max_duration_secs: max_secs,
            ..Default::default()
        }
    }
}

/// Suitability verdict for a sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    /// Measured duration in seconds, 0 when the blob was never decoded
    pub duration_secs: f64,
    /// Why the sample was rejected
    pub message: Option<String>,
}

impl ValidationResult {
    fn accept(duration_secs: f64) -> Self {
        Self {
            valid: true,
            duration_secs,
            message: None,
        }
    }

    fn reject(duration_secs: f64, message: String) -> Self {
        Self {
            valid: false,
            duration_secs,
            message: Some(message),
        }
    }
}

/// Check a blob against a policy
///
/// The size check runs first so obviously truncated uploads are never
/// decoded. Decode failures become a rejected verdict.
pub fn validate_sample(
    bytes: &[u8],
    policy: &ValidationPolicy,
    observer: &dyn PipelineObserver,
) -> ValidationResult {
    if bytes.len() < policy.min_bytes {
        return ValidationResult::reject(
            0.0,
            format!(
                "Recording is too small ({} bytes, need at least {} bytes)",
                bytes.len(),
                policy.min_bytes
            ),
        );
    }

    let raw = match decode_native(bytes, observer) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::debug!(error = %e, "validation decode failed");
            return ValidationResult::reject(0.0, format!("Recording could not be read: {}", e));
        }
    };

    check_duration(raw.duration_secs(), policy)
}

/// Apply the duration bounds of a policy to a measured duration
pub fn check_duration(duration_secs: f64, policy: &ValidationPolicy) -> ValidationResult {
    if duration_secs <= 0.0 {
        return ValidationResult::reject(duration_secs, "Recording contains no audio".to_string());
    }

    if let Some(min) = policy.min_duration_secs {
        if duration_secs < min {
            return ValidationResult::reject(
                duration_secs,
                format!(
                    "Recording is too short ({:.1}s). Please record at least {:.0}s.",
                    duration_secs, min
                ),
            );
        }
    }

    if let Some(max) = policy.max_duration_secs {
        if duration_secs > max {
            return ValidationResult::reject(
                duration_secs,
                format!(
                    "Recording is too long ({:.1}s). Please keep it under {:.0}s.",
                    duration_secs, max
                ),
            );
        }
    }

    ValidationResult::accept(duration_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::NullObserver;

    #[test]
    fn test_empty_blob_fails_size_check() {
        let result = validate_sample(&[], &ValidationPolicy::default(), &NullObserver);
        assert!(!result.valid);
        assert_eq!(result.duration_secs, 0.0);
        assert!(result.message.unwrap().contains("too small"));
    }

    #[test]
    fn test_undecodable_blob_is_rejected_not_raised() {
        let policy = ValidationPolicy {
            min_bytes: 0,
            ..Default::default()
        };
        let result = validate_sample(&[0x42; 1024], &policy, &NullObserver);
        assert!(!result.valid);
        assert!(result.message.unwrap().contains("could not be read"));
    }

    #[test]
    fn test_check_duration_bounds() {
        let policy = ValidationPolicy::instant_clone();

        let short = check_duration(3.0, &policy);
        assert!(!short.valid);
        assert!(short.message.as_deref().unwrap().contains("3.0s"));

        let long = check_duration(150.0, &policy);
        assert!(!long.valid);
        assert!(long.message.as_deref().unwrap().contains("150.0s"));

        let ok = check_duration(90.0, &policy);
        assert_eq!(ok, ValidationResult::accept(90.0));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let policy = ValidationPolicy::instant_clone();
        assert!(check_duration(60.0, &policy).valid);
        assert!(check_duration(120.0, &policy).valid);
    }

    #[test]
    fn test_default_policy_has_no_duration_bounds() {
        let result = check_duration(1.5, &ValidationPolicy::default());
        assert!(result.valid);
        assert!(!check_duration(0.0, &ValidationPolicy::default()).valid);
    }

    #[test]
    fn test_result_serializes() {
        let result = check_duration(3.0, &ValidationPolicy::instant_clone());
        let json = serde_json::to_value(result).unwrap();
        assert_eq!(json["valid"], false);
        assert_eq!(json["duration_secs"], 3.0);
    }
}
