//! Error handling for voiceprep
//!
//! Fatal pipeline conditions are errors. Sample suitability is not: the
//! validator reports it as a [`crate::pipeline::ValidationResult`].

use thiserror::Error;

/// Result type alias for voiceprep operations
pub type Result<T> = std::result::Result<T, VoicePrepError>;

/// Main error type for voiceprep operations
#[derive(Error, Debug)]
pub enum VoicePrepError {
    // Decoder Errors
    #[error("Failed to decode audio: {reason}")]
    Decode {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Audio contains no samples")]
    EmptyAudio,

    // Encoder Errors
    #[error("WAV encoding produced a corrupt container: {reason}")]
    EncodeIntegrity { reason: String },

    // Configuration Errors
    #[error("Invalid parameter {param}: {value} (expected {expected})")]
    InvalidParameter {
        param: String,
        value: String,
        expected: String,
    },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Formats the decoder accepts in this build
#[cfg(feature = "opus")]
const SUPPORTED_FORMATS: &str =
    "Supported formats: WAV, FLAC, OGG (Vorbis/Opus), WebM/MKV (Opus/Vorbis), MP3, AAC/M4A";
#[cfg(not(feature = "opus"))]
const SUPPORTED_FORMATS: &str =
    "Supported formats: WAV, FLAC, OGG/Vorbis, MKV (Vorbis), MP3, AAC/M4A (Opus needs `opus`)";

impl VoicePrepError {
    /// Build a decode error from any underlying decoder failure
    pub fn decode<E>(reason: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        VoicePrepError::Decode {
            reason: reason.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Build an invalid-parameter error
    pub fn invalid_param(
        param: &str,
        value: impl ToString,
        expected: &str,
    ) -> Self {
        VoicePrepError::InvalidParameter {
            param: param.to_string(),
            value: value.to_string(),
            expected: expected.to_string(),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            VoicePrepError::Decode { .. } => "DECODE_FAILURE",
            VoicePrepError::EmptyAudio => "EMPTY_AUDIO",
            VoicePrepError::EncodeIntegrity { .. } => "ENCODE_INTEGRITY",
            VoicePrepError::InvalidParameter { .. } => "INVALID_PARAMETER",
            VoicePrepError::Io(_) => "IO_ERROR",
            VoicePrepError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if the caller can do something about this error.
    ///
    /// An integrity failure is an internal bug; retrying cannot help.
    pub fn is_recoverable(&self) -> bool {
        match self {
            VoicePrepError::Decode { .. } => true,
            VoicePrepError::EmptyAudio => true,
            VoicePrepError::InvalidParameter { .. } => true,
            VoicePrepError::Io(_) => true,
            VoicePrepError::EncodeIntegrity { .. } => false,
            VoicePrepError::Serialization(_) => false,
        }
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            VoicePrepError::Decode { .. } => vec![
                "Check that the recording finished uploading completely",
                SUPPORTED_FORMATS,
                "Try recording again in a different browser",
            ],
            VoicePrepError::EmptyAudio => vec![
                "Make sure the microphone is connected and allowed",
                "Record again and speak for at least a few seconds",
            ],
            VoicePrepError::InvalidParameter { .. } => vec![
                "Check the configuration file against the documented ranges",
                "Remove the field to fall back to its default",
            ],
            _ => vec![],
        }
    }

    /// Get a user-facing message for this error
    pub fn friendly_message(&self) -> String {
        match self {
            VoicePrepError::Decode { .. } => {
                "We couldn't read that recording. Could you try recording it again?".to_string()
            }
            VoicePrepError::EmptyAudio => {
                "The recording came through empty. Is your microphone switched on?".to_string()
            }
            VoicePrepError::EncodeIntegrity { .. } => {
                "Something went wrong on our side while preparing your sample.".to_string()
            }
            _ => self.to_string(),
        }
    }
}
