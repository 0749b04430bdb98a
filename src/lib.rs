//! voiceprep - Voice Sample Preprocessing
//!
//! Turns a raw microphone recording into a clean, loudness-normalized,
//! single-channel 16-bit PCM WAV suitable for a voice-cloning model.
//!
//! # Architecture
//!
//! Stages run strictly in sequence, each taking ownership of the previous
//! stage's buffer:
//! - Decode: compressed blob → multi-channel float buffer
//! - Downmix: channel average → mono
//! - High-pass: 80 Hz single-pole RC
//! - Trim: leading/trailing silence with margin and over-trim guard
//! - Normalize: RMS target, peak ceiling, soft-knee limiting
//! - Encode: canonical 44-byte-header WAV
//!
//! A separate validator re-decodes the finished blob and reports whether it
//! meets a duration/size policy.
//!
//! # Example
//! ```no_run
//! use voiceprep::{Pipeline, PipelineConfig, ValidationPolicy};
//!
//! let recording = std::fs::read("take.m4a")?;
//! let pipeline = Pipeline::new(PipelineConfig::default())?;
//! let sample = pipeline.process(&recording)?;
//! let verdict = pipeline.validate(sample.wav.as_bytes(), &ValidationPolicy::instant_clone());
//! if !verdict.valid {
//!     println!("{}", verdict.message.unwrap_or_default());
//! }
//! # Ok::<(), voiceprep::VoicePrepError>(())
//! ```

pub mod cli;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod pipeline;

pub use engine::{MonoBuffer, RawAudioBuffer, WavContainer};
pub use error::{Result, VoicePrepError};
pub use pipeline::{
    preprocess, Pipeline, PipelineConfig, PipelineObserver, PipelineReport, ProcessedSample,
    ValidationPolicy, ValidationResult,
};
