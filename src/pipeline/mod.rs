//! Preprocessing Pipeline
//!
//! Wires the engine and the stages together:
//! - Configuration and validation policy
//! - Observer interface for progress and diagnostics
//! - The runner that turns a recording into a WAV sample

mod config;
mod observer;
mod runner;
mod validate;

pub use config::PipelineConfig;
pub use observer::{
    NullObserver, ObserverEvent, PipelineObserver, RecordingObserver, StageReport, TracingObserver,
};
pub use runner::{preprocess, Pipeline, PipelineReport, ProcessedSample};
pub use validate::{
    check_duration, validate_sample, ValidationPolicy, ValidationResult, DEFAULT_MIN_BYTES,
};
