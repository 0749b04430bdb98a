//! Pipeline runner
//!
//! Decode → Downmix → High-pass → Trim → Normalize → Encode, strictly in
//! sequence. Each call builds and owns its own buffer chain, so a
//! [`Pipeline`] can be shared between threads without locking.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::config::PipelineConfig;
use super::observer::{PipelineObserver, StageReport, TracingObserver};
use super::validate::{validate_sample, ValidationPolicy, ValidationResult};
use crate::dsp::{
    downmix_to_mono, HighPassFilter, LoudnessNormalizer, SilenceTrimmer, SkipReason, Stage,
    StageDetail, StageKind, StageOutcome,
};
use crate::engine::{decode, encode_wav, LevelStats, MonoBuffer, RawAudioBuffer, WavContainer};
use crate::error::Result;

/// What a run did to the recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Channel count of the decoded input
    pub source_channels: usize,
    pub sample_rate: u32,
    pub input_duration_secs: f64,
    pub output_duration_secs: f64,
    /// Levels entering the normalizer
    pub pre_normalize: LevelStats,
    /// Levels of the final float buffer
    pub output: LevelStats,
    /// Samples removed from the start and end
    pub trimmed_leading: usize,
    pub trimmed_trailing: usize,
    /// Gain applied by the normalizer, 1.0 when it was skipped
    pub applied_gain: f32,
    pub peak_limited: bool,
    /// Stages that fell back to a no-op, and why
    pub skipped: Vec<(StageKind, SkipReason)>,
}

/// Output of a successful run
#[derive(Debug, Clone)]
pub struct ProcessedSample {
    pub wav: WavContainer,
    pub report: PipelineReport,
}

/// Voice-sample preprocessing pipeline
#[derive(Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    observer: Arc<dyn PipelineObserver>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            config: PipelineConfig::default(),
            observer: Arc::new(TracingObserver),
        }
    }
}

impl Pipeline {
    /// Create a pipeline that reports through `tracing`
    ///
    /// Fails if the configuration is out of range.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Self::with_observer(config, Arc::new(TracingObserver))
    }

    /// Create a pipeline with an injected observer
    pub fn with_observer(
        config: PipelineConfig,
        observer: Arc<dyn PipelineObserver>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, observer })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn observer(&self) -> &Arc<dyn PipelineObserver> {
        &self.observer
    }

    /// Turn a raw recording into a normalized mono WAV
    pub fn process(&self, bytes: &[u8]) -> Result<ProcessedSample> {
        let observer = self.observer.as_ref();
        observer.stage_started(StageKind::Decode);
        let started = Instant::now();
        let raw = decode(bytes, self.config.target_sample_rate, observer)?;
        observer.stage_finished(&StageReport {
            stage: StageKind::Decode,
            input_len: bytes.len(),
            output_len: raw.len(),
            elapsed: started.elapsed(),
            outcome: None,
        });

        self.process_decoded(raw)
    }

    /// Run every stage after decoding
    pub fn process_decoded(&self, raw: RawAudioBuffer) -> Result<ProcessedSample> {
        let observer = self.observer.as_ref();
        let source_channels = raw.num_channels();
        let input_duration_secs = raw.duration_secs();

        observer.stage_started(StageKind::Downmix);
        let started = Instant::now();
        let input_len = raw.len();
        let mut buffer = downmix_to_mono(raw);
        observer.stage_finished(&StageReport {
            stage: StageKind::Downmix,
            input_len,
            output_len: buffer.len(),
            elapsed: started.elapsed(),
            outcome: None,
        });

        let mut report = PipelineReport {
            source_channels,
            sample_rate: buffer.sample_rate(),
            input_duration_secs,
            output_duration_secs: 0.0,
            pre_normalize: LevelStats { rms: 0.0, peak: 0.0 },
            output: LevelStats { rms: 0.0, peak: 0.0 },
            trimmed_leading: 0,
            trimmed_trailing: 0,
            applied_gain: 1.0,
            peak_limited: false,
            skipped: Vec::new(),
        };

        for stage in self.stages() {
            if stage.kind() == StageKind::Normalize {
                report.pre_normalize = buffer.stats();
            }
            buffer = self.run_stage(stage.as_ref(), buffer, &mut report);
        }

        report.output = buffer.stats();
        report.output_duration_secs = buffer.duration_secs();

        observer.stage_started(StageKind::Encode);
        let started = Instant::now();
        let wav = encode_wav(&buffer)?;
        observer.stage_finished(&StageReport {
            stage: StageKind::Encode,
            input_len: buffer.len(),
            output_len: wav.len(),
            elapsed: started.elapsed(),
            outcome: None,
        });

        Ok(ProcessedSample { wav, report })
    }

    /// Validate a finished blob, reporting through this pipeline's observer
    pub fn validate(&self, bytes: &[u8], policy: &ValidationPolicy) -> ValidationResult {
        let observer = self.observer.as_ref();
        observer.stage_started(StageKind::Validate);
        let started = Instant::now();
        let result = validate_sample(bytes, policy, observer);
        observer.stage_finished(&StageReport {
            stage: StageKind::Validate,
            input_len: bytes.len(),
            output_len: bytes.len(),
            elapsed: started.elapsed(),
            outcome: None,
        });
        result
    }

    /// The mono stages in execution order
    fn stages(&self) -> [Box<dyn Stage>; 3] {
        [
            Box::new(HighPassFilter::new(self.config.highpass.clone())),
            Box::new(SilenceTrimmer::new(self.config.trim.clone())),
            Box::new(LoudnessNormalizer::new(self.config.loudness.clone())),
        ]
    }

    fn run_stage(
        &self,
        stage: &dyn Stage,
        buffer: MonoBuffer,
        report: &mut PipelineReport,
    ) -> MonoBuffer {
        let observer = self.observer.as_ref();
        let kind = stage.kind();
        observer.stage_started(kind);

        let started = Instant::now();
        let input_len = buffer.len();
        let (buffer, outcome) = stage.run(buffer);

        match &outcome {
            StageOutcome::Skipped(reason) => {
                observer.stage_skipped(kind, reason);
                report.skipped.push((kind, reason.clone()));
            }
            StageOutcome::Applied(StageDetail::Trimmed { leading, trailing }) => {
                report.trimmed_leading = *leading;
                report.trimmed_trailing = *trailing;
            }
            StageOutcome::Applied(StageDetail::Normalized {
                gain, peak_limited, ..
            }) => {
                report.applied_gain = *gain;
                report.peak_limited = *peak_limited;
            }
            StageOutcome::Applied(StageDetail::Filtered { .. }) => {}
        }

        observer.stage_finished(&StageReport {
            stage: kind,
            input_len,
            output_len: buffer.len(),
            elapsed: started.elapsed(),
            outcome: Some(outcome),
        });
        buffer
    }
}

/// Preprocess a recording with the given configuration
pub fn preprocess(bytes: &[u8], config: &PipelineConfig) -> Result<WavContainer> {
    Ok(Pipeline::new(config.clone())?.process(bytes)?.wav)
}

#[cfg(feature = "async")]
mod nonblocking {
    use super::*;
    use crate::error::VoicePrepError;

    impl Pipeline {
        /// Decode on the blocking pool, then run the CPU stages inline
        ///
        /// The decode is the only await point.
        pub async fn process_async(&self, bytes: Vec<u8>) -> Result<ProcessedSample> {
            let rate = self.config.target_sample_rate;
            let observer = Arc::clone(&self.observer);
            let input_len = bytes.len();

            observer.stage_started(StageKind::Decode);
            let started = Instant::now();
            let raw = tokio::task::spawn_blocking(move || decode(&bytes, rate, observer.as_ref()))
                .await
                .map_err(|e| VoicePrepError::decode("decode task failed", e))??;
            self.observer.stage_finished(&StageReport {
                stage: StageKind::Decode,
                input_len,
                output_len: raw.len(),
                elapsed: started.elapsed(),
                outcome: None,
            });

            self.process_decoded(raw)
        }

        /// Validate on the blocking pool
        pub async fn validate_async(
            &self,
            bytes: Vec<u8>,
            policy: ValidationPolicy,
        ) -> Result<ValidationResult> {
            let pipeline = self.clone();
            tokio::task::spawn_blocking(move || pipeline.validate(&bytes, &policy))
                .await
                .map_err(|e| VoicePrepError::decode("validation task failed", e))
        }
    }
}
