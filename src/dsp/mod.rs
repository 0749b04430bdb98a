//! Sample Processing Stages
//!
//! Mono transforms that run between decoding and encoding, in this order:
//! Downmix → High-pass → Silence trim → Loudness normalization.
//! The three mono stages implement the `Stage` trait for uniform processing.

mod downmix;
mod highpass;
mod normalize;
mod stage;
mod trim;

pub use downmix::downmix_to_mono;
pub use highpass::{high_pass, rc_alpha, HighPassFilter, HighPassParams, DEFAULT_CUTOFF_HZ};
pub use normalize::{
    compute_gain, normalize_loudness, GainDecision, LoudnessNormalizer, LoudnessParams, SoftKnee,
    DEFAULT_PEAK_CEILING_DB, DEFAULT_SILENCE_FLOOR, DEFAULT_TARGET_RMS_DB,
};
pub use stage::{SkipReason, Stage, StageDetail, StageKind, StageOutcome};
pub use trim::{find_trim_bounds, trim_silence, SilenceTrimmer, TrimParams};
