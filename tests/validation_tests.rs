//! Validation Integration Tests
//!
//! Suitability checks on encoded recordings and on finished samples.

use std::io::Cursor;
use std::sync::Arc;

use approx::assert_abs_diff_eq;
use hound::{SampleFormat, WavSpec, WavWriter};
use test_case::test_case;

use voiceprep::dsp::StageKind;
use voiceprep::pipeline::{validate_sample, NullObserver, RecordingObserver, ValidationPolicy};
use voiceprep::{Pipeline, PipelineConfig};

/// Mono 16-bit WAV of a quiet tone
fn tone_wav(seconds: u32, sample_rate: u32) -> Vec<u8> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut bytes = Vec::new();
    {
        let mut writer = WavWriter::new(Cursor::new(&mut bytes), spec).unwrap();
        for i in 0..seconds * sample_rate {
            let t = i as f32 / sample_rate as f32;
            let value = 0.2 * (2.0 * std::f32::consts::PI * 220.0 * t).sin();
            writer.write_sample((value * 32767.0) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    bytes
}

#[test]
fn test_zero_byte_blob_rejected() {
    let result = validate_sample(&[], &ValidationPolicy::instant_clone(), &NullObserver);

    assert!(!result.valid);
    assert_eq!(result.duration_secs, 0.0);
    assert!(result.message.is_some());
}

#[test]
fn test_short_recording_rejected_with_duration() {
    // 3 s at 16 kHz is 96 KB, large enough to pass the size check
    let blob = tone_wav(3, 16000);
    let policy = ValidationPolicy::with_duration(Some(60.0), None);

    let result = validate_sample(&blob, &policy, &NullObserver);

    assert!(!result.valid);
    assert_abs_diff_eq!(result.duration_secs, 3.0, epsilon = 1e-6);
    let message = result.message.unwrap();
    assert!(message.contains("3.0s"), "{}", message);
    assert!(message.contains("60s"), "{}", message);
}

#[test]
fn test_ninety_seconds_within_instant_clone_bounds() {
    let blob = tone_wav(90, 8000);

    let result = validate_sample(&blob, &ValidationPolicy::instant_clone(), &NullObserver);

    assert!(result.valid, "{:?}", result.message);
    assert_abs_diff_eq!(result.duration_secs, 90.0, epsilon = 1e-6);
    assert_eq!(result.message, None);
}

#[test_case(Some(30.0), Some(45.0) ; "too long")]
#[test_case(Some(100.0), None ; "too short")]
fn test_forty_eight_seconds_outside_bounds(min: Option<f64>, max: Option<f64>) {
    let blob = tone_wav(48, 8000);

    let result = validate_sample(&blob, &ValidationPolicy::with_duration(min, max), &NullObserver);

    assert!(!result.valid);
    assert_abs_diff_eq!(result.duration_secs, 48.0, epsilon = 1e-6);
}

#[test]
fn test_small_blob_never_decoded() {
    let observer = RecordingObserver::new();
    let blob = tone_wav(1, 8000);
    assert!(blob.len() < 50_000);

    let result = validate_sample(&blob, &ValidationPolicy::default(), &observer);

    assert!(!result.valid);
    assert_eq!(observer.decoder_releases(), 0);
}

#[test]
fn test_decoder_released_after_validation() {
    let observer = RecordingObserver::new();
    let blob = tone_wav(3, 16000);

    validate_sample(&blob, &ValidationPolicy::default(), &observer);

    assert_eq!(observer.decoder_releases(), 1);
}

#[test]
fn test_processed_sample_validates() {
    let observer = Arc::new(RecordingObserver::new());
    let pipeline =
        Pipeline::with_observer(PipelineConfig::with_sample_rate(16000), observer.clone()).unwrap();
    let sample = pipeline.process(&tone_wav(3, 16000)).unwrap();

    let result = pipeline.validate(sample.wav.as_bytes(), &ValidationPolicy::default());

    assert!(result.valid, "{:?}", result.message);
    assert_abs_diff_eq!(result.duration_secs, sample.report.output_duration_secs, epsilon = 1e-6);
    let last = observer.reports().pop().unwrap();
    assert_eq!(last.stage, StageKind::Validate);
}

#[test]
fn test_verdict_as_json() {
    let result = validate_sample(&[], &ValidationPolicy::default(), &NullObserver);
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["valid"], false);
    assert!(json["message"].is_string());
}
