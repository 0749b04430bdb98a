//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::engine::inspect_wav;
use crate::pipeline::{
    Pipeline, PipelineConfig, PipelineReport, ValidationPolicy, ValidationResult,
};

/// File extensions picked up by `batch`
const AUDIO_EXTENSIONS: &[&str] = &[
    "wav", "flac", "ogg", "oga", "mp3", "m4a", "mp4", "aac", "mkv",
];

/// Browser capture formats, Opus in practice
#[cfg(feature = "opus")]
const OPUS_EXTENSIONS: &[&str] = &["webm", "opus"];
#[cfg(not(feature = "opus"))]
const OPUS_EXTENSIONS: &[&str] = &[];

/// Load a configuration file, or the defaults
pub fn load_config(path: Option<&Path>, sample_rate: Option<u32>) -> Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(rate) = sample_rate {
        config.target_sample_rate = rate;
    }
    Ok(config)
}

/// Hex SHA-256 of a blob
pub fn digest_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Preprocess one recording. Returns the verdict when a policy was given.
pub fn process(
    input: &Path,
    output: &Path,
    config: PipelineConfig,
    policy: Option<ValidationPolicy>,
) -> Result<Option<ValidationResult>> {
    info!("Processing: {}", input.display());

    let bytes = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let pipeline = Pipeline::new(config)?;
    let sample = pipeline
        .process(&bytes)
        .with_context(|| format!("preprocessing {}", input.display()))?;

    std::fs::write(output, sample.wav.as_bytes())
        .with_context(|| format!("writing {}", output.display()))?;

    print_report(output, &sample.report, sample.wav.as_bytes());

    let verdict = policy.map(|policy| pipeline.validate(sample.wav.as_bytes(), &policy));
    if let Some(verdict) = &verdict {
        print_verdict(verdict);
    }
    Ok(verdict)
}

/// Validate a file against explicit thresholds
pub fn validate(input: &Path, policy: &ValidationPolicy, json: bool) -> Result<ValidationResult> {
    let bytes = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let verdict = Pipeline::default().validate(&bytes, policy);

    if json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
    } else {
        print_verdict(&verdict);
    }
    Ok(verdict)
}

/// Print the format of a WAV file
pub fn inspect(input: &Path) -> Result<()> {
    let bytes = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let info = inspect_wav(&bytes)?;

    println!("File: {}", input.display());
    println!("Channels: {}", info.channels);
    println!("Sample rate: {} Hz", info.sample_rate);
    println!("Bit depth: {}", info.bits_per_sample);
    println!("Duration: {:.2}s ({} frames)", info.duration_secs, info.frames);
    println!("SHA-256: {}", digest_hex(&bytes));
    Ok(())
}

/// Outcome of a batch run
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub processed: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Preprocess every recording under `input_dir`
///
/// The directory layout is mirrored under `output_dir`. Individual failures
/// are reported and skipped. When `output_dir` sits inside `input_dir` it is
/// not scanned.
pub fn batch(input_dir: &Path, output_dir: &Path, config: PipelineConfig) -> Result<BatchSummary> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;
    let input_root = input_dir
        .canonicalize()
        .with_context(|| format!("resolving {}", input_dir.display()))?;
    let output_root = output_dir
        .canonicalize()
        .with_context(|| format!("resolving {}", output_dir.display()))?;
    if input_root == output_root {
        bail!("output directory must differ from the input directory");
    }

    let pipeline = Pipeline::new(config)?;
    let mut summary = BatchSummary::default();
    let mut claimed = HashSet::new();

    let walker = WalkDir::new(&input_root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !entry.path().starts_with(&output_root));

    for entry in walker {
        let entry = entry.with_context(|| format!("scanning {}", input_dir.display()))?;
        if !entry.file_type().is_file() || !is_audio_file(entry.path()) {
            continue;
        }

        let input = entry.path();
        let relative = input.strip_prefix(&input_root).unwrap_or(input);
        let output = claim_output_path(output_dir, relative, &mut claimed);

        let result = std::fs::read(input)
            .map_err(anyhow::Error::from)
            .and_then(|bytes| Ok(pipeline.process(&bytes)?))
            .and_then(|sample| {
                if let Some(parent) = output.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&output, sample.wav.as_bytes())?;
                Ok(sample)
            });

        match result {
            Ok(sample) => {
                println!(
                    "{} -> {} ({:.1}s, {})",
                    input.display(),
                    output.display(),
                    sample.report.output_duration_secs,
                    &digest_hex(sample.wav.as_bytes())[..12]
                );
                summary.processed.push(output);
            }
            Err(e) => {
                warn!("Skipping {}: {:#}", input.display(), e);
                summary.failed.push((input.to_path_buf(), format!("{:#}", e)));
            }
        }
    }

    println!(
        "Batch complete: {} processed, {} failed",
        summary.processed.len(),
        summary.failed.len()
    );
    Ok(summary)
}

/// Output path for a recording, unique within one batch run
///
/// `dir/take.m4a` maps to `dir/take.wav`; if another recording already took
/// that name, the source extension is kept (`dir/take.m4a.wav`).
fn claim_output_path(
    output_dir: &Path,
    relative: &Path,
    claimed: &mut HashSet<PathBuf>,
) -> PathBuf {
    let mut candidate = output_dir.join(relative).with_extension("wav");
    if claimed.insert(candidate.clone()) {
        return candidate;
    }

    let mut name = relative.file_name().unwrap_or_default().to_os_string();
    loop {
        name.push(".wav");
        candidate = output_dir.join(relative).with_file_name(&name);
        if claimed.insert(candidate.clone()) {
            return candidate;
        }
    }
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .map(|ext| {
            AUDIO_EXTENSIONS.contains(&ext.as_str()) || OPUS_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

fn print_report(output: &Path, report: &PipelineReport, wav: &[u8]) {
    println!("Wrote: {}", output.display());
    println!(
        "Duration: {:.2}s -> {:.2}s ({} channel(s) in, mono out, {} Hz)",
        report.input_duration_secs,
        report.output_duration_secs,
        report.source_channels,
        report.sample_rate
    );
    println!(
        "Trimmed: {} leading, {} trailing samples",
        report.trimmed_leading, report.trimmed_trailing
    );
    println!(
        "Level: {:.1} dBFS RMS -> {:.1} dBFS RMS, peak {:.1} dBFS (gain x{:.3}{})",
        report.pre_normalize.rms_db(),
        report.output.rms_db(),
        report.output.peak_db(),
        report.applied_gain,
        if report.peak_limited { ", peak limited" } else { "" }
    );
    for (stage, reason) in &report.skipped {
        println!("Skipped {}: {}", stage, reason);
    }
    println!("SHA-256: {}", digest_hex(wav));
}

fn print_verdict(verdict: &ValidationResult) {
    if verdict.valid {
        println!("Valid sample ({:.1}s)", verdict.duration_secs);
    } else {
        println!(
            "Not usable: {}",
            verdict.message.as_deref().unwrap_or("unknown reason")
        );
    }
}
