//! CLI Module
//!
//! Command-line interface for the voiceprep pipeline.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::pipeline::ValidationPolicy;

/// voiceprep - Prepare voice recordings for voice cloning
#[derive(Parser, Debug)]
#[command(name = "voiceprep")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Named validation policies
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicyPreset {
    /// 60 to 120 seconds, at least 50 KB
    InstantClone,
    /// Size check only
    Basic,
    /// Skip validation
    None,
}

impl PolicyPreset {
    pub fn policy(&self) -> Option<ValidationPolicy> {
        match self {
            PolicyPreset::InstantClone => Some(ValidationPolicy::instant_clone()),
            PolicyPreset::Basic => Some(ValidationPolicy::default()),
            PolicyPreset::None => None,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Preprocess a recording into a mono 16-bit WAV
    #[command(name = "process")]
    Process {
        /// Input recording (any supported container/codec)
        input: PathBuf,

        /// Output WAV path
        #[arg(short, long)]
        output: PathBuf,

        /// JSON pipeline configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output sample rate, overrides the configuration
        #[arg(long)]
        sample_rate: Option<u32>,

        /// Validate the result against a policy
        #[arg(long, value_enum, default_value_t = PolicyPreset::InstantClone)]
        policy: PolicyPreset,
    },

    /// Check whether a recording is usable as a voice sample
    #[command(name = "validate")]
    Validate {
        /// File to check
        input: PathBuf,

        /// Minimum duration in seconds
        #[arg(long)]
        min_secs: Option<f64>,

        /// Maximum duration in seconds
        #[arg(long)]
        max_secs: Option<f64>,

        /// Minimum size in bytes
        #[arg(long, default_value_t = crate::pipeline::DEFAULT_MIN_BYTES)]
        min_bytes: usize,

        /// Print the verdict as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the format of a WAV file
    #[command(name = "inspect")]
    Inspect {
        /// WAV file
        input: PathBuf,
    },

    /// Preprocess every recording in a directory
    #[command(name = "batch")]
    Batch {
        /// Directory to scan recursively
        input_dir: PathBuf,

        /// Directory for the produced WAV files
        #[arg(short, long)]
        output_dir: PathBuf,

        /// JSON pipeline configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
