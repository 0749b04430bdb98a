//! Audio Engine Module
//!
//! Byte-level ends of the pipeline and the buffers passed between them:
//! - Audio buffer types and level measurement
//! - Decoding of compressed blobs
//! - WAV encoding and inspection

pub mod buffer;
pub mod decode;
#[cfg(feature = "opus")]
mod opus_decoder;
pub mod wav;

pub use buffer::{
    db_to_linear, linear_to_db, LevelStats, MonoBuffer, RawAudioBuffer, DEFAULT_SAMPLE_RATE,
    MAX_SAMPLE_RATE, MIN_SAMPLE_RATE,
};
pub use decode::{decode, decode_native, DecodeSession};
pub use wav::{
    encode_wav, inspect_wav, sample_to_i16, verify_header, WavContainer, WavInfo, WAV_HEADER_LEN,
};
