//! # GZIP Bitstring Codec
//!
//! Lossless compression of status bitstrings. Status lists are mostly zero
//! bits and shrink well at any level. The level is chosen by input size:
//!
//! | Input size | Level |
//! |---|---|
//! | < 1 KiB | 9 |
//! | 1 KiB to 100 KiB | 6 |
//! | > 100 KiB | 3 |

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;

use crate::bitstring::Bitstring;
use crate::error::CompressionError;

const SMALL_INPUT: usize = 1024;
const LARGE_INPUT: usize = 100 * 1024;

/// Largest inflated output [`decompress`] accepts.
pub const MAX_DECOMPRESSED_BYTES: u64 = 16 * 1024 * 1024;

/// GZIP magic bytes.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Knobs for [`compress`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompressionOptions {
    /// Explicit level (0-9). `None` picks by input size.
    pub level: Option<u32>,
}

impl CompressionOptions {
    pub fn with_level(level: u32) -> Self {
        Self { level: Some(level) }
    }
}

/// Outcome of a compression run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionStats {
    pub original_size: usize,
    pub compressed_size: usize,
    /// `compressed_size / original_size`, 1.0 for empty input.
    pub ratio: f64,
    pub level: u32,
}

/// Level chosen for an input of `size` bytes.
pub fn level_for_size(size: usize) -> u32 {
    if size < SMALL_INPUT {
        9
    } else if size <= LARGE_INPUT {
        6
    } else {
        3
    }
}

pub fn compress(bytes: &[u8], options: &CompressionOptions) -> Result<Vec<u8>, CompressionError> {
    compress_with_stats(bytes, options).map(|(out, _)| out)
}

/// Compress and report sizes and the level used.
pub fn compress_with_stats(
    bytes: &[u8],
    options: &CompressionOptions,
) -> Result<(Vec<u8>, CompressionStats), CompressionError> {
    let level = match options.level {
        Some(level) if level > 9 => return Err(CompressionError::InvalidLevel(level)),
        Some(level) => level,
        None => level_for_size(bytes.len()),
    };

    let mut encoder = GzEncoder::new(Vec::new(), Compression::new(level));
    encoder.write_all(bytes)?;
    let compressed = encoder.finish()?;

    let ratio = if bytes.is_empty() {
        1.0
    } else {
        compressed.len() as f64 / bytes.len() as f64
    };
    let stats = CompressionStats {
        original_size: bytes.len(),
        compressed_size: compressed.len(),
        ratio,
        level,
    };
    tracing::trace!(
        original = stats.original_size,
        compressed = stats.compressed_size,
        level,
        "compressed bitstring"
    );
    Ok((compressed, stats))
}

/// Inflate a GZIP stream. Non-GZIP or truncated input is an error, and so is
/// output larger than [`MAX_DECOMPRESSED_BYTES`].
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>, CompressionError> {
    decompress_limited(bytes, MAX_DECOMPRESSED_BYTES)
}

/// [`decompress`] with an explicit output cap.
pub fn decompress_limited(bytes: &[u8], limit: u64) -> Result<Vec<u8>, CompressionError> {
    let mut decoder = GzDecoder::new(bytes).take(limit.saturating_add(1));
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    if out.len() as u64 > limit {
        return Err(CompressionError::TooLarge { limit });
    }
    Ok(out)
}

/// Whether `bytes` starts with the GZIP magic number.
pub fn looks_compressed(bytes: &[u8]) -> bool {
    bytes.starts_with(&GZIP_MAGIC)
}

/// Predicted `compressed / original` ratio for a bitstring whose fraction of
/// set bits is `density`.
pub fn estimate_compression_ratio(density: f64) -> f64 {
    if density <= 0.001 {
        0.05
    } else if density <= 0.01 {
        0.1
    } else if density <= 0.05 {
        0.2
    } else if density <= 0.1 {
        0.35
    } else {
        0.5
    }
}

/// [`estimate_compression_ratio`] for a concrete bitstring.
pub fn estimate_for(bits: &Bitstring) -> f64 {
    estimate_compression_ratio(bits.density())
}
