//! Compression options and results

use crate::algorithm::Algorithm;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tilapia_core::{Error, Result};

/// Lowest level accepted by every supported codec
pub const MIN_LEVEL: u32 = 1;

/// Highest level accepted by every supported codec
pub const MAX_LEVEL: u32 = 9;

/// Per-attempt compression settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionOptions {
    /// Compression effort (1-9)
    #[serde(default = "default_level")]
    pub level: u32,

    /// Payloads shorter than this many bytes are not compressed
    #[serde(default = "default_threshold")]
    pub threshold: usize,

    /// Buffer size for streaming encoders (in bytes)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_level() -> u32 {
    6
}

fn default_threshold() -> usize {
    1024
}

fn default_chunk_size() -> usize {
    16 * 1024
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            level: default_level(),
            threshold: default_threshold(),
            chunk_size: default_chunk_size(),
        }
    }
}

impl CompressionOptions {
    /// Set the compression level
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    /// Set the minimum payload size
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    /// Check that every codec accepts these options
    pub fn validate(&self) -> Result<()> {
        if !(MIN_LEVEL..=MAX_LEVEL).contains(&self.level) {
            return Err(Error::InvalidOptions(format!(
                "level must be between {MIN_LEVEL} and {MAX_LEVEL}, got {}",
                self.level
            )));
        }
        if self.chunk_size == 0 {
            return Err(Error::InvalidOptions(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of one compression attempt
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionResult {
    /// Whether an algorithm was applied
    pub compressed: bool,
    /// Input length in bytes
    pub original_size: usize,
    /// Output length in bytes
    pub compressed_size: usize,
    /// `compressed_size / original_size`, 1.0 when nothing was applied
    pub compression_ratio: f64,
    /// Algorithm applied, `None` when uncompressed
    pub algorithm: Option<Algorithm>,
    /// Output bytes (the input when uncompressed)
    pub data: Bytes,
}

impl CompressionResult {
    /// A result that leaves the payload untouched
    pub fn uncompressed(payload: Bytes) -> Self {
        let size = payload.len();
        Self {
            compressed: false,
            original_size: size,
            compressed_size: size,
            compression_ratio: 1.0,
            algorithm: None,
            data: payload,
        }
    }

    /// A result produced by `algorithm`
    pub fn encoded(original_size: usize, algorithm: Algorithm, data: Bytes) -> Self {
        let compressed_size = data.len();
        let compression_ratio = if original_size == 0 {
            1.0
        } else {
            compressed_size as f64 / original_size as f64
        };

        Self {
            compressed: true,
            original_size,
            compressed_size,
            compression_ratio,
            algorithm: Some(algorithm),
            data,
        }
    }

    /// Encoding token, `"none"` when uncompressed
    pub fn algorithm_name(&self) -> &'static str {
        self.algorithm.map_or("none", |a| a.as_str())
    }

    /// Whether the result is compressed and beats `max_ratio`
    pub fn saves(&self, max_ratio: f64) -> bool {
        self.compressed && self.compression_ratio < max_ratio
    }
}
