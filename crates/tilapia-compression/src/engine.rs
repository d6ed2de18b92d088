//! Multi-algorithm trial compression
//!
//! The engine encodes a payload with every candidate codec concurrently and
//! keeps the smallest output. Attempts run on the blocking pool inside a
//! [`JoinSet`] owned by the calling future, so dropping that future (for
//! example when the request is aborted) aborts attempts that have not
//! finished yet.

use crate::algorithm::{Algorithm, PREFERENCE};
use crate::codec::{self, Codec, NativeCodec};
use crate::negotiate::NegotiatedAlgorithms;
use crate::types::{CompressionOptions, CompressionResult};
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use tilapia_core::{Error, Result};
use tokio::task::JoinSet;
use tracing::{debug, trace, warn};

/// Concurrent best-of-N compressor
#[derive(Clone)]
pub struct CompressionEngine {
    codecs: Arc<[Arc<dyn Codec>]>,
}

impl CompressionEngine {
    /// Engine with the native gzip, deflate and brotli codecs
    pub fn new() -> Self {
        Self::with_codecs(
            PREFERENCE
                .iter()
                .map(|&algorithm| Arc::new(NativeCodec(algorithm)) as Arc<dyn Codec>)
                .collect(),
        )
    }

    /// Engine with custom codecs.
    ///
    /// Codecs are kept in preference order so that equal outputs resolve to
    /// the preferred algorithm.
    pub fn with_codecs(mut codecs: Vec<Arc<dyn Codec>>) -> Self {
        codecs.sort_by_key(|codec| codec.algorithm().rank());
        Self {
            codecs: codecs.into(),
        }
    }

    /// Compress with every codec and keep the smallest output
    pub async fn compress(&self, payload: Bytes, options: &CompressionOptions) -> CompressionResult {
        self.compress_among(payload, options, &NegotiatedAlgorithms::all())
            .await
    }

    /// Compress with the codecs in `candidates` and keep the smallest output.
    ///
    /// Never fails: payloads under `options.threshold` and total codec
    /// failure both yield an uncompressed result.
    pub async fn compress_among(
        &self,
        payload: Bytes,
        options: &CompressionOptions,
        candidates: &NegotiatedAlgorithms,
    ) -> CompressionResult {
        if payload.len() < options.threshold {
            trace!(
                size = payload.len(),
                threshold = options.threshold,
                "Payload below threshold, skipping compression"
            );
            return CompressionResult::uncompressed(payload);
        }

        // Only trial the algorithms the caller can accept
        let codecs: Vec<&Arc<dyn Codec>> = self
            .codecs
            .iter()
            .filter(|codec| candidates.contains(codec.algorithm()))
            .collect();

        // Fan out onto the blocking pool, one attempt per codec
        let mut attempts = JoinSet::new();
        for (slot, codec) in codecs.iter().enumerate() {
            let codec = Arc::clone(*codec);
            let data = payload.clone();
            let level = options.level;
            attempts.spawn_blocking(move || (slot, codec.algorithm(), codec.encode(&data, level)));
        }

        let mut outputs: Vec<Option<(Algorithm, Vec<u8>)>> = vec![None; codecs.len()];
        while let Some(joined) = attempts.join_next().await {
            match joined {
                Ok((slot, algorithm, Ok(data))) => outputs[slot] = Some((algorithm, data)),
                Ok((_, algorithm, Err(e))) => {
                    debug!(algorithm = %algorithm, error = %e, "Compression attempt failed");
                }
                Err(e) => warn!(error = %e, "Compression attempt did not complete"),
            }
        }

        // First minimum in preference order wins ties.
        let best = outputs
            .into_iter()
            .flatten()
            .fold(None::<(Algorithm, Vec<u8>)>, |best, candidate| match best {
                Some(current) if current.1.len() <= candidate.1.len() => Some(current),
                _ => Some(candidate),
            });

        match best {
            Some((algorithm, data)) => {
                CompressionResult::encoded(payload.len(), algorithm, Bytes::from(data))
            }
            None => {
                warn!(size = payload.len(), "All compression attempts failed");
                CompressionResult::uncompressed(payload)
            }
        }
    }

    /// Compress with a single algorithm.
    ///
    /// Unlike [`compress`](Self::compress), codec failures are returned.
    pub async fn compress_with(
        &self,
        payload: Bytes,
        options: &CompressionOptions,
        algorithm: Algorithm,
    ) -> Result<CompressionResult> {
        if payload.len() < options.threshold {
            return Ok(CompressionResult::uncompressed(payload));
        }

        // Fall back to the native codec if none was registered
        let codec = self
            .codecs
            .iter()
            .find(|codec| codec.algorithm() == algorithm)
            .cloned()
            .unwrap_or_else(|| Arc::new(NativeCodec(algorithm)) as Arc<dyn Codec>);
        let data = payload.clone();
        let level = options.level;

        let encoded = tokio::task::spawn_blocking(move || codec.encode(&data, level))
            .await
            .map_err(|e| Error::Internal(format!("Compression task failed: {e}")))?
            .map_err(|e| Error::codec(algorithm.as_str(), e))?;

        Ok(CompressionResult::encoded(
            payload.len(),
            algorithm,
            Bytes::from(encoded),
        ))
    }

    /// Decompress `payload` encoded with the `algorithm` token
    pub fn decompress(&self, payload: &[u8], algorithm: &str) -> Result<Bytes> {
        self.decompress_with(payload, algorithm.parse()?)
    }

    /// Decompress `payload` encoded with `algorithm`
    pub fn decompress_with(&self, payload: &[u8], algorithm: Algorithm) -> Result<Bytes> {
        codec::decode(algorithm, payload)
            .map(Bytes::from)
            .map_err(|e| Error::codec(algorithm.as_str(), e))
    }
}

impl Default for CompressionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CompressionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompressionEngine")
            .field(
                "codecs",
                &self
                    .codecs
                    .iter()
                    .map(|codec| codec.algorithm())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}
