//! Streaming encoder transform
//!
//! The source stream is adapted into an `AsyncBufRead`, passed through an
//! async-compression encoder and re-chunked. Nothing is read from the source
//! until the returned stream is polled, so the sink's consumption rate drives
//! the whole pipe. Dropping the returned stream drops the source.

use crate::algorithm::Algorithm;
use crate::types::CompressionOptions;
use async_compression::tokio::bufread::{BrotliEncoder, GzipEncoder, ZlibEncoder};
use async_compression::Level;
use tilapia_core::BodyStream;
use tokio_util::io::{ReaderStream, StreamReader};

/// Splice an encoder for `algorithm` onto `source`
pub fn encode_stream(
    source: BodyStream,
    algorithm: Algorithm,
    options: &CompressionOptions,
) -> BodyStream {
    let reader = StreamReader::new(source);
    let level = Level::Precise(options.level as i32);
    let capacity = options.chunk_size.max(1);

    match algorithm {
        Algorithm::Brotli => Box::pin(ReaderStream::with_capacity(
            BrotliEncoder::with_quality(reader, level),
            capacity,
        )),
        Algorithm::Gzip => Box::pin(ReaderStream::with_capacity(
            GzipEncoder::with_quality(reader, level),
            capacity,
        )),
        Algorithm::Deflate => Box::pin(ReaderStream::with_capacity(
            ZlibEncoder::with_quality(reader, level),
            capacity,
        )),
    }
}
