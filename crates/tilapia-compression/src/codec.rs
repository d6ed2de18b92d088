//! Block codecs for gzip, deflate (zlib) and brotli

use crate::algorithm::Algorithm;
use std::fmt;
use std::io::{self, Read, Write};

/// A block encoder for one algorithm
pub trait Codec: Send + Sync + fmt::Debug {
    /// Algorithm this codec produces
    fn algorithm(&self) -> Algorithm;

    /// Encode `data` at `level`
    fn encode(&self, data: &[u8], level: u32) -> io::Result<Vec<u8>>;
}

/// Codec backed by flate2 and brotli
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeCodec(pub Algorithm);

impl Codec for NativeCodec {
    fn algorithm(&self) -> Algorithm {
        self.0
    }

    fn encode(&self, data: &[u8], level: u32) -> io::Result<Vec<u8>> {
        encode(self.0, data, level)
    }
}

/// Compress `data` with `algorithm`
pub fn encode(algorithm: Algorithm, data: &[u8], level: u32) -> io::Result<Vec<u8>> {
    match algorithm {
        Algorithm::Gzip => encode_gzip(data, level),
        Algorithm::Deflate => encode_deflate(data, level),
        Algorithm::Brotli => encode_brotli(data, level),
    }
}

/// Decompress `data` produced by `algorithm`
pub fn decode(algorithm: Algorithm, data: &[u8]) -> io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len().saturating_mul(4));
    match algorithm {
        Algorithm::Gzip => {
            flate2::read::GzDecoder::new(data).read_to_end(&mut out)?;
        }
        Algorithm::Deflate => {
            flate2::read::ZlibDecoder::new(data).read_to_end(&mut out)?;
        }
        Algorithm::Brotli => {
            brotli::BrotliDecompress(&mut &data[..], &mut out)?;
        }
    }
    Ok(out)
}

fn encode_gzip(data: &[u8], level: u32) -> io::Result<Vec<u8>> {
    let mut encoder = flate2::write::GzEncoder::new(
        Vec::with_capacity(data.len() / 2),
        flate2::Compression::new(level.min(9)),
    );
    encoder.write_all(data)?;
    encoder.finish()
}

fn encode_deflate(data: &[u8], level: u32) -> io::Result<Vec<u8>> {
    let mut encoder = flate2::write::ZlibEncoder::new(
        Vec::with_capacity(data.len() / 2),
        flate2::Compression::new(level.min(9)),
    );
    encoder.write_all(data)?;
    encoder.finish()
}

fn encode_brotli(data: &[u8], level: u32) -> io::Result<Vec<u8>> {
    let mut compressed = Vec::with_capacity(data.len() / 2);
    let params = brotli::enc::BrotliEncoderParams {
        quality: level.min(11) as i32,
        size_hint: data.len(),
        ..Default::default()
    };

    brotli::BrotliCompress(&mut &data[..], &mut compressed, &params)?;
    Ok(compressed)
}
