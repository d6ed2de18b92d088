//! Adaptive response compression for Tilapia
//!
//! Provides automatic response compression with support for:
//! - brotli (best ratio, modern browsers)
//! - gzip (universal)
//! - deflate (zlib container, legacy clients)
//!
//! Features:
//! - Content-type aware (allow/deny lists, deny wins)
//! - Accept-Encoding negotiation with a fixed `br > gzip > deflate` preference
//! - Concurrent trial compression that keeps the smallest output
//! - Savings gate: a result is only applied when it is meaningfully smaller
//! - Streaming compression for unbounded bodies with back-pressure

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod algorithm;
pub mod buffered;
pub mod codec;
pub mod config;
pub mod engine;
mod headers;
pub mod negotiate;
pub mod policy;
pub mod stream;
pub mod streaming;
pub mod types;

pub use algorithm::{Algorithm, PREFERENCE};
pub use buffered::BufferedCompression;
pub use codec::{Codec, NativeCodec};
pub use config::{CompressionConfig, ConfigFormat, ENABLED_ENV_VAR};
pub use engine::CompressionEngine;
pub use negotiate::{EncodingNegotiator, NegotiatedAlgorithms};
pub use policy::ContentTypePolicy;
pub use stream::encode_stream;
pub use streaming::StreamCompression;
pub use types::{CompressionOptions, CompressionResult};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::algorithm::Algorithm;
    pub use crate::buffered::BufferedCompression;
    pub use crate::config::CompressionConfig;
    pub use crate::engine::CompressionEngine;
    pub use crate::negotiate::EncodingNegotiator;
    pub use crate::streaming::StreamCompression;
    pub use crate::types::{CompressionOptions, CompressionResult};
    pub use tilapia_core::middleware::{Middleware, Next};
}
