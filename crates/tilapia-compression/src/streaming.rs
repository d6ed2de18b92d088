//! Compression middleware for streaming responses
//!
//! A stream cannot be buffered and tried against several codecs, so the best
//! advertised algorithm is committed to before any bytes flow. Headers are
//! rewritten first, then the encoder is spliced between the source and the
//! sink. Once the headers are out, a codec failure mid-stream surfaces as a
//! body error; there is no fallback to identity.

use crate::config::CompressionConfig;
use crate::headers::append_vary;
use crate::negotiate::EncodingNegotiator;
use crate::stream::encode_stream;
use async_trait::async_trait;
use http::header::{ACCEPT_ENCODING, ACCEPT_RANGES, CONTENT_ENCODING, CONTENT_LENGTH};
use http::{HeaderValue, Request, Response};
use std::sync::Arc;
use tilapia_core::{Body, Middleware, Next, Result};
use tracing::debug;

/// Streaming response compression middleware
#[derive(Debug, Clone)]
pub struct StreamCompression {
    config: Arc<CompressionConfig>,
}

impl StreamCompression {
    /// Create a new streaming compression middleware
    pub fn new(config: CompressionConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Wrap the body of a streaming `response` in an encoder.
    ///
    /// Materialized responses pass through unchanged.
    pub fn compress_response(
        &self,
        accept_encoding: Option<&HeaderValue>,
        response: Response<Body>,
    ) -> Response<Body> {
        if !self.config.enabled {
            return response;
        }

        // Commit to the best advertised algorithm up front
        let candidates = EncodingNegotiator::from_header(accept_encoding);
        let Some(algorithm) = EncodingNegotiator::best_of(&candidates) else {
            return response;
        };

        // Don't compress if already encoded
        if response.headers().contains_key(CONTENT_ENCODING) {
            return response;
        }

        let (mut parts, body) = response.into_parts();
        let source = match body {
            Body::Stream(source) => source,
            other => return Response::from_parts(parts, other),
        };

        // Update headers before any bytes flow
        parts.headers.insert(CONTENT_ENCODING, algorithm.header_value());
        append_vary(&mut parts.headers);
        // Encoded length is unknown and byte ranges no longer line up
        parts.headers.remove(CONTENT_LENGTH);
        parts.headers.remove(ACCEPT_RANGES);

        debug!(algorithm = algorithm.as_str(), "stream.compressed");

        Response::from_parts(
            parts,
            Body::Stream(encode_stream(source, algorithm, &self.config.options)),
        )
    }
}

impl Default for StreamCompression {
    fn default() -> Self {
        Self::new(CompressionConfig::default())
    }
}

#[async_trait]
impl Middleware for StreamCompression {
    async fn call(&self, req: Request<Body>, next: Next) -> Result<Response<Body>> {
        if !self.config.enabled {
            return next.run(req).await;
        }

        let accept_encoding = req.headers().get(ACCEPT_ENCODING).cloned();
        let response = next.run(req).await?;

        Ok(self.compress_response(accept_encoding.as_ref(), response))
    }
}
