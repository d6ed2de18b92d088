//! Compression middleware for materialized responses
//!
//! Gates, in order: feature switch, Accept-Encoding negotiation, no existing
//! Content-Encoding, compressible Content-Type, serialized size. When every
//! gate passes the engine trial-compresses the payload with the advertised
//! algorithms and the smallest output is applied if it saves enough.
//! Compression problems never fail the request.

use crate::config::CompressionConfig;
use crate::engine::CompressionEngine;
use crate::headers::{append_vary, content_type};
use crate::negotiate::EncodingNegotiator;
use async_trait::async_trait;
use http::header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH, TRANSFER_ENCODING};
use http::{HeaderValue, Request, Response};
use std::sync::Arc;
use tilapia_core::{Body, Middleware, Next, Result};
use tracing::{debug, trace, warn};

/// Buffered response compression middleware
#[derive(Debug, Clone)]
pub struct BufferedCompression {
    config: Arc<CompressionConfig>,
    engine: CompressionEngine,
}

impl BufferedCompression {
    /// Create a new middleware with the native codecs
    pub fn new(config: CompressionConfig) -> Self {
        Self::with_engine(config, CompressionEngine::new())
    }

    /// Create a new middleware with a custom engine
    pub fn with_engine(config: CompressionConfig, engine: CompressionEngine) -> Self {
        Self {
            config: Arc::new(config),
            engine,
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    /// Compress `response` for a client that sent `accept_encoding`.
    ///
    /// Returns the response untouched when any gate fails.
    pub async fn compress_response(
        &self,
        accept_encoding: Option<&HeaderValue>,
        response: Response<Body>,
    ) -> Response<Body> {
        if !self.config.enabled {
            return response;
        }

        // Negotiate against Accept-Encoding
        let candidates = EncodingNegotiator::from_header(accept_encoding);
        if EncodingNegotiator::best_of(&candidates).is_none() {
            return response;
        }

        // Streams belong to StreamCompression
        if response.body().is_stream() {
            return response;
        }

        // Don't compress if already encoded
        if response.headers().contains_key(CONTENT_ENCODING) {
            trace!("Response already encoded, skipping compression");
            return response;
        }

        // Check content type
        let compressible = content_type(response.headers())
            .map(|ct| self.config.content_types.is_compressible(ct))
            .unwrap_or(false);
        if !compressible {
            return response;
        }

        // Serialize the body
        let payload = match response.body().to_bytes() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "compression.error");
                return response;
            }
        };

        // Check size before paying for the engine
        if payload.len() < self.config.min_response_size {
            return response;
        }

        let result = self
            .engine
            .compress_among(payload.clone(), &self.config.options, &candidates)
            .await;

        let (mut parts, _) = response.into_parts();
        append_vary(&mut parts.headers);

        // Above the engine threshold, no algorithm means every codec failed
        if result.algorithm.is_none() && payload.len() >= self.config.options.threshold {
            warn!(
                error = "all codecs failed",
                candidates = candidates.len(),
                size = payload.len(),
                "compression.error"
            );
            return Response::from_parts(parts, Body::Full(payload));
        }

        // Only use the compressed version if it saves enough
        let algorithm = match result.algorithm {
            Some(algorithm) if result.saves(self.config.max_ratio) => algorithm,
            _ => {
                debug!(
                    algorithm = result.algorithm_name(),
                    ratio = result.compression_ratio,
                    "Compression did not save enough, sending uncompressed"
                );
                return Response::from_parts(parts, Body::Full(payload));
            }
        };

        let length = match HeaderValue::from_str(&result.compressed_size.to_string()) {
            Ok(length) => length,
            Err(e) => {
                warn!(error = %e, "compression.error");
                return Response::from_parts(parts, Body::Full(payload));
            }
        };

        // Update headers
        parts.headers.insert(CONTENT_ENCODING, algorithm.header_value());
        parts.headers.insert(CONTENT_LENGTH, length);
        // Remove transfer-encoding if present (we're setting content-length)
        parts.headers.remove(TRANSFER_ENCODING);

        debug!(
            algorithm = algorithm.as_str(),
            original_size = result.original_size,
            compressed_size = result.compressed_size,
            ratio = result.compression_ratio,
            "response.compressed"
        );

        Response::from_parts(parts, Body::Full(result.data))
    }
}

impl Default for BufferedCompression {
    fn default() -> Self {
        Self::new(CompressionConfig::default())
    }
}

#[async_trait]
impl Middleware for BufferedCompression {
    async fn call(&self, req: Request<Body>, next: Next) -> Result<Response<Body>> {
        if !self.config.enabled {
            return next.run(req).await;
        }

        let accept_encoding = req.headers().get(ACCEPT_ENCODING).cloned();
        let response = next.run(req).await?;

        Ok(self
            .compress_response(accept_encoding.as_ref(), response)
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::Algorithm;
    use crate::codec::{self, Codec};
    use bytes::Bytes;
    use http::header::{CONTENT_TYPE, VARY};
    use http::StatusCode;
    use std::io;
    use std::sync::Mutex;

    fn pond_report(len: usize) -> Bytes {
        let row = "{\"pond\":\"west-2\",\"ammonia_ppm\":0.02,\"nitrite_ppm\":0.1},";
        Bytes::from(row.repeat(len / row.len() + 1)[..len].to_string())
    }

    fn json_response(body: Bytes) -> Response<Body> {
        Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::Full(body))
            .unwrap()
    }

    fn accept(value: &'static str) -> HeaderValue {
        HeaderValue::from_static(value)
    }

    fn full_bytes(response: &Response<Body>) -> Bytes {
        match response.body() {
            Body::Full(bytes) => bytes.clone(),
            other => panic!("expected materialized body, got {other:?}"),
        }
    }

    #[derive(Debug)]
    struct WeakCodec(Algorithm);

    impl Codec for WeakCodec {
        fn algorithm(&self) -> Algorithm {
            self.0
        }

        // 95% of the input: valid output that does not save enough
        fn encode(&self, data: &[u8], _level: u32) -> io::Result<Vec<u8>> {
            Ok(vec![0u8; data.len() * 95 / 100])
        }
    }

    #[derive(Debug)]
    struct BrokenCodec(Algorithm);

    impl Codec for BrokenCodec {
        fn algorithm(&self) -> Algorithm {
            self.0
        }

        fn encode(&self, _data: &[u8], _level: u32) -> io::Result<Vec<u8>> {
            Err(io::Error::new(io::ErrorKind::Other, "encoder unavailable"))
        }
    }

    /// Log sink shared with a test subscriber
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[tokio::test]
    async fn test_compresses_json() {
        let middleware = BufferedCompression::default();
        let body = pond_report(4000);

        let response = middleware
            .compress_response(Some(&accept("gzip")), json_response(body.clone()))
            .await;

        assert_eq!(response.headers().get(CONTENT_ENCODING).unwrap(), "gzip");
        assert_eq!(response.headers().get(VARY).unwrap(), "Accept-Encoding");
        let compressed = full_bytes(&response);
        assert_eq!(
            response.headers().get(CONTENT_LENGTH).unwrap(),
            compressed.len().to_string().as_str()
        );
        assert_eq!(codec::decode(Algorithm::Gzip, &compressed).unwrap(), body);
    }

    #[tokio::test]
    async fn test_disabled_passthrough() {
        let middleware = BufferedCompression::new(CompressionConfig::disabled());
        let body = pond_report(4000);

        let response = middleware
            .compress_response(Some(&accept("br")), json_response(body.clone()))
            .await;

        assert!(!response.headers().contains_key(CONTENT_ENCODING));
        assert!(!response.headers().contains_key(VARY));
        assert_eq!(full_bytes(&response), body);
    }

    #[tokio::test]
    async fn test_already_encoded_is_untouched() {
        let middleware = BufferedCompression::default();
        let body = pond_report(4000);
        let mut original = json_response(body.clone());
        original
            .headers_mut()
            .insert(CONTENT_ENCODING, accept("identity"));

        let response = middleware
            .compress_response(Some(&accept("gzip, br")), original)
            .await;

        assert_eq!(response.headers().get(CONTENT_ENCODING).unwrap(), "identity");
        assert!(!response.headers().contains_key(VARY));
        assert!(!response.headers().contains_key(CONTENT_LENGTH));
        assert_eq!(full_bytes(&response), body);
    }

    #[tokio::test]
    async fn test_non_compressible_type() {
        let middleware = BufferedCompression::default();
        let response = Response::builder()
            .header(CONTENT_TYPE, "image/png")
            .body(Body::Full(pond_report(4000)))
            .unwrap();

        let response = middleware
            .compress_response(Some(&accept("gzip")), response)
            .await;
        assert!(!response.headers().contains_key(CONTENT_ENCODING));
    }

    #[tokio::test]
    async fn test_missing_content_type() {
        let middleware = BufferedCompression::default();
        let response = Response::new(Body::Full(pond_report(4000)));

        let response = middleware
            .compress_response(Some(&accept("gzip")), response)
            .await;
        assert!(!response.headers().contains_key(CONTENT_ENCODING));
    }

    #[tokio::test]
    async fn test_size_gate_independent_of_threshold() {
        let mut config = CompressionConfig::default();
        config.options.threshold = 0;
        let middleware = BufferedCompression::new(config);

        let response = middleware
            .compress_response(Some(&accept("gzip")), json_response(pond_report(1023)))
            .await;
        assert!(!response.headers().contains_key(CONTENT_ENCODING));
        assert!(!response.headers().contains_key(VARY));

        let response = middleware
            .compress_response(Some(&accept("gzip")), json_response(pond_report(1024)))
            .await;
        assert_eq!(response.headers().get(CONTENT_ENCODING).unwrap(), "gzip");
    }

    #[tokio::test]
    async fn test_savings_gate() {
        let engine = CompressionEngine::with_codecs(vec![
            Arc::new(WeakCodec(Algorithm::Brotli)) as Arc<dyn Codec>,
            Arc::new(WeakCodec(Algorithm::Gzip)) as Arc<dyn Codec>,
        ]);
        let middleware = BufferedCompression::with_engine(CompressionConfig::default(), engine);
        let body = pond_report(4000);

        let response = middleware
            .compress_response(Some(&accept("br, gzip")), json_response(body.clone()))
            .await;

        assert!(!response.headers().contains_key(CONTENT_ENCODING));
        assert!(!response.headers().contains_key(CONTENT_LENGTH));
        assert_eq!(full_bytes(&response), body);
    }

    #[tokio::test]
    async fn test_json_value_is_serialized() {
        let middleware = BufferedCompression::default();
        let readings: Vec<_> = (0..200)
            .map(|i| serde_json::json!({ "pond": i % 5, "temperature_c": 24.0 + (i % 3) as f64 }))
            .collect();
        let value = serde_json::Value::Array(readings);
        let response = Response::builder()
            .header(CONTENT_TYPE, "application/json")
            .body(Body::json(value.clone()))
            .unwrap();

        let response = middleware
            .compress_response(Some(&accept("deflate")), response)
            .await;

        assert_eq!(response.headers().get(CONTENT_ENCODING).unwrap(), "deflate");
        let decoded = codec::decode(Algorithm::Deflate, &full_bytes(&response)).unwrap();
        let restored: serde_json::Value = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(restored, value);
    }

    #[tokio::test]
    async fn test_small_json_value_keeps_value() {
        let middleware = BufferedCompression::default();
        let response = Response::builder()
            .header(CONTENT_TYPE, "application/json")
            .body(Body::json(serde_json::json!({ "ok": true })))
            .unwrap();

        let response = middleware
            .compress_response(Some(&accept("gzip")), response)
            .await;
        assert!(matches!(response.body(), Body::Json(_)));
    }

    #[tokio::test]
    async fn test_middleware_chain() {
        let stack: Arc<[Arc<dyn Middleware>]> =
            Arc::new([Arc::new(BufferedCompression::default()) as Arc<dyn Middleware>]);
        let next = Next::with_handler(
            stack,
            Box::new(|_req| {
                Box::pin(async { Ok(json_response(pond_report(3000))) })
            }),
        );

        let req = Request::builder()
            .uri("/farms/1/ponds")
            .header(ACCEPT_ENCODING, "gzip, deflate, br")
            .body(Body::empty())
            .unwrap();

        let response = next.run(req).await.unwrap();
        assert_eq!(response.headers().get(CONTENT_ENCODING).unwrap(), "br");
    }
    #[tokio::test]
    async fn test_codec_failure_logs_and_falls_back() {
        let engine = CompressionEngine::with_codecs(vec![
            Arc::new(BrokenCodec(Algorithm::Brotli)) as Arc<dyn Codec>,
            Arc::new(BrokenCodec(Algorithm::Gzip)) as Arc<dyn Codec>,
            Arc::new(BrokenCodec(Algorithm::Deflate)) as Arc<dyn Codec>,
        ]);
        let middleware = BufferedCompression::with_engine(CompressionConfig::default(), engine);
        let body = pond_report(3200);

        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let response = middleware
            .compress_response(Some(&accept("br")), json_response(body.clone()))
            .await;

        assert!(!response.headers().contains_key(CONTENT_ENCODING));
        assert!(!response.headers().contains_key(CONTENT_LENGTH));
        assert_eq!(full_bytes(&response), body);
        assert_eq!(response.headers().get(VARY).unwrap(), "Accept-Encoding");

        let output = logs.contents();
        assert!(output.contains("compression.error"), "logs: {output}");
        assert!(!output.contains("did not save enough"), "logs: {output}");
    }

    #[tokio::test]
    async fn test_savings_gate_is_not_an_error() {
        let engine = CompressionEngine::with_codecs(vec![
            Arc::new(WeakCodec(Algorithm::Gzip)) as Arc<dyn Codec>,
        ]);
        let middleware = BufferedCompression::with_engine(CompressionConfig::default(), engine);

        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let response = middleware
            .compress_response(Some(&accept("gzip")), json_response(pond_report(3200)))
            .await;

        assert!(!response.headers().contains_key(CONTENT_ENCODING));
        assert!(!logs.contents().contains("compression.error"));
    }
}
