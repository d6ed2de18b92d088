//! End-to-end tests for the compression middleware stack

use bytes::Bytes;
use futures::stream;
use http::header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, VARY};
use http::{Request, Response, StatusCode};
use http_body_util::BodyExt;
use std::sync::Arc;
use tilapia_compression::prelude::*;
use tilapia_compression::{codec, Algorithm};
use tilapia_core::Body;

/// A JSON document of exactly `len` bytes describing water-quality readings
fn readings_document(len: usize) -> Bytes {
    let mut doc = String::from("{\"readings\":[");
    let mut i = 0;
    while doc.len() < len - 64 {
        doc.push_str(&format!(
            "{{\"pond\":{},\"ph\":7.{},\"temp\":2{}.{}}},",
            i % 12,
            i % 10,
            i % 9,
            i % 7
        ));
        i += 1;
    }
    doc.push_str("{\"pond\":0}],\"note\":\"");
    while doc.len() < len - 2 {
        doc.push('x');
    }
    doc.push_str("\"}");
    assert_eq!(doc.len(), len);
    Bytes::from(doc)
}

fn stack(handler_body: fn() -> Body, content_type: &'static str) -> Next {
    let middleware: Arc<[Arc<dyn Middleware>]> = Arc::new([
        Arc::new(StreamCompression::default()) as Arc<dyn Middleware>,
        Arc::new(BufferedCompression::default()) as Arc<dyn Middleware>,
    ]);
    Next::with_handler(
        middleware,
        Box::new(move |_req| {
            Box::pin(async move {
                Response::builder()
                    .status(StatusCode::OK)
                    .header(CONTENT_TYPE, content_type)
                    .body(handler_body())
                    .map_err(tilapia_core::Error::from)
            })
        }),
    )
}

fn request(accept_encoding: &'static str) -> Request<Body> {
    Request::builder()
        .uri("/farms/3/water-quality")
        .header(ACCEPT_ENCODING, accept_encoding)
        .body(Body::empty())
        .unwrap()
}

fn document_5000() -> Body {
    Body::Full(readings_document(5000))
}

#[tokio::test]
async fn brotli_preferred_for_json() {
    let response = stack(document_5000, "application/json")
        .run(request("gzip, br"))
        .await
        .unwrap();

    assert_eq!(response.headers().get(CONTENT_ENCODING).unwrap(), "br");
    assert_eq!(response.headers().get(VARY).unwrap(), "Accept-Encoding");

    let length: usize = response
        .headers()
        .get(CONTENT_LENGTH)
        .unwrap()
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(length, body.len());
    assert_eq!(
        codec::decode(Algorithm::Brotli, &body).unwrap(),
        readings_document(5000)
    );
}

#[tokio::test]
async fn identity_only_is_untouched() {
    let response = stack(document_5000, "application/json")
        .run(request("identity"))
        .await
        .unwrap();

    assert!(!response.headers().contains_key(CONTENT_ENCODING));
    assert!(!response.headers().contains_key(VARY));
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body, readings_document(5000));
}

#[tokio::test]
async fn small_body_is_untouched() {
    fn small() -> Body {
        Body::Full(readings_document(500))
    }

    for accept in ["br", "gzip", "deflate", "gzip, deflate, br"] {
        let response = stack(small, "application/json")
            .run(request(accept))
            .await
            .unwrap();
        assert!(!response.headers().contains_key(CONTENT_ENCODING));
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, readings_document(500));
    }
}

#[tokio::test]
async fn vary_token_not_duplicated() {
    let middleware = BufferedCompression::default();
    let response = Response::builder()
        .header(CONTENT_TYPE, "text/html")
        .header(VARY, "Accept-Encoding")
        .body(Body::Full(readings_document(3000)))
        .unwrap();

    let accept = http::HeaderValue::from_static("gzip");
    let response = middleware.compress_response(Some(&accept), response).await;

    assert_eq!(response.headers().get(CONTENT_ENCODING).unwrap(), "gzip");
    let vary: Vec<_> = response.headers().get_all(VARY).iter().collect();
    assert_eq!(vary, vec!["Accept-Encoding"]);
}

#[tokio::test]
async fn streamed_export_uses_best_advertised_algorithm() {
    fn export() -> Body {
        Body::stream(stream::iter((0..1000).map(|i| {
            Ok::<_, std::io::Error>(Bytes::from(format!("batch-{},tilapia,{}g\n", i, 300 + i % 50)))
        })))
    }

    let response = stack(export, "text/csv")
        .run(request("deflate;q=1.0, gzip;q=0.5"))
        .await
        .unwrap();

    assert_eq!(response.headers().get(CONTENT_ENCODING).unwrap(), "gzip");
    assert!(!response.headers().contains_key(CONTENT_LENGTH));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let decoded = codec::decode(Algorithm::Gzip, &body).unwrap();
    assert!(decoded.starts_with(b"batch-0,tilapia,300g\n"));
    assert!(decoded.ends_with(b"batch-999,tilapia,349g\n"));
}

#[tokio::test]
async fn engine_decompress_rejects_unknown_token() {
    let engine = CompressionEngine::new();
    let err = engine.decompress(b"\x28\xb5\x2f\xfd", "zstd").unwrap_err();
    assert!(matches!(
        err,
        tilapia_core::Error::UnsupportedAlgorithm(token) if token == "zstd"
    ));
}
