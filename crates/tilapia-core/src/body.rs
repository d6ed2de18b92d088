//! Response body type
//!
//! A response leaves a handler in one of three shapes: bytes that are already
//! materialized, a JSON value that still has to be serialized, or a stream of
//! byte chunks whose total length is not known up front.

use crate::{Error, Result};
use bytes::Bytes;
use futures::Stream;
use http_body::{Frame, SizeHint};
use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Boxed stream of body chunks
pub type BodyStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// HTTP body produced by handlers and consumed by middleware
pub enum Body {
    /// Fully materialized bytes
    Full(Bytes),
    /// Response value awaiting serialization
    Json(serde_json::Value),
    /// Incremental byte source
    Stream(BodyStream),
}

impl Body {
    /// Create an empty body
    pub fn empty() -> Self {
        Body::Full(Bytes::new())
    }

    /// Create a body from a JSON value
    pub fn json(value: serde_json::Value) -> Self {
        Body::Json(value)
    }

    /// Create a streaming body
    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Body::Stream(Box::pin(stream))
    }

    /// Whether the body is stream-shaped
    pub fn is_stream(&self) -> bool {
        matches!(self, Body::Stream(_))
    }

    /// Serialize the body into contiguous bytes.
    ///
    /// Fails with [`Error::BodyNotMaterialized`] for streams.
    pub fn to_bytes(&self) -> Result<Bytes> {
        match self {
            Body::Full(bytes) => Ok(bytes.clone()),
            Body::Json(value) => Ok(Bytes::from(serde_json::to_vec(value)?)),
            Body::Stream(_) => Err(Error::BodyNotMaterialized),
        }
    }

    /// Consume the body into contiguous bytes
    pub fn into_bytes(self) -> Result<Bytes> {
        match self {
            Body::Full(bytes) => Ok(bytes),
            other => other.to_bytes(),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Full(bytes) => f.debug_tuple("Full").field(&bytes.len()).finish(),
            Body::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Body::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Full(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Full(Bytes::from(bytes))
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Full(Bytes::from(s))
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Body::Full(Bytes::from_static(s.as_bytes()))
    }
}

impl From<serde_json::Value> for Body {
    fn from(value: serde_json::Value) -> Self {
        Body::Json(value)
    }
}

impl http_body::Body for Body {
    type Data = Bytes;
    type Error = Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        match this {
            Body::Full(bytes) => {
                if bytes.is_empty() {
                    Poll::Ready(None)
                } else {
                    Poll::Ready(Some(Ok(Frame::data(std::mem::take(bytes)))))
                }
            }
            Body::Json(value) => {
                let serialized = serde_json::to_vec(value);
                *this = Body::empty();
                Poll::Ready(Some(
                    serialized
                        .map(|data| Frame::data(Bytes::from(data)))
                        .map_err(Error::from),
                ))
            }
            Body::Stream(stream) => stream
                .as_mut()
                .poll_next(cx)
                .map(|chunk| chunk.map(|r| r.map(Frame::data).map_err(Error::from))),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Body::Full(bytes) => bytes.is_empty(),
            _ => false,
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            Body::Full(bytes) => SizeHint::with_exact(bytes.len() as u64),
            _ => SizeHint::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_full_body_collect() {
        let body = Body::from("pond-7 dissolved oxygen nominal");
        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(&collected[..], b"pond-7 dissolved oxygen nominal");
    }

    #[tokio::test]
    async fn test_json_body_serializes_once() {
        let body = Body::json(serde_json::json!({ "pond": 7, "ph": 7.2 }));
        let collected = body.collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&collected).unwrap();
        assert_eq!(value["pond"], 7);
    }

    #[tokio::test]
    async fn test_stream_body_collect() {
        let chunks = vec![Ok(Bytes::from("batch-")), Ok(Bytes::from("42"))];
        let body = Body::stream(stream::iter(chunks));
        assert!(body.is_stream());
        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(&collected[..], b"batch-42");
    }

    #[test]
    fn test_stream_cannot_materialize() {
        let body = Body::stream(stream::empty());
        assert!(matches!(body.to_bytes(), Err(Error::BodyNotMaterialized)));
    }

    #[test]
    fn test_size_hint() {
        use http_body::Body as _;
        let body = Body::from(vec![0u8; 16]);
        assert_eq!(body.size_hint().exact(), Some(16));
        assert!(Body::empty().is_end_stream());
    }
}
