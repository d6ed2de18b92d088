//! Accept-Encoding negotiation
//!
//! The header is scanned for the literal tokens `br`, `gzip` and `deflate`.
//! Quality values are ignored; the result always follows [`PREFERENCE`].

use crate::algorithm::{Algorithm, PREFERENCE};
use http::HeaderValue;

/// Algorithms a client advertised, most preferred first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NegotiatedAlgorithms(Vec<Algorithm>);

impl NegotiatedAlgorithms {
    /// Every supported algorithm, in preference order
    pub fn all() -> Self {
        Self(PREFERENCE.to_vec())
    }

    /// Most preferred candidate
    pub fn best(&self) -> Option<Algorithm> {
        self.0.first().copied()
    }

    /// Whether the client advertised `algorithm`
    pub fn contains(&self, algorithm: Algorithm) -> bool {
        self.0.contains(&algorithm)
    }

    /// Whether no supported algorithm was advertised
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of candidates
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate candidates in preference order
    pub fn iter(&self) -> impl Iterator<Item = Algorithm> + '_ {
        self.0.iter().copied()
    }
}

/// Accept-Encoding negotiator
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodingNegotiator;

impl EncodingNegotiator {
    /// Parse an Accept-Encoding value into the supported candidate set
    pub fn supported_algorithms(accept_encoding: &str) -> NegotiatedAlgorithms {
        NegotiatedAlgorithms(
            PREFERENCE
                .iter()
                .copied()
                .filter(|algorithm| accept_encoding.contains(algorithm.as_str()))
                .collect(),
        )
    }

    /// Pick the single best algorithm of a candidate set
    pub fn best_of(candidates: &NegotiatedAlgorithms) -> Option<Algorithm> {
        candidates.best()
    }

    /// Candidate set for an optional header value.
    ///
    /// Missing or non-text headers yield an empty set.
    pub fn from_header(accept_encoding: Option<&HeaderValue>) -> NegotiatedAlgorithms {
        accept_encoding
            .and_then(|value| value.to_str().ok())
            .map(Self::supported_algorithms)
            .unwrap_or_default()
    }
}
