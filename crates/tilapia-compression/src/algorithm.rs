//! Compression algorithm identifiers

use http::HeaderValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tilapia_core::Error;

/// Supported compression algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    /// Brotli (`br`)
    #[serde(rename = "br")]
    Brotli,
    /// Gzip (`gzip`)
    #[serde(rename = "gzip")]
    Gzip,
    /// Zlib-wrapped deflate (`deflate`)
    #[serde(rename = "deflate")]
    Deflate,
}

/// Global preference order, most preferred first
pub const PREFERENCE: [Algorithm; 3] = [Algorithm::Brotli, Algorithm::Gzip, Algorithm::Deflate];

impl Algorithm {
    /// Get the Content-Encoding token
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Brotli => "br",
            Self::Gzip => "gzip",
            Self::Deflate => "deflate",
        }
    }

    /// Get the Content-Encoding header value
    pub fn header_value(&self) -> HeaderValue {
        HeaderValue::from_static(self.as_str())
    }

    /// Position in [`PREFERENCE`], lower is better
    pub fn rank(&self) -> usize {
        match self {
            Self::Brotli => 0,
            Self::Gzip => 1,
            Self::Deflate => 2,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "br" => Ok(Self::Brotli),
            "gzip" => Ok(Self::Gzip),
            "deflate" => Ok(Self::Deflate),
            other => Err(Error::UnsupportedAlgorithm(other.to_string())),
        }
    }
}
