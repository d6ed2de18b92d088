//! Error types for Tilapia

/// Result type alias using [`Error`]
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Main error type for Tilapia
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Decompression requested for an encoding token we do not know
    #[error("Unsupported compression algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// A codec failed while encoding or decoding
    #[error("{algorithm} codec failed: {source}")]
    Codec {
        /// Encoding token of the failing codec
        algorithm: &'static str,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Compression options out of range
    #[error("Invalid compression options: {0}")]
    InvalidOptions(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A streaming body was asked for its materialized bytes
    #[error("Response body is a stream and cannot be materialized")]
    BodyNotMaterialized,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    HttpError(#[from] http::Error),

    /// Internal error (should not happen in production)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convert error to HTTP status code
    pub fn to_status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::UnsupportedAlgorithm(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Error::Codec { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Create a codec error
    pub fn codec(algorithm: &'static str, source: std::io::Error) -> Self {
        Error::Codec { algorithm, source }
    }
}
