use thiserror::Error;

/// Error type for token operations.
///
/// Callers that only need a yes/no answer use [`TokenCodec::verify`], which
/// collapses every decoding variant into `false`.
///
/// [`TokenCodec::verify`]: super::TokenCodec::verify
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JwtError {
    #[error("Signing secret too short: minimum {min} bytes, got {actual}")]
    WeakSecret { min: usize, actual: usize },

    #[error("Token lifetime must be positive, got {0} ms")]
    InvalidLifetime(i64),

    #[error("Failed to encode token: {0}")]
    EncodingFailed(String),

    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Token signature is invalid")]
    SignatureInvalid,

    #[error("Token algorithm is not supported")]
    UnsupportedAlgorithm,

    #[error("Token is expired")]
    TokenExpired,
}
