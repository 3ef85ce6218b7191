//! Error types for price_sync

use thiserror::Error;

/// Unified error type for price_sync operations
#[derive(Debug, Error)]
pub enum PriceError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    /// Failed to parse a JSON response body
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// HTTP error status code other than 429
    #[error("HTTP error: {0}")]
    HttpStatus(reqwest::StatusCode),
    /// Remote service answered 429 Too Many Requests
    #[error("rate limited by remote service, try again later")]
    RateLimited,
    /// Identifier was absent from an otherwise successful collection response
    #[error("card not found: {0}")]
    NotFound(String),
    /// The whole batch call failed; message carries the underlying error
    #[error("batch lookup failed: {0}")]
    BatchFailed(String),
}

impl PriceError {
    /// True for the 429 case, which callers may want to log distinctly.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, PriceError::RateLimited)
    }
}

/// Result alias for price_sync operations
pub type Result<T> = std::result::Result<T, PriceError>;
