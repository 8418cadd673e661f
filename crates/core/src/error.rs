//! Error types for the PajakGate domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! The scope matcher is infallible; errors only come from the answer
//! generator and from reshaping its output.

use thiserror::Error;

use crate::answer::AnswerFormatError;

/// The top-level error type for PajakGate operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Model output errors ---
    #[error("Answer format error: {0}")]
    AnswerFormat(#[from] AnswerFormatError),

}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Provider returned no answer text")]
    EmptyResponse,

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}
