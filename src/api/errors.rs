//! Backend API error types

use thiserror::Error;

/// Fallback shown when a rejection carries no `message`
pub const DEFAULT_REJECTION_MESSAGE: &str = "Request failed";

/// Errors returned by [`ApiClient`](super::ApiClient) calls
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport failure before a response was received
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded the configured timeout
    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    /// Backend answered with a non-2xx status or `success: false`
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Input refused client-side, nothing was sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// Endpoint requires a bearer token and none is set
    #[error("Not authenticated")]
    Unauthenticated,
}

impl ApiError {
    /// Network and timeout errors may succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network(_) | ApiError::Timeout(_) => true,
            ApiError::Rejected { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Text suitable for showing to the user.
    ///
    /// Backend rejections are surfaced verbatim.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Rejected { message, .. } => message.clone(),
            ApiError::Validation(msg) => msg.clone(),
            ApiError::Network(_) => "Unable to reach the server".to_string(),
            ApiError::Timeout(_) => "The server took too long to respond".to_string(),
            ApiError::Decode(_) => "Unexpected response from the server".to_string(),
            ApiError::Unauthenticated => "Please log in to continue".to_string(),
        }
    }

    /// HTTP status of a rejection, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(timeout_ms)
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Result type alias for API calls
pub type ApiResult<T> = std::result::Result<T, ApiError>;
