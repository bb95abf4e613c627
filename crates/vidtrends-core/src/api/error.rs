use thiserror::Error;

use super::transport::TransportError;

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Connection or timeout failure. Surfaced unchanged; the client
    /// never retries these.
    #[error("network error: {0}")]
    Transport(#[from] TransportError),

    /// 401 that survived the one permitted refresh-and-retry.
    #[error("unauthorized - token may be expired")]
    Unauthorized,

    /// Token refresh failed; the session has been cleared and the user
    /// must log in again.
    #[error("session expired - please log in again")]
    SessionExpired,

    /// Any other error status, passed through for the caller to interpret.
    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Truncate a response body so error messages stay readable
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let truncated: String = body.chars().take(MAX_ERROR_BODY_LENGTH).collect();
            format!("{}... (truncated, {} total bytes)", truncated, body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        match status {
            reqwest::StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
            _ => ApiError::Status {
                status: status.as_u16(),
                message: Self::truncate_body(body),
            },
        }
    }
}
