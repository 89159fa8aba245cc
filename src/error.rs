//! Relay error types with HTTP status code mapping.
//!
//! [`RelayError`] is the central error type for the relay. Session-fatal
//! variants (transport failures, read or write timeouts, oversized messages) end
//! only the affected session; request-level variants map to a specific
//! HTTP status code and structured JSON error response.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "invalid request: message must not be empty",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Relay error enum.
///
/// # Error Code Ranges
///
/// | Range     | Category   | HTTP Status               |
/// |-----------|------------|---------------------------|
/// | 1000–1999 | Validation | 400 Bad Request           |
/// | 2000–2999 | Access     | 403 Forbidden             |
/// | 3000–3999 | Server     | 500 Internal Server Error |
/// | 5000–5999 | Session    | 502 Bad Gateway           |
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// The underlying connection failed to read or write.
    #[error("transport error: {0}")]
    Transport(String),

    /// No inbound traffic arrived within the idle window.
    #[error("idle deadline of {0:?} expired")]
    IdleTimeout(Duration),

    /// An outbound frame could not be written within the write window.
    #[error("write stalled for longer than {0:?}")]
    WriteTimeout(Duration),

    /// An inbound message exceeded the configured size limit.
    #[error("message of {size} bytes exceeds limit of {limit} bytes")]
    MessageTooLarge {
        /// Size of the offending message in bytes.
        size: usize,
        /// Configured maximum message size in bytes.
        limit: usize,
    },

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The upgrade request carried an origin outside the allow-list.
    #[error("origin not allowed: {0}")]
    OriginRejected(String),

    /// Configuration values are missing or inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

}

impl RelayError {
    /// Wraps any displayable transport failure.
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::MessageTooLarge { .. } => 1002,
            Self::OriginRejected(_) => 2001,
            Self::InvalidConfig(_) => 3001,
            Self::Transport(_) => 5001,
            Self::IdleTimeout(_) => 5002,
            Self::WriteTimeout(_) => 5003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::MessageTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::OriginRejected(_) => StatusCode::FORBIDDEN,
            Self::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Transport(_) | Self::IdleTimeout(_) | Self::WriteTimeout(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    /// Returns `true` if this error ends the session that produced it.
    #[must_use]
    pub const fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::IdleTimeout(_)
                | Self::WriteTimeout(_)
                | Self::MessageTooLarge { .. }
        )
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
