//! Error taxonomy for the API client.

use thiserror::Error;

/// Failures surfaced by [`super::ApiClient`].
///
/// Token payload decode failures never appear here: the session degrades to
/// a null identity instead. A refresh failure during 401 handling is also
/// absorbed (forced logout, call resolves empty); `RefreshFailed` is only
/// observed by code driving the refresh endpoint directly.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A refresh was attempted with no refresh token in storage.
    #[error("no refresh token available")]
    MissingRefreshToken,

    /// The refresh endpoint answered with a non-success status.
    #[error("token refresh failed (HTTP {status})")]
    RefreshFailed { status: u16 },

    /// A non-2xx, non-401 response from the backend.
    #[error("{message} (HTTP {status})")]
    Request {
        status: u16,
        /// Human-readable message from the body's `message` field, or a
        /// generic fallback.
        message: String,
        /// Field-level validation messages, when the body carried any.
        errors: Vec<String>,
    },

    /// Connection, timeout, or protocol-level failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A success response whose body was not the expected JSON.
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Durable session storage could not be read or written.
    #[error("session storage error: {0:#}")]
    Session(anyhow::Error),
}

impl ApiError {
    /// HTTP status attached to this error, when one applies.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::RefreshFailed { status } | ApiError::Request { status, .. } => Some(*status),
            ApiError::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Validation messages carried by a request failure, if any.
    pub fn validation_errors(&self) -> &[String] {
        match self {
            ApiError::Request { errors, .. } => errors,
            _ => &[],
        }
    }
}
