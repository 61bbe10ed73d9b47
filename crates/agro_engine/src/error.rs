use std::fmt;

use thiserror::Error;

/// Failure class of an API request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Non-2xx response from the backend.
    Status(u16),
    Timeout,
    Network,
    /// Request was cancelled cooperatively (superseded fetch or navigation).
    Cancelled,
    /// Response body did not match the expected shape.
    InvalidBody,
    InvalidUrl,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::Status(code) => write!(f, "http status {code}"),
            ApiErrorKind::Timeout => write!(f, "timeout"),
            ApiErrorKind::Network => write!(f, "network error"),
            ApiErrorKind::Cancelled => write!(f, "cancelled"),
            ApiErrorKind::InvalidBody => write!(f, "invalid response body"),
            ApiErrorKind::InvalidUrl => write!(f, "invalid url"),
        }
    }
}

/// Normalized API failure: a kind plus the single human-readable message the
/// UI shows. The message is derived, in priority order, from the response
/// body's `message` field, its `error` field, or the transport failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn cancelled() -> Self {
        Self::new(ApiErrorKind::Cancelled, "Request cancelled")
    }

    /// Transient failures are the only ones the read path retries.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind, ApiErrorKind::Timeout | ApiErrorKind::Network)
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(ApiErrorKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return ApiError::new(ApiErrorKind::InvalidBody, err.to_string());
    }
    ApiError::new(ApiErrorKind::Network, err.to_string())
}
