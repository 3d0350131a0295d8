//! Classified API failures.

use serde_json::Value;
use thiserror::Error;

/// Message used when an error body carries nothing readable.
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred";

/// Message used for timeouts and connection failures.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error occurred. Please check your connection.";

/// Failure classes the rest of the storefront branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Timeout or connection failure (status code 0).
    Network,
    /// Request rejected as malformed (400-class other than the ones below).
    Validation,
    /// Credentials missing or rejected (401/403).
    Authentication,
    /// Refresh failed; stored credentials were cleared. The caller should send
    /// the user back to a login entry point.
    SessionExpired,
    /// Resource does not exist (404).
    NotFound,
    /// Too many requests (429).
    RateLimited,
    /// Backend failure (5xx).
    Server,
    /// 2xx response whose body did not match the expected shape.
    InvalidResponse,
}

impl ErrorKind {
    /// Classify an HTTP status code.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            0 => Self::Network,
            401 | 403 => Self::Authentication,
            404 => Self::NotFound,
            429 => Self::RateLimited,
            500..=599 => Self::Server,
            _ => Self::Validation,
        }
    }
}

/// A failed API call, normalized to one shape.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiError {
    /// HTTP status, or 0 when no response was received.
    pub status_code: u16,
    /// Human-readable message, suitable for display.
    pub message: String,
    pub kind: ErrorKind,
    /// Parsed error body, when there was one.
    pub details: Option<Value>,
    /// Seconds from a `Retry-After` header.
    pub retry_after: Option<u64>,
    /// A 401 led to a successful token refresh. The request itself was not
    /// reissued; see [`reauth_once`](super::reauth_once).
    pub credentials_refreshed: bool,
}

impl ApiError {
    fn new(status_code: u16, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
            kind,
            details: None,
            retry_after: None,
            credentials_refreshed: false,
        }
    }

    /// Timeout or connection failure.
    #[must_use]
    pub fn network() -> Self {
        Self::new(0, ErrorKind::Network, NETWORK_ERROR_MESSAGE)
    }

    /// Credentials could not be refreshed and were cleared.
    #[must_use]
    pub fn session_expired() -> Self {
        Self::new(
            401,
            ErrorKind::SessionExpired,
            "Your session has expired. Please sign in again.",
        )
    }

    /// A success response with an unexpected body.
    #[must_use]
    pub fn invalid_response(status_code: u16, reason: impl std::fmt::Display) -> Self {
        Self::new(
            status_code,
            ErrorKind::InvalidResponse,
            format!("Unexpected response from server: {reason}"),
        )
    }

    /// A request body that could not be encoded. Nothing was sent.
    #[must_use]
    pub fn invalid_request(reason: impl std::fmt::Display) -> Self {
        Self::new(
            400,
            ErrorKind::Validation,
            format!("Invalid request body: {reason}"),
        )
    }

    /// Build an error from a non-2xx status and its raw body.
    ///
    /// The body is parsed as JSON when possible; the message is taken from
    /// `message` (a string, or a list joined with `", "` in order), else
    /// `error`, else a generic message.
    #[must_use]
    pub fn from_response(status_code: u16, body: &str) -> Self {
        let details = serde_json::from_str::<Value>(body).ok();
        let message = details
            .as_ref()
            .and_then(extract_message)
            .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string());

        Self {
            details,
            ..Self::new(status_code, ErrorKind::from_status(status_code), message)
        }
    }

    #[must_use]
    pub const fn with_retry_after(mut self, seconds: Option<u64>) -> Self {
        self.retry_after = seconds;
        self
    }

    #[must_use]
    pub const fn with_credentials_refreshed(mut self) -> Self {
        self.credentials_refreshed = true;
        self
    }

    /// Returns true for failures a caller may retry with backoff.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Network | ErrorKind::Server | ErrorKind::RateLimited
        )
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    /// Returns true for 401/403 and expired sessions.
    #[must_use]
    pub const fn is_auth_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Authentication | ErrorKind::SessionExpired
        )
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        tracing::debug!(error = %err, "Request failed without a response");
        Self::network()
    }
}

/// Pull a display message out of an error body.
fn extract_message(body: &Value) -> Option<String> {
    match body.get("message") {
        Some(Value::String(message)) if !message.is_empty() => return Some(message.clone()),
        Some(Value::Array(messages)) if !messages.is_empty() => {
            return Some(
                messages
                    .iter()
                    .map(|m| m.as_str().map_or_else(|| m.to_string(), str::to_string))
                    .collect::<Vec<_>>()
                    .join(", "),
            );
        }
        _ => {}
    }

    body.get("error")
        .and_then(Value::as_str)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
}
