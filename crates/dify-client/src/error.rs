//! Client error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Client error type.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server returned an error response.
    #[error("API error ({status}): [{code}] {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error code from server.
        code: String,
        /// Error message from server.
        message: String,
    },

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The request failed client-side validation and was never sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Stream error.
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),
}

impl Error {
    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_)) || matches!(self, Error::Api { status: 404, .. })
    }

    /// Check if this is an authentication error.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Auth(_)) || matches!(self, Error::Api { status: 401, .. })
    }

    /// Check if this is a rate limit error.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::Api { status: 429, .. })
    }

    /// Check if this is a server error.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::Api { status, .. } if *status >= 500)
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Terminal failure of a streaming session.
///
/// At most one of these is ever delivered per stream, always as the last
/// outcome before the channel closes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StreamError {
    /// The transport failed mid-stream.
    #[error("error reading stream: {0}")]
    Read(String),

    /// The service sent a structured error instead of event data.
    #[error("upstream error: {0}")]
    Upstream(UpstreamError),

    /// A data frame could not be decoded.
    #[error("malformed event payload: {reason}")]
    MalformedPayload {
        /// Why decoding failed.
        reason: String,
        /// The offending payload, lossily decoded as UTF-8.
        payload: String,
    },
}

impl StreamError {
    pub(crate) fn malformed(reason: impl Into<String>, payload: &[u8]) -> Self {
        Self::MalformedPayload {
            reason: reason.into(),
            payload: String::from_utf8_lossy(payload).into_owned(),
        }
    }

    /// The upstream error carried by this outcome, if any.
    pub fn upstream(&self) -> Option<&UpstreamError> {
        match self {
            StreamError::Upstream(err) => Some(err),
            _ => None,
        }
    }
}

/// Structured error body returned by the service.
///
/// Appears as the JSON body of a failed request, as a bare JSON line at the
/// start of an event stream, or as an `error` event inside one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamError {
    /// Machine-readable error code (e.g. `invalid_param`).
    #[serde(deserialize_with = "string_or_number")]
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Name of the offending parameter, when the service reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<String>,
    /// HTTP-style status, when the service reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl std::fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Accepts `"500"` and `500` alike for error codes.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number for error code, got {}",
            other
        ))),
    }
}
