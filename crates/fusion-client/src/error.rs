//! Client error types.

use thiserror::Error;

/// Longest raw response body quoted in a failure message.
const MAX_RAW_MESSAGE: usize = 500;

/// The single failure shape crossing the gateway boundary.
///
/// Everything above the gateway (fetcher, search, import, polling) consumes
/// only this type, whatever the underlying cause was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RemoteFailure {
    /// Human-readable reason.
    pub message: String,
    /// Whether the same request may succeed if repeated.
    pub retryable: bool,
    /// HTTP status, when a response was received.
    pub status: Option<u16>,
}

impl RemoteFailure {
    /// A failure worth retrying (network error, 429, 5xx).
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
            status: None,
        }
    }

    /// A failure that will recur if repeated (business error, bad input).
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
            status: None,
        }
    }

    /// Build a failure for a non-success HTTP status.
    ///
    /// `structured` is the joined `errors[].message` list, if the body had one;
    /// otherwise the raw body (truncated) or the status line is used.
    pub fn from_status(status: u16, structured: Option<String>, raw_body: &str) -> Self {
        let message = structured
            .filter(|m| !m.is_empty())
            .or_else(|| {
                let raw = raw_body.trim();
                (!raw.is_empty()).then(|| raw.chars().take(MAX_RAW_MESSAGE).collect())
            })
            .unwrap_or_else(|| format!("HTTP {}", status));
        Self {
            message,
            retryable: is_retryable_status(status),
            status: Some(status),
        }
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

impl From<reqwest::Error> for RemoteFailure {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Self::from_status(status.as_u16(), None, &e.to_string()),
            None => Self {
                message: e.to_string(),
                retryable: e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
                status: None,
            },
        }
    }
}

impl From<fusion_oauth::OAuthError> for RemoteFailure {
    fn from(e: fusion_oauth::OAuthError) -> Self {
        Self {
            retryable: e.is_transient(),
            message: format!("Authentication failed: {}", e),
            status: None,
        }
    }
}

/// Whether an HTTP status indicates a transient condition.
pub fn is_retryable_status(status: u16) -> bool {
    status == 408 || status == 429 || status >= 500
}

/// Client error type.
#[derive(Debug, Error)]
pub enum Error {
    /// The remote service or transport failed.
    #[error(transparent)]
    Remote(#[from] RemoteFailure),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local file could not be read.
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
