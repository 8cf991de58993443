//! Error types for token acquisition.

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, OAuthError>;

/// Errors that can occur while obtaining a bearer token.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// Network/HTTP transport error.
    #[error("Network error: {0}")]
    Network(String),

    /// The token endpoint rejected the credential pair.
    #[error("Token endpoint returned {status}: {message}")]
    Rejected { status: u16, message: String },

    /// Invalid or missing configuration.
    #[error("Config error: {0}")]
    Config(String),

    /// The token response could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl OAuthError {
    /// Whether retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            OAuthError::Network(_) => true,
            OAuthError::Rejected { status, .. } => *status == 429 || *status >= 500,
            OAuthError::Config(_) | OAuthError::Serialization(_) => false,
        }
    }
}

impl From<reqwest::Error> for OAuthError {
    fn from(e: reqwest::Error) -> Self {
        OAuthError::Network(e.to_string())
    }
}
