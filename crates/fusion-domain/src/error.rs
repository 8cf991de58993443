//! Domain error types.

use std::path::PathBuf;

use fusion_client::RemoteFailure;
use thiserror::Error;

/// Domain-level errors.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The remote service failed and no fallback applied.
    #[error(transparent)]
    Remote(#[from] RemoteFailure),

    /// A full catalog walk produced nothing.
    #[error("Catalog unavailable: every attempt to fetch it failed")]
    CatalogUnavailable,

    /// A local workflow document could not be read.
    #[error("Failed to read '{path}': {source}")]
    ReadDocument {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The query had nothing to search for.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// An execution parameter could not be converted.
    #[error("Invalid value for '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    /// A named resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
