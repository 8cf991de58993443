//! Configuration error types.

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration loading and resolution.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to load a `.env` file.
    #[error("failed to load env file '{path}': {message}")]
    EnvFile { path: String, message: String },

    /// Client credentials not found in the environment or `.env` file.
    #[error("{id_var} and {secret_var} must be set in .env or environment")]
    MissingCredentials {
        id_var: &'static str,
        secret_var: &'static str,
    },

    /// A setting has an unusable value.
    #[error("invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}
