//! Configuration system for the fusion workflow tooling.
//!
//! Provides TOML-based configuration with:
//! - API endpoint and request timeout (`[api]`)
//! - Catalog cache location and freshness window (`[cache]`)
//! - Pagination and retry policy (`[fetch]`)
//! - Execution polling defaults (`[execute]`)
//! - Config file layering (XDG user config + project-local overrides)
//! - Client credential resolution (`.env` file → environment)

pub mod credentials;
pub mod discovery;
pub mod error;
pub mod types;

pub use credentials::{
    BASE_URL_ENV, CLIENT_ID_ENV, CLIENT_SECRET_ENV, ENV_FILE_ENV, find_env_file, load_env_file,
    resolve_credentials, resolve_credentials_with,
};
pub use discovery::{
    LoadedConfig, load_config, load_config_file, load_config_with_options, xdg_config_dir,
    xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
