//! Client credential resolution.
//!
//! Resolution order for the `.env` file:
//! 1. Explicit path (e.g. `--env-file`)
//! 2. `CS_ENV_FILE` environment variable
//! 3. Walk upward from the current directory looking for `.env`
//!
//! Values from the `.env` file never override variables already present in
//! the process environment.

use std::path::{Path, PathBuf};

use fusion_oauth::ClientCredentials;

use crate::error::{ConfigError, Result};
use crate::types::FusionConfig;

pub const CLIENT_ID_ENV: &str = "CS_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "CS_CLIENT_SECRET";
pub const BASE_URL_ENV: &str = "CS_BASE_URL";
pub const ENV_FILE_ENV: &str = "CS_ENV_FILE";

const ENV_FILE_NAME: &str = ".env";

/// Locate the `.env` file to load, if any.
pub fn find_env_file(explicit: Option<&Path>, start_dir: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(ENV_FILE_ENV)
        && !path.is_empty()
    {
        return Some(PathBuf::from(path));
    }

    start_dir
        .ancestors()
        .map(|dir| dir.join(ENV_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

/// Load the discovered `.env` file into the process environment.
///
/// Returns the path that was loaded. A missing file is not an error; an
/// explicitly named file that cannot be parsed is.
pub fn load_env_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let Some(path) = find_env_file(explicit, &cwd) else {
        return Ok(None);
    };

    if !path.is_file() {
        tracing::debug!(path = %path.display(), "No .env file at resolved path");
        return Ok(None);
    }

    dotenvy::from_path(&path).map_err(|e| ConfigError::EnvFile {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    tracing::debug!(path = %path.display(), "Loaded .env file");
    Ok(Some(path))
}

/// Resolve client credentials from the process environment.
pub fn resolve_credentials(config: &FusionConfig) -> Result<ClientCredentials> {
    resolve_credentials_with(|key| std::env::var(key).ok(), config)
}

/// Resolve client credentials through an arbitrary variable lookup.
///
/// `CS_BASE_URL` overrides `[api] base_url`.
pub fn resolve_credentials_with<F>(lookup: F, config: &FusionConfig) -> Result<ClientCredentials>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let (Some(client_id), Some(client_secret)) =
        (non_empty(CLIENT_ID_ENV), non_empty(CLIENT_SECRET_ENV))
    else {
        return Err(ConfigError::MissingCredentials {
            id_var: CLIENT_ID_ENV,
            secret_var: CLIENT_SECRET_ENV,
        });
    };

    let base_url = non_empty(BASE_URL_ENV).unwrap_or_else(|| config.api().base_url);

    Ok(ClientCredentials::new(
        client_id.trim(),
        client_secret.trim(),
        base_url.trim(),
    ))
}
