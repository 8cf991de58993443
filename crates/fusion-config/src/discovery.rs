//! Config file discovery and layered merging.
//!
//! Resolution order (later overrides earlier):
//! 1. `~/.config/fusion/config.toml` (XDG user config)
//! 2. `./fusion.toml` (project-local)
//! 3. CLI arguments and environment (handled externally)

use std::path::{Path, PathBuf};

use crate::types::APP_NAME;
use crate::{ConfigError, FusionConfig, Result};

/// Default config filename for project-local config.
const PROJECT_CONFIG_FILE: &str = "fusion.toml";

/// Default config filename within XDG config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Environment variable to override the config directory.
const CONFIG_DIR_ENV: &str = "FUSION_CONFIG_DIR";

/// Tracks where each config layer was loaded from.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    /// Path to the config file.
    pub path: PathBuf,
    /// Whether the file was found and loaded.
    pub loaded: bool,
}

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The merged configuration.
    pub config: FusionConfig,
    /// Sources that were checked, in order of precedence (lowest first).
    pub sources: Vec<ConfigSource>,
    /// Layers that existed but could not be loaded.
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Get paths of sources that were actually loaded.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Load configuration by discovering and merging all config layers.
pub fn load_config(project_dir: Option<&Path>) -> LoadedConfig {
    load_config_with_options(project_dir, None)
}

/// Load configuration with explicit control over the user config directory.
///
/// `config_dir` overrides both `FUSION_CONFIG_DIR` and the platform default.
/// Broken layers are skipped and reported in [`LoadedConfig::warnings`].
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> LoadedConfig {
    let mut config = FusionConfig::new();
    let mut sources = Vec::new();
    let mut warnings = Vec::new();

    let user_config_path = match config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => xdg_config_path(),
    };
    if let Some(path) = user_config_path {
        sources.push(load_layer(&mut config, &path, &mut warnings));
    }

    let project_path = project_dir
        .map(|d| d.join(PROJECT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
    sources.push(load_layer(&mut config, &project_path, &mut warnings));

    LoadedConfig {
        config,
        sources,
        warnings,
    }
}

/// Load config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<FusionConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    FusionConfig::from_toml(&contents)
}

/// Get the XDG config file path for fusion.
pub fn xdg_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// Get the XDG config directory for fusion.
///
/// Checks `FUSION_CONFIG_DIR` env var first, then falls back to platform default.
pub fn xdg_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Try to load a config file and merge it into the existing config.
fn load_layer(config: &mut FusionConfig, path: &Path, warnings: &mut Vec<String>) -> ConfigSource {
    if !path.is_file() {
        return ConfigSource {
            path: path.to_path_buf(),
            loaded: false,
        };
    }

    match load_config_file(path) {
        Ok(layer) => {
            config.merge(layer);
            tracing::debug!(path = %path.display(), "Loaded config layer");
            ConfigSource {
                path: path.to_path_buf(),
                loaded: true,
            }
        }
        Err(e) => {
            warnings.push(format!("Failed to load {}: {}", path.display(), e));
            ConfigSource {
                path: path.to_path_buf(),
                loaded: false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_xdg_config_path_shape() {
        if let Some(p) = xdg_config_path() {
            assert!(p.ends_with("config.toml"));
        }
    }

    #[test]
    fn test_load_config_file_not_found() {
        let err = load_config_file(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_project_layer_overrides_user_layer() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(
            user.path().join("config.toml"),
            "[api]\nbase_url = \"https://user\"\n[execute]\ntimeout_secs = 60\n",
        )
        .unwrap();
        fs::write(
            project.path().join("fusion.toml"),
            "[api]\nbase_url = \"https://project\"\n",
        )
        .unwrap();

        let loaded = load_config_with_options(Some(project.path()), Some(user.path()));
        assert_eq!(loaded.config.api().base_url, "https://project");
        assert_eq!(loaded.config.execute().timeout_secs, 60);
        assert_eq!(loaded.loaded_from().len(), 2);
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn test_broken_layer_becomes_warning() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(user.path().join("config.toml"), "not [valid toml").unwrap();

        let loaded = load_config_with_options(Some(project.path()), Some(user.path()));
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.loaded_from().is_empty());
        assert_eq!(loaded.config.fetch().page_size, 200);
    }
}
