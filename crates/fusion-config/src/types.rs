//! Configuration types.
//!
//! ```toml
//! [api]
//! base_url = "https://api.us-2.crowdstrike.com"
//! timeout_secs = 30
//!
//! [cache]
//! dir = "~/.cache/fusion"
//! ttl_secs = 3600
//!
//! [fetch]
//! page_size = 200
//! max_attempts = 3
//! backoff_secs = 2
//!
//! [execute]
//! timeout_secs = 120
//! interval_secs = 5
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.crowdstrike.com";

/// Application name used for platform directories.
pub const APP_NAME: &str = "fusion";

/// File name of the activity catalog cache.
pub const CACHE_FILE: &str = "action_cache.json";

/// Root configuration.
///
/// Every section is optional so that layered files only need to carry the
/// sections they override.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FusionConfig {
    pub api: Option<ApiConfig>,
    pub cache: Option<CacheConfig>,
    pub fetch: Option<FetchConfig>,
    pub execute: Option<ExecuteConfig>,
}

impl FusionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: FusionConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: FusionConfig) {
        if other.api.is_some() {
            self.api = other.api;
        }
        if other.cache.is_some() {
            self.cache = other.cache;
        }
        if other.fetch.is_some() {
            self.fetch = other.fetch;
        }
        if other.execute.is_some() {
            self.execute = other.execute;
        }
    }

    pub fn api(&self) -> ApiConfig {
        self.api.clone().unwrap_or_default()
    }

    pub fn cache(&self) -> CacheConfig {
        self.cache.clone().unwrap_or_default()
    }

    pub fn fetch(&self) -> FetchConfig {
        self.fetch.clone().unwrap_or_default()
    }

    pub fn execute(&self) -> ExecuteConfig {
        self.execute.clone().unwrap_or_default()
    }

    fn validate(&self) -> Result<()> {
        let fetch = self.fetch();
        if fetch.page_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "fetch.page_size".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if fetch.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "fetch.max_attempts".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.execute().interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "execute.interval_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Remote API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL; `CS_BASE_URL` takes precedence.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Catalog cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache directory. Default: platform cache dir + `/fusion`.
    pub dir: Option<PathBuf>,
    /// Freshness window in seconds.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            ttl_secs: 3600,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Effective path of the catalog cache file.
    pub fn cache_file(&self) -> PathBuf {
        let dir = self.dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_NAME)
        });
        dir.join(CACHE_FILE)
    }
}

/// Pagination and retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Page size for full catalog walks.
    pub page_size: usize,
    /// Attempts per page before giving up.
    pub max_attempts: u32,
    /// Linear backoff unit in seconds (delay = unit × attempt).
    pub backoff_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_size: 200,
            max_attempts: 3,
            backoff_secs: 2,
        }
    }
}

impl FetchConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }
}

/// Execution polling defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecuteConfig {
    pub timeout_secs: u64,
    pub interval_secs: u64,
}

impl Default for ExecuteConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            interval_secs: 5,
        }
    }
}
