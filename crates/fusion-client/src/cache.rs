//! Local catalog snapshot with a freshness window.
//!
//! The cache is an optimization only. A missing, unreadable, corrupt or
//! stale file reads as "no cache", and failed writes are logged and
//! otherwise ignored.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::clock::{SharedClock, SystemClock};
use crate::types::{CacheSnapshot, CatalogEntry};

/// Default freshness window.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// File-backed catalog cache.
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
    ttl: Duration,
    clock: SharedClock,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self::with_clock(path, ttl, SystemClock::shared())
    }

    pub fn with_clock(path: impl Into<PathBuf>, ttl: Duration, clock: SharedClock) -> Self {
        Self {
            path: path.into(),
            ttl,
            clock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached entries, if the snapshot is still fresh.
    pub fn load(&self) -> Option<Vec<CatalogEntry>> {
        self.load_snapshot().map(|snapshot| snapshot.resources)
    }

    /// The full snapshot, if still fresh.
    pub fn load_snapshot(&self) -> Option<CacheSnapshot> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No catalog cache");
                return None;
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Catalog cache unreadable");
                return None;
            }
        };

        let snapshot: CacheSnapshot = match serde_json::from_str(&raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Catalog cache corrupt, ignoring");
                return None;
            }
        };

        // A snapshot from the future (clock skew) still counts as fresh.
        let age = (self.clock.wall() - snapshot.fetched_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        if age >= self.ttl {
            tracing::debug!(age_secs = age.as_secs(), "Catalog cache stale");
            return None;
        }

        tracing::debug!(
            count = snapshot.resources.len(),
            age_secs = age.as_secs(),
            "Catalog cache hit"
        );
        Some(snapshot)
    }

    /// Persist `entries` as a new snapshot. Failures are logged only.
    pub fn save(&self, entries: &[CatalogEntry]) {
        if let Err(e) = self.try_save(entries) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to write catalog cache");
        }
    }

    fn try_save(&self, entries: &[CatalogEntry]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let snapshot = CacheSnapshot {
            fetched_at: self.clock.wall(),
            resources: entries.to_vec(),
        };
        let json = serde_json::to_vec(&snapshot).map_err(std::io::Error::other)?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        tracing::debug!(count = entries.len(), path = %self.path.display(), "Catalog cache written");
        Ok(())
    }

    /// Delete the cache file. Returns whether one existed.
    pub fn clear(&self) -> bool {
        match fs::remove_file(&self.path) {
            Ok(()) => true,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove catalog cache");
                }
                false
            }
        }
    }
}
