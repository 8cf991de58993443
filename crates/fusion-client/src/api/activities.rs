//! Activities (actions) API.

use crate::cache::CacheStore;
use crate::clock::{SharedClock, SystemClock};
use crate::error::RemoteFailure;
use crate::fetcher::{FetchPolicy, PageSet, Paginator, ProgressFn};
use crate::fql::Fql;
use crate::gateway::{SharedGateway, endpoints};
use crate::types::CatalogEntry;

/// Where a full catalog came from.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSource {
    pub entries: Vec<CatalogEntry>,
    /// False when a fresh fetch stopped early.
    pub complete: bool,
    pub from_cache: bool,
}

/// Activities API.
#[derive(Clone)]
pub struct ActivitiesApi {
    gateway: SharedGateway,
    cache: Option<CacheStore>,
    policy: FetchPolicy,
    clock: SharedClock,
    progress: Option<ProgressFn>,
}

impl std::fmt::Debug for ActivitiesApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivitiesApi")
            .field("cache", &self.cache)
            .field("policy", &self.policy)
            .finish()
    }
}

impl ActivitiesApi {
    pub fn new(gateway: SharedGateway) -> Self {
        Self {
            gateway,
            cache: None,
            policy: FetchPolicy::default(),
            clock: SystemClock::shared(),
            progress: None,
        }
    }

    pub fn with_cache(mut self, cache: CacheStore) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_policy(mut self, policy: FetchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    fn paginator(&self) -> Paginator {
        Paginator::new(self.gateway.clone(), endpoints::ACTIVITIES_COMBINED)
            .with_policy(self.policy)
            .with_clock(self.clock.clone())
            .with_progress(self.progress.clone())
    }

    /// One page of the catalog plus the reported total.
    pub fn list_page(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<CatalogEntry>, usize), RemoteFailure> {
        let limit = limit.to_string();
        let offset = offset.to_string();
        let page = self
            .gateway
            .get(
                endpoints::ACTIVITIES_COMBINED,
                &[("limit", limit.as_str()), ("offset", offset.as_str())],
            )?
            .check()?;
        let total = page.total().unwrap_or(0);
        Ok((page.decode_resources(), total))
    }

    /// Full details for one action, including its input schema.
    pub fn details(&self, id: &str) -> Result<Option<CatalogEntry>, RemoteFailure> {
        let page = match self
            .gateway
            .get(endpoints::ACTIVITIES_ENTITIES, &[("ids", id)])
            .and_then(|envelope| envelope.check())
        {
            Ok(page) => page,
            Err(failure) if failure.is_not_found() => return Ok(None),
            Err(failure) => return Err(failure),
        };
        Ok(page.decode_resources().into_iter().next())
    }

    /// Every action matching a filter expression (single attempt per page).
    pub fn filter(&self, fql: &Fql) -> Result<Vec<CatalogEntry>, RemoteFailure> {
        let filter = fql.to_string();
        tracing::debug!(filter = %filter, "Filtering actions remotely");
        self.paginator().fetch_filtered(&filter)
    }

    /// Walk the whole catalog, then refresh the cache with whatever was
    /// gathered, partial or not.
    pub fn fetch_all(&self) -> PageSet<CatalogEntry> {
        let set = self.paginator().fetch_all::<CatalogEntry>();
        if !set.complete {
            tracing::warn!(count = set.entries.len(), "Action catalog fetch incomplete");
        }
        if let Some(cache) = &self.cache {
            if !set.entries.is_empty() {
                cache.save(&set.entries);
            }
        }
        set
    }

    /// The full catalog from a fresh cache, otherwise from a fetch.
    pub fn load_or_fetch(&self) -> CatalogSource {
        if let Some(entries) = self.cache.as_ref().and_then(CacheStore::load) {
            return CatalogSource {
                entries,
                complete: true,
                from_cache: true,
            };
        }
        let set = self.fetch_all();
        CatalogSource {
            entries: set.entries,
            complete: set.complete,
            from_cache: false,
        }
    }

    /// Remove the local catalog cache. Returns whether one existed.
    pub fn clear_cache(&self) -> bool {
        self.cache.as_ref().is_some_and(CacheStore::clear)
    }
}
