//! Offset pagination with bounded retry.
//!
//! [`Paginator::fetch_all`] never fails: when a page keeps failing after the
//! configured number of attempts, everything gathered so far is returned in a
//! [`PageSet`] flagged as incomplete, so callers decide whether partial data
//! is acceptable.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::clock::{SharedClock, SystemClock};
use crate::error::RemoteFailure;
use crate::gateway::{Envelope, SharedGateway};

/// Default page size for catalog walks.
pub const DEFAULT_PAGE_SIZE: usize = 200;

/// Default attempts per page.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Base of the linear backoff (`backoff × attempt`).
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(2);

/// Page size and retry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    pub page_size: usize,
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

impl FetchPolicy {
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Sleep before attempt `attempt + 1`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }
}

/// Entries gathered by a paginated walk.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSet<T> {
    pub entries: Vec<T>,
    /// False when the walk stopped early because a page kept failing.
    pub complete: bool,
}

impl<T> PageSet<T> {
    pub fn complete(entries: Vec<T>) -> Self {
        Self {
            entries,
            complete: true,
        }
    }

    pub fn partial(entries: Vec<T>) -> Self {
        Self {
            entries,
            complete: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Progress of a walk, reported after each page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageProgress {
    pub fetched: usize,
    pub total: usize,
}

/// Progress callback.
pub type ProgressFn = Arc<dyn Fn(PageProgress) + Send + Sync>;

/// Walks one paginated endpoint.
#[derive(Clone)]
pub struct Paginator {
    gateway: SharedGateway,
    path: String,
    policy: FetchPolicy,
    clock: SharedClock,
    progress: Option<ProgressFn>,
}

impl std::fmt::Debug for Paginator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paginator")
            .field("path", &self.path)
            .field("policy", &self.policy)
            .finish()
    }
}

impl Paginator {
    pub fn new(gateway: SharedGateway, path: impl Into<String>) -> Self {
        Self {
            gateway,
            path: path.into(),
            policy: FetchPolicy::default(),
            clock: SystemClock::shared(),
            progress: None,
        }
    }

    pub fn with_policy(mut self, policy: FetchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_progress(mut self, progress: Option<ProgressFn>) -> Self {
        self.progress = progress;
        self
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// Fetch every page.
    ///
    /// Stops when a page comes back empty or the offset reaches the total
    /// reported by the first page. Each page gets up to `max_attempts`
    /// tries; retryable failures sleep `backoff × attempt` in between, other
    /// failures end the walk at once.
    pub fn fetch_all<T: DeserializeOwned>(&self) -> PageSet<T> {
        let mut entries = Vec::new();
        let mut offset = 0usize;
        let mut total: Option<usize> = None;

        loop {
            let page = match self.fetch_page(offset) {
                Ok(page) => page,
                Err(failure) => {
                    tracing::warn!(
                        path = %self.path,
                        offset,
                        fetched = entries.len(),
                        error = %failure,
                        "Giving up on pagination, returning partial results"
                    );
                    return PageSet::partial(entries);
                }
            };

            let total = *total.get_or_insert_with(|| page.total().unwrap_or(0));
            let received = page.resources.len();
            if received == 0 {
                break;
            }

            entries.extend(page.decode_resources::<T>());
            offset += received;

            if let Some(progress) = &self.progress {
                progress(PageProgress {
                    fetched: if total > 0 { offset.min(total) } else { offset },
                    total,
                });
            }
            if offset >= total {
                break;
            }
        }

        tracing::debug!(path = %self.path, count = entries.len(), "Pagination complete");
        PageSet::complete(entries)
    }

    /// Fetch every page matching a filter expression, without retrying.
    pub fn fetch_filtered<T: DeserializeOwned>(&self, filter: &str) -> Result<Vec<T>, RemoteFailure> {
        let mut entries = Vec::new();
        let mut offset = 0usize;
        let mut total: Option<usize> = None;

        loop {
            let page = self.request(offset, Some(filter))?;
            let total = *total.get_or_insert_with(|| page.total().unwrap_or(0));
            let received = page.resources.len();
            if received == 0 {
                break;
            }
            entries.extend(page.decode_resources::<T>());
            offset += received;
            if offset >= total {
                break;
            }
        }

        Ok(entries)
    }

    /// One page, with retries.
    fn fetch_page(&self, offset: usize) -> Result<Envelope, RemoteFailure> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.request(offset, None) {
                Ok(page) => return Ok(page),
                Err(failure) if failure.retryable && attempt < max_attempts => {
                    let delay = self.policy.delay_after(attempt);
                    tracing::warn!(
                        path = %self.path,
                        offset,
                        attempt,
                        max_attempts,
                        delay_secs = delay.as_secs(),
                        error = %failure,
                        "Page request failed, retrying"
                    );
                    self.clock.sleep(delay);
                    attempt += 1;
                }
                Err(failure) => return Err(failure),
            }
        }
    }

    fn request(&self, offset: usize, filter: Option<&str>) -> Result<Envelope, RemoteFailure> {
        let limit = self.policy.page_size.to_string();
        let offset_param = offset.to_string();
        let mut query = vec![("limit", limit.as_str()), ("offset", offset_param.as_str())];
        if let Some(filter) = filter {
            query.push(("filter", filter));
        }

        let page = self.gateway.get(&self.path, &query)?;
        // An error list with nothing else is a failed page, not an empty one.
        if page.resources.is_empty()
            && let Some(message) = page.error_message()
        {
            return Err(RemoteFailure::permanent(message));
        }
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::fake::InMemoryGateway;
    use parking_lot::Mutex;
    use serde_json::{Value, json};

    const PATH: &str = "/items";

    fn items(range: std::ops::Range<usize>) -> Vec<Value> {
        range.map(|i| json!({"id": format!("id-{}", i)})).collect()
    }

    fn paginator(gateway: &Arc<InMemoryGateway>, clock: &Arc<ManualClock>) -> Paginator {
        Paginator::new(gateway.clone(), PATH).with_clock(clock.clone())
    }

    #[test]
    fn test_walks_all_pages() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.serve_pages(PATH, items(0..450));
        let clock = Arc::new(ManualClock::new());

        let set: PageSet<Value> = paginator(&gateway, &clock).fetch_all();
        assert!(set.complete);
        assert_eq!(set.entries.len(), 450);
        assert_eq!(gateway.count(PATH), 3);
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn test_stops_on_empty_page() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.on("GET", PATH, |_| Ok(Envelope::page(Vec::new(), 10)));
        let clock = Arc::new(ManualClock::new());

        let set: PageSet<Value> = paginator(&gateway, &clock).fetch_all();
        assert!(set.complete);
        assert!(set.entries.is_empty());
        assert_eq!(gateway.count(PATH), 1);
    }

    #[test]
    fn test_partial_result_after_exhausted_retries() {
        let gateway = Arc::new(InMemoryGateway::new());
        let all = items(0..600);
        gateway.on("GET", PATH, move |req| {
            let offset: usize = req.param("offset").and_then(|o| o.parse().ok()).unwrap_or(0);
            if offset == 400 {
                return Err(RemoteFailure::transient("connection reset"));
            }
            let end = (offset + 200).min(all.len());
            Ok(Envelope::page(all[offset..end].to_vec(), all.len()))
        });
        let clock = Arc::new(ManualClock::new());

        let set: PageSet<Value> = paginator(&gateway, &clock).fetch_all();
        assert!(!set.complete);
        assert_eq!(set.entries.len(), 400);
        assert_eq!(set.entries[399]["id"], "id-399");
        // 2 successful pages + 3 attempts at offset 400
        assert_eq!(gateway.count(PATH), 5);
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );
    }

    #[test]
    fn test_recovers_after_transient_failure() {
        let gateway = Arc::new(InMemoryGateway::new());
        let failures = Arc::new(Mutex::new(1));
        let all = items(0..3);
        gateway.on("GET", PATH, move |_| {
            let mut left = failures.lock();
            if *left > 0 {
                *left -= 1;
                return Err(RemoteFailure::transient("503"));
            }
            Ok(Envelope::page(all.clone(), 3))
        });
        let clock = Arc::new(ManualClock::new());

        let set: PageSet<Value> = paginator(&gateway, &clock).fetch_all();
        assert!(set.complete);
        assert_eq!(set.entries.len(), 3);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(2)]);
    }

    #[test]
    fn test_permanent_failure_is_not_retried() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.on("GET", PATH, |_| Err(RemoteFailure::permanent("forbidden")));
        let clock = Arc::new(ManualClock::new());

        let set: PageSet<Value> = paginator(&gateway, &clock).fetch_all();
        assert!(!set.complete);
        assert_eq!(gateway.count(PATH), 1);
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn test_error_body_counts_as_failure() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.on("GET", PATH, |_| Ok(Envelope::with_errors(["quota exceeded"])));
        let clock = Arc::new(ManualClock::new());

        let set: PageSet<Value> = paginator(&gateway, &clock).fetch_all();
        assert!(!set.complete);
    }

    #[test]
    fn test_progress_is_reported() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.serve_pages(PATH, items(0..250));
        let clock = Arc::new(ManualClock::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let _: PageSet<Value> = paginator(&gateway, &clock)
            .with_progress(Some(Arc::new(move |p: PageProgress| sink.lock().push(p))))
            .fetch_all();

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1], PageProgress { fetched: 250, total: 250 });
    }

    #[test]
    fn test_fetch_filtered_passes_filter() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.serve_pages(PATH, items(0..2));
        let clock = Arc::new(ManualClock::new());

        let found: Vec<Value> = paginator(&gateway, &clock)
            .fetch_filtered("name:'x'")
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(gateway.requests()[0].param("filter"), Some("name:'x'"));
    }
}
