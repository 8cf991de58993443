//! Workflow definitions API.

use crate::clock::{SharedClock, SystemClock};
use crate::error::RemoteFailure;
use crate::fetcher::{FetchPolicy, PageSet, Paginator};
use crate::gateway::{SharedGateway, Upload, endpoints};
use crate::types::Definition;

/// Page size used when listing definitions.
pub const DEFINITIONS_PAGE_SIZE: usize = 100;

/// Workflow definitions API.
#[derive(Clone)]
pub struct DefinitionsApi {
    gateway: SharedGateway,
    policy: FetchPolicy,
    clock: SharedClock,
}

impl std::fmt::Debug for DefinitionsApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefinitionsApi")
            .field("policy", &self.policy)
            .finish()
    }
}

impl DefinitionsApi {
    pub fn new(gateway: SharedGateway) -> Self {
        Self {
            gateway,
            policy: FetchPolicy::default().with_page_size(DEFINITIONS_PAGE_SIZE),
            clock: SystemClock::shared(),
        }
    }

    /// Override retry settings; the page size stays at 100.
    pub fn with_policy(mut self, policy: FetchPolicy) -> Self {
        self.policy = policy.with_page_size(DEFINITIONS_PAGE_SIZE);
        self
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Every stored definition. Never cached.
    pub fn fetch_all(&self) -> PageSet<Definition> {
        Paginator::new(self.gateway.clone(), endpoints::DEFINITIONS_COMBINED)
            .with_policy(self.policy)
            .with_clock(self.clock.clone())
            .fetch_all()
    }

    /// One definition by id.
    pub fn details(&self, id: &str) -> Result<Option<Definition>, RemoteFailure> {
        let page = match self
            .gateway
            .get(endpoints::DEFINITIONS_ENTITIES, &[("ids", id)])
            .and_then(|envelope| envelope.check())
        {
            Ok(page) => page,
            Err(failure) if failure.is_not_found() => return Ok(None),
            Err(failure) => return Err(failure),
        };
        Ok(page.decode_resources().into_iter().next())
    }

    /// Export one definition as YAML text.
    pub fn export(&self, id: &str) -> Result<String, RemoteFailure> {
        self.gateway
            .get_text(endpoints::DEFINITIONS_EXPORT, &[("id", id)])
    }

    /// Remote dry-run: run every import check without storing anything.
    pub fn validate(&self, upload: &Upload) -> Result<(), RemoteFailure> {
        self.gateway
            .post_file(
                endpoints::DEFINITIONS_IMPORT,
                &[("validate_only", "true")],
                upload,
            )?
            .check()?;
        Ok(())
    }

    /// Import a definition. Returns the id the service assigned, if reported.
    pub fn import(&self, upload: &Upload) -> Result<Option<String>, RemoteFailure> {
        let response = self
            .gateway
            .post_file(endpoints::DEFINITIONS_IMPORT, &[], upload)?
            .check()?;
        Ok(response.first_id())
    }
}
