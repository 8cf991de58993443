//! Domain services.
//!
//! Each service wraps one or more catalog APIs from `fusion-client` and adds
//! the lookup, checking and orchestration policies the CLI relies on.

pub mod definitions;
pub mod document;
pub mod execution;
pub mod import;
pub mod params;
pub mod search;
pub mod triggers;
pub mod validation;

use fusion_client::{ActivitiesApi, DefinitionsApi, ExecutionsApi, SharedClock, SystemClock};
use tracing::debug;

use document::{SharedNameExtractor, TopLevelNameExtractor};

/// Domain services facade.
///
/// Holds the API handles once and hands out the services built on them.
/// Services are cheap to construct; every accessor returns a fresh one.
#[derive(Debug, Clone)]
pub struct DomainServices {
    activities: ActivitiesApi,
    definitions: DefinitionsApi,
    executions: ExecutionsApi,
    extractor: SharedNameExtractor,
    clock: SharedClock,
}

impl DomainServices {
    pub fn new(
        activities: ActivitiesApi,
        definitions: DefinitionsApi,
        executions: ExecutionsApi,
    ) -> Self {
        debug!("Initializing domain services");
        Self {
            activities,
            definitions,
            executions,
            extractor: TopLevelNameExtractor::shared(),
            clock: SystemClock::shared(),
        }
    }

    /// Replace the document name extractor.
    pub fn with_extractor(mut self, extractor: SharedNameExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Replace the clock used by the execution poller.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn activities(&self) -> &ActivitiesApi {
        &self.activities
    }

    pub fn search(&self) -> search::SearchService {
        search::SearchService::new(self.activities.clone())
    }

    pub fn definitions(&self) -> definitions::DefinitionService {
        definitions::DefinitionService::new(self.definitions.clone(), self.extractor.clone())
    }

    pub fn validation(&self) -> validation::ValidationService {
        validation::ValidationService::new(self.definitions.clone())
    }

    pub fn importer(&self) -> import::ImportOrchestrator {
        import::ImportOrchestrator::new(
            self.definitions(),
            self.validation(),
            self.definitions.clone(),
            self.extractor.clone(),
        )
    }

    pub fn poller(&self) -> execution::ExecutionPoller {
        execution::ExecutionPoller::new(self.executions.clone()).with_clock(self.clock.clone())
    }

    /// Built-in triggers merged with those discovered from the catalog.
    pub fn triggers(&self) -> triggers::TriggerCatalog {
        triggers::TriggerCatalog::discover(&self.activities)
    }
}
