//! Domain services for fusion.
//!
//! This crate holds the policies layered over the Falcon workflow APIs. The
//! transport layer (the `fusion` CLI) talks to these services, never to the
//! raw endpoints:
//!
//! - **Search**: tiered action lookup (direct remote filter, narrowed remote
//!   filter, full catalog scan) and vendor aggregation
//! - **Definitions**: listing, name checks and duplicate detection for local
//!   workflow documents
//! - **Validation**: local preflight checks plus the remote dry-run
//! - **Import**: the per-document duplicate/validate/import lifecycle over a
//!   batch, summarized in a [`BatchReport`]
//! - **Execution**: submit a run and poll it to a terminal status within a
//!   deadline
//! - **Triggers**: the trigger type catalog
//!
//! # Example
//!
//! ```ignore
//! use fusion_domain::{DomainServices, SearchQuery};
//!
//! let services = DomainServices::new(activities, definitions, executions);
//! let found = services.search().search(&SearchQuery::name("contain host"))?;
//! ```

mod error;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{DomainError, Result};
pub use services::DomainServices;
pub use services::definitions::{
    CleanDocument, DefinitionService, DocumentCheck, DuplicateDocument, DuplicateIndex,
};
pub use services::document::{
    NameExtractor, SharedNameExtractor, TopLevelNameExtractor, WorkflowDocument,
};
pub use services::execution::{
    DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT, ExecutionHandle, ExecutionPoller, ExecutionStatus,
    PollOutcome, PollSettings, StatusObserver,
};
pub use services::import::{
    BatchReport, ImportItem, ImportOptions, ImportOrchestrator, ImportStatus, IndexStatus,
};
pub use services::params::{coerce_value, collect_params, parse_params_json};
pub use services::search::{
    ActionPage, SearchQuery, SearchResult, SearchService, SearchTier, VendorListing, VendorSummary,
    aggregate_vendors,
};
pub use services::triggers::{TriggerCatalog, TriggerInfo, TriggerSource};
pub use services::validation::{
    Issue, RemoteCheck, Severity, ValidationReport, ValidationService, preflight_check,
    preflight_path,
};
