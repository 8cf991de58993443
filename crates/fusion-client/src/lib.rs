//! Blocking client for the Falcon workflow APIs.
//!
//! This crate is the access layer between the workflow tooling and the
//! remote catalog service. It provides:
//!
//! - **Gateway**: the [`Gateway`] request/response boundary and its HTTP
//!   implementation [`FalconClient`]; every failure is normalized into a
//!   [`RemoteFailure`]
//! - **Pagination**: [`Paginator`] walks offset-based pages, retrying
//!   transient failures with linear backoff and returning partial results
//!   tagged as incomplete instead of failing
//! - **Cache**: [`CacheStore`] persists a full activity catalog snapshot with
//!   a freshness window; every cache problem degrades to "no cache"
//! - **Typed APIs**: activities, definitions and executions
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use fusion_client::FalconClient;
//! use fusion_oauth::StaticTokenProvider;
//!
//! # fn example() -> fusion_client::Result<()> {
//! let client = FalconClient::builder()
//!     .base_url("https://api.crowdstrike.com")
//!     .token_provider(Arc::new(StaticTokenProvider::new("token")))
//!     .build()?;
//!
//! let source = client.activities().load_or_fetch();
//! println!("{} actions (complete: {})", source.entries.len(), source.complete);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cache;
pub mod client;
pub mod clock;
pub mod error;
pub mod fake;
pub mod fetcher;
pub mod fql;
pub mod gateway;
pub mod types;

pub use api::{ActivitiesApi, CatalogSource, DefinitionsApi, ExecutionsApi};
pub use cache::CacheStore;
pub use client::{ClientBuilder, FalconClient};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use error::{Error, RemoteFailure, Result};
pub use fake::{InMemoryGateway, RecordedRequest};
pub use fetcher::{FetchPolicy, PageProgress, PageSet, Paginator, ProgressFn};
pub use fql::Fql;
pub use gateway::{ApiErrorItem, Envelope, Gateway, SharedGateway, Upload, endpoints};
pub use types::*;
