//! Typed API handles.

mod activities;
mod definitions;
mod executions;

pub use activities::{ActivitiesApi, CatalogSource};
pub use definitions::{DEFINITIONS_PAGE_SIZE, DefinitionsApi};
pub use executions::ExecutionsApi;
