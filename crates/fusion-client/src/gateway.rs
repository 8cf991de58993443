//! The request/response boundary to the remote catalog service.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::RemoteFailure;

/// Endpoint paths, relative to the API base URL.
pub mod endpoints {
    /// Activities, paginated and filterable.
    pub const ACTIVITIES_COMBINED: &str = "/workflows/combined/activities/v1";
    /// Activities by id.
    pub const ACTIVITIES_ENTITIES: &str = "/workflows/entities/activities/v1";
    /// Workflow definitions, paginated.
    pub const DEFINITIONS_COMBINED: &str = "/workflows/combined/definitions/v1";
    /// Workflow definitions by id.
    pub const DEFINITIONS_ENTITIES: &str = "/workflows/entities/definitions/v1";
    /// Definition import (multipart upload, optional `validate_only`).
    pub const DEFINITIONS_IMPORT: &str = "/workflows/entities/definitions/import/v1";
    /// Definition export (YAML text).
    pub const DEFINITIONS_EXPORT: &str = "/workflows/entities/definitions/export/v1";
    /// Execute a definition.
    pub const EXECUTE: &str = "/workflows/entities/execute/v1";
    /// Execution results by id.
    pub const EXECUTION_RESULTS: &str = "/workflows/entities/execution-results/v1";
}

/// Thin request/response boundary.
///
/// Implementations perform one blocking request per call and report every
/// problem as a [`RemoteFailure`]. A 2xx body carrying a structured `errors`
/// list is returned as `Ok`; callers decide whether those errors matter.
pub trait Gateway: Send + Sync {
    /// GET returning the standard JSON envelope.
    fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Envelope, RemoteFailure>;

    /// GET returning the raw body text (used for YAML export).
    fn get_text(&self, path: &str, query: &[(&str, &str)]) -> Result<String, RemoteFailure>;

    /// POST with a JSON body.
    fn post_json(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> Result<Envelope, RemoteFailure>;

    /// POST a multipart file upload.
    fn post_file(
        &self,
        path: &str,
        query: &[(&str, &str)],
        upload: &Upload,
    ) -> Result<Envelope, RemoteFailure>;
}

/// Gateway shared by every API handle in one run.
pub type SharedGateway = Arc<dyn Gateway>;

/// A document to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub content: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Envelope
// ─────────────────────────────────────────────────────────────────────────────

/// Standard response envelope: `{meta, resources, errors}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, deserialize_with = "null_as_default")]
    pub resources: Vec<serde_json::Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub meta: Meta,
    #[serde(default, deserialize_with = "null_as_default")]
    pub errors: Vec<ApiErrorItem>,
}

/// Envelope metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

/// Pagination block of the envelope metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub offset: Option<serde_json::Value>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// One entry of the structured `errors` list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorItem {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiErrorItem {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: Some(message.into()),
        }
    }

    fn describe(&self) -> String {
        match (&self.message, self.code) {
            (Some(message), _) if !message.is_empty() => message.clone(),
            (_, Some(code)) => format!("error code {}", code),
            _ => "unknown error".to_string(),
        }
    }
}

impl Envelope {
    /// Build a page envelope.
    pub fn page(resources: Vec<serde_json::Value>, total: usize) -> Self {
        Self {
            resources,
            meta: Meta {
                pagination: Some(Pagination {
                    total,
                    ..Default::default()
                }),
            },
            errors: Vec::new(),
        }
    }

    /// Build an envelope carrying only the given error messages.
    pub fn with_errors<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            errors: messages.into_iter().map(ApiErrorItem::new).collect(),
            ..Default::default()
        }
    }

    /// Reported total across all pages.
    pub fn total(&self) -> Option<usize> {
        self.meta.pagination.as_ref().map(|p| p.total)
    }

    /// All structured error messages joined by `"; "`.
    pub fn error_message(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }
        Some(
            self.errors
                .iter()
                .map(ApiErrorItem::describe)
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Turn a body-level error list into a failure.
    pub fn check(self) -> Result<Self, RemoteFailure> {
        match self.error_message() {
            Some(message) => Err(RemoteFailure::permanent(message)),
            None => Ok(self),
        }
    }

    /// The `id` of the first resource, if any.
    pub fn first_id(&self) -> Option<String> {
        self.resources
            .first()
            .and_then(|r| r.get("id"))
            .and_then(|id| id.as_str())
            .map(str::to_string)
    }

    /// Decode every resource, skipping (and logging) malformed ones.
    pub fn decode_resources<T: DeserializeOwned>(&self) -> Vec<T> {
        self.resources
            .iter()
            .filter_map(|raw| match serde_json::from_value::<T>(raw.clone()) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed resource");
                    None
                }
            })
            .collect()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_tolerates_nulls() {
        let env: Envelope = serde_json::from_value(json!({
            "meta": null,
            "resources": null,
            "errors": null
        }))
        .unwrap();
        assert!(env.resources.is_empty());
        assert!(env.errors.is_empty());
        assert_eq!(env.total(), None);
    }

    #[test]
    fn test_error_messages_joined() {
        let env: Envelope = serde_json::from_value(json!({
            "errors": [{"code": 400, "message": "first"}, {"code": 409}]
        }))
        .unwrap();
        assert_eq!(env.error_message().unwrap(), "first; error code 409");
        assert!(env.check().is_err());
    }

    #[test]
    fn test_total_and_first_id() {
        let env = Envelope::page(vec![json!({"id": "a"}), json!({"id": "b"})], 7);
        assert_eq!(env.total(), Some(7));
        assert_eq!(env.first_id().as_deref(), Some("a"));
        assert!(env.check().is_ok());
    }
}
