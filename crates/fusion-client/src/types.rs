//! Resource types returned by the Falcon workflow APIs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Catalog entries (activities / actions)
// ─────────────────────────────────────────────────────────────────────────────

/// One action of the activity catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vendor: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub use_cases: Vec<String>,
    #[serde(default = "default_true", deserialize_with = "null_as_true")]
    pub has_permission: bool,
    /// Input field schemas, keyed by field name.
    #[serde(
        default,
        deserialize_with = "lenient_properties",
        skip_serializing_if = "Option::is_none"
    )]
    pub properties: Option<BTreeMap<String, FieldSchema>>,
    /// Fields this client does not model, kept for round-tripping the cache.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CatalogEntry {
    /// Minimal entry, mostly useful for tests and fakes.
    pub fn new(id: impl Into<String>, name: impl Into<String>, vendor: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            vendor: vendor.into(),
            category: String::new(),
            description: String::new(),
            use_cases: Vec::new(),
            has_permission: true,
            properties: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Extra string field, if present.
    fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|v| !v.is_empty())
    }

    pub fn namespace(&self) -> Option<&str> {
        self.extra_str("namespace")
    }

    /// Action class; class-based actions need a `version_constraint`.
    pub fn class(&self) -> Option<&str> {
        self.extra_str("class")
    }

    /// Third-party plugin actions need a `config_id` in workflow documents.
    pub fn is_plugin(&self) -> bool {
        self.namespace().is_some_and(|ns| ns.contains("plugin"))
            || !matches!(self.vendor.as_str(), "" | "CrowdStrike" | "Unknown")
    }

    /// Vendor name, or `"Unknown"` when the service reported none.
    pub fn vendor_or_unknown(&self) -> &str {
        if self.vendor.is_empty() {
            "Unknown"
        } else {
            &self.vendor
        }
    }
}

/// Schema of one action input field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Workflow definitions
// ─────────────────────────────────────────────────────────────────────────────

/// A workflow definition stored by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<DefinitionTrigger>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Definition {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            enabled: None,
            trigger: None,
            last_modified_timestamp: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Trigger type, e.g. `"On demand"`.
    pub fn trigger_type(&self) -> Option<&str> {
        self.trigger.as_ref().and_then(|t| t.trigger_type.as_deref())
    }

    /// Declared input parameters: `trigger.parameters.properties`.
    pub fn parameter_schema(&self) -> BTreeMap<String, FieldSchema> {
        self.trigger
            .as_ref()
            .and_then(|t| t.parameters.as_ref())
            .and_then(|p| p.get("properties"))
            .and_then(|props| serde_json::from_value(props.clone()).ok())
            .unwrap_or_default()
    }

    /// Names listed under `trigger.parameters.required`.
    pub fn required_parameters(&self) -> Vec<String> {
        self.trigger
            .as_ref()
            .and_then(|t| t.parameters.as_ref())
            .and_then(|p| p.get("required"))
            .and_then(|r| r.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Trigger block of a definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefinitionTrigger {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub trigger_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Executions
// ─────────────────────────────────────────────────────────────────────────────

/// Execution result as reported by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ExecutionResult {
    pub fn with_status(status: impl Into<String>) -> Self {
        Self {
            execution_id: None,
            status: status.into(),
            output: None,
            extra: serde_json::Map::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cache file
// ─────────────────────────────────────────────────────────────────────────────

/// On-disk catalog snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub fetched_at: DateTime<Utc>,
    pub resources: Vec<CatalogEntry>,
}

/// Schemas that do not fit [`FieldSchema`] are dropped rather than failing the entry.
fn lenient_properties<'de, D>(
    deserializer: D,
) -> Result<Option<BTreeMap<String, FieldSchema>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| serde_json::from_value(value).ok()))
}

fn default_true() -> bool {
    true
}

fn null_as_true<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(true))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
