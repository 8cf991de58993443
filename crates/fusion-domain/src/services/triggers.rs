//! Trigger type catalog: built-in types plus API-discovered trigger actions.

use fusion_client::ActivitiesApi;
use serde::Serialize;
use tracing::warn;

/// Page size for the single discovery request.
const DISCOVERY_LIMIT: usize = 500;

/// Activity category marking trigger actions.
const TRIGGER_CATEGORY: &str = "trigger";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    BuiltIn,
    Api,
}

/// One trigger type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerInfo {
    pub name: String,
    pub description: String,
    /// YAML structure for the `trigger:` block, when known.
    pub yaml_example: Option<String>,
    /// Activity id for API-discovered triggers.
    pub api_id: Option<String>,
    pub source: TriggerSource,
}

const ON_DEMAND_YAML: &str = "\
trigger:
    next:
        - FirstActionName
    name: On demand
    parameters:
        $schema: https://json-schema.org/draft-07/schema
        properties:
            my_param:
                type: string
                title: My Parameter
                description: Describe this input field.
        required:
            - my_param
        type: object
    type: On demand";

const EVENT_YAML: &str = "\
trigger:
    next:
        - FirstActionName
    name: Event
    type: Event
    # Event triggers receive data from the event payload.
    # Available fields depend on the event source (detection, incident, etc.).";

const SCHEDULED_YAML: &str = "\
trigger:
    next:
        - FirstActionName
    name: Scheduled
    type: Scheduled
    schedule:
        cron: \"0 */6 * * *\"   # Every 6 hours
        timezone: UTC";

const API_YAML: &str = "\
trigger:
    next:
        - FirstActionName
    name: API
    parameters:
        $schema: https://json-schema.org/draft-07/schema
        properties:
            my_param:
                type: string
                title: My Parameter
        required:
            - my_param
        type: object
    type: API";

fn built_in() -> Vec<TriggerInfo> {
    [
        (
            "On demand",
            "Manually executed via the Falcon UI or API. Accepts user-defined input parameters via JSON Schema.",
            ON_DEMAND_YAML,
        ),
        (
            "Event",
            "Fires automatically when a CrowdStrike event occurs (detection, incident, identity event, etc.).",
            EVENT_YAML,
        ),
        (
            "Scheduled",
            "Runs on a cron-like schedule (e.g., every hour, daily).",
            SCHEDULED_YAML,
        ),
        (
            "API",
            "Triggered via the CrowdStrike Workflow Execution API endpoint with JSON parameters.",
            API_YAML,
        ),
    ]
    .into_iter()
    .map(|(name, description, yaml)| TriggerInfo {
        name: name.to_string(),
        description: description.to_string(),
        yaml_example: Some(yaml.to_string()),
        api_id: None,
        source: TriggerSource::BuiltIn,
    })
    .collect()
}

/// Known trigger types, in listing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerCatalog {
    pub triggers: Vec<TriggerInfo>,
}

impl TriggerCatalog {
    /// Only the built-in types.
    pub fn built_in() -> Self {
        Self {
            triggers: built_in(),
        }
    }

    /// Built-in types followed by trigger actions the API reports.
    ///
    /// Discovery failures are logged and leave only the built-ins. Built-ins
    /// win on a name clash.
    pub fn discover(activities: &ActivitiesApi) -> Self {
        let mut catalog = Self::built_in();
        match activities.list_page(DISCOVERY_LIMIT, 0) {
            Ok((entries, _)) => {
                for entry in entries {
                    if !entry.category.eq_ignore_ascii_case(TRIGGER_CATEGORY) || entry.name.is_empty() {
                        continue;
                    }
                    if catalog.triggers.iter().any(|t| t.name == entry.name) {
                        continue;
                    }
                    catalog.triggers.push(TriggerInfo {
                        name: entry.name,
                        description: entry.description,
                        yaml_example: None,
                        api_id: Some(entry.id),
                        source: TriggerSource::Api,
                    });
                }
            }
            Err(e) => warn!(error = %e, "Trigger discovery failed, showing built-in types only"),
        }
        catalog
    }

    /// Look a trigger type up by name, ignoring case.
    pub fn find(&self, name: &str) -> Option<&TriggerInfo> {
        let needle = name.to_lowercase();
        self.triggers.iter().find(|t| t.name.to_lowercase() == needle)
    }

    /// Names in listing order.
    pub fn names(&self) -> Vec<&str> {
        self.triggers.iter().map(|t| t.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::activities;
    use fusion_client::{InMemoryGateway, RemoteFailure, endpoints};
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_built_in_lookup_ignores_case() {
        let catalog = TriggerCatalog::built_in();
        assert_eq!(catalog.names(), vec!["On demand", "Event", "Scheduled", "API"]);
        let info = catalog.find("on DEMAND").unwrap();
        assert!(info.yaml_example.as_deref().unwrap().contains("type: On demand"));
        assert!(catalog.find("webhook").is_none());
    }

    #[test]
    fn test_discovery_merges_api_triggers() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.serve_pages(
            endpoints::ACTIVITIES_COMBINED,
            vec![
                json!({"id": "t1", "name": "Detection created", "category": "Trigger", "description": "New detection"}),
                json!({"id": "t2", "name": "Event", "category": "trigger"}),
                json!({"id": "a1", "name": "Send email", "category": "Notification"}),
            ],
        );

        let catalog = TriggerCatalog::discover(&activities(&gateway));
        assert_eq!(catalog.triggers.len(), 5);
        let discovered = catalog.find("detection created").unwrap();
        assert_eq!(discovered.source, TriggerSource::Api);
        assert_eq!(discovered.api_id.as_deref(), Some("t1"));
        assert_eq!(catalog.find("event").unwrap().source, TriggerSource::BuiltIn);

        let request = &gateway.requests()[0];
        assert_eq!(request.param("limit"), Some("500"));
    }

    #[test]
    fn test_discovery_failure_keeps_built_ins() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.on("GET", endpoints::ACTIVITIES_COMBINED, |_| {
            Err(RemoteFailure::transient("timeout"))
        });

        let catalog = TriggerCatalog::discover(&activities(&gateway));
        assert_eq!(catalog.triggers.len(), 4);
    }
}
