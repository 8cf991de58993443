//! Fakes shared by the service tests.

use std::sync::Arc;

use fusion_client::{
    ActivitiesApi, DefinitionsApi, Envelope, ExecutionsApi, InMemoryGateway, ManualClock,
    endpoints,
};
use serde_json::{Value, json};

pub(crate) fn action(id: &str, name: &str, vendor: &str) -> Value {
    json!({"id": id, "name": name, "vendor": vendor, "use_cases": [], "has_permission": true})
}

pub(crate) fn definition(id: &str, name: &str) -> Value {
    json!({"id": id, "name": name, "enabled": true, "trigger": {"type": "On demand"}})
}

/// Whether a filter clause matches, mimicking the remote: vendor is an exact
/// (case-insensitive) match and name a single-token substring match.
fn clause_matches(entry: &Value, clause: &str) -> bool {
    let Some((field, quoted)) = clause.split_once(':') else {
        return false;
    };
    let value = quoted
        .trim_matches('\'')
        .replace("\\'", "'")
        .to_lowercase();
    let actual = entry[field].as_str().unwrap_or_default().to_lowercase();
    match field {
        "vendor" => actual == value,
        "name" => !value.contains(char::is_whitespace) && actual.contains(&value),
        _ => false,
    }
}

/// A gateway serving `actions` with remote filter support.
pub(crate) fn catalog_gateway(actions: Vec<Value>) -> Arc<InMemoryGateway> {
    let gateway = Arc::new(InMemoryGateway::new());
    gateway.on("GET", endpoints::ACTIVITIES_COMBINED, move |req| {
        let matching: Vec<Value> = match req.param("filter") {
            Some(filter) => actions
                .iter()
                .filter(|a| filter.split('+').all(|clause| clause_matches(a, clause)))
                .cloned()
                .collect(),
            None => actions.clone(),
        };
        let offset: usize = req.param("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
        let limit: usize = req.param("limit").and_then(|v| v.parse().ok()).unwrap_or(200);
        let start = offset.min(matching.len());
        let end = (start + limit).min(matching.len());
        Ok(Envelope::page(matching[start..end].to_vec(), matching.len()))
    });
    gateway
}

pub(crate) fn activities(gateway: &Arc<InMemoryGateway>) -> ActivitiesApi {
    ActivitiesApi::new(gateway.clone()).with_clock(Arc::new(ManualClock::new()))
}

pub(crate) fn definitions(gateway: &Arc<InMemoryGateway>) -> DefinitionsApi {
    DefinitionsApi::new(gateway.clone()).with_clock(Arc::new(ManualClock::new()))
}

pub(crate) fn executions(gateway: &Arc<InMemoryGateway>) -> ExecutionsApi {
    ExecutionsApi::new(gateway.clone())
}

/// Filter expressions sent to the catalog, in order.
pub(crate) fn filter_requests(gateway: &InMemoryGateway) -> Vec<String> {
    gateway
        .requests_to(endpoints::ACTIVITIES_COMBINED)
        .iter()
        .filter_map(|r| r.param("filter").map(str::to_string))
        .collect()
}
