//! Workflow executions API.

use crate::error::RemoteFailure;
use crate::gateway::{SharedGateway, endpoints};
use crate::types::ExecutionResult;

/// Executions API.
#[derive(Clone)]
pub struct ExecutionsApi {
    gateway: SharedGateway,
}

impl std::fmt::Debug for ExecutionsApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionsApi").finish_non_exhaustive()
    }
}

impl ExecutionsApi {
    pub fn new(gateway: SharedGateway) -> Self {
        Self { gateway }
    }

    /// Start a definition with the given parameters. Returns the execution id.
    ///
    /// Parameters are sent at the top level next to `definition_id`.
    pub fn execute(
        &self,
        definition_id: &str,
        params: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<String, RemoteFailure> {
        let mut body = params.clone();
        body.insert(
            "definition_id".to_string(),
            serde_json::json!([definition_id]),
        );

        let response = self
            .gateway
            .post_json(
                endpoints::EXECUTE,
                &[("depth", "1")],
                &serde_json::Value::Object(body),
            )?
            .check()?;
        response
            .first_id()
            .ok_or_else(|| RemoteFailure::permanent("Execution accepted but no execution id returned"))
    }

    /// Current result for an execution, if the service has one yet.
    pub fn results(&self, execution_id: &str) -> Result<Option<ExecutionResult>, RemoteFailure> {
        let page = self
            .gateway
            .get(endpoints::EXECUTION_RESULTS, &[("ids", execution_id)])?
            .check()?;
        Ok(page.decode_resources().into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::InMemoryGateway;
    use crate::gateway::Envelope;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_execute_body_shape() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.on("POST", endpoints::EXECUTE, |_| {
            Ok(Envelope::page(vec![json!({"id": "exec-1"})], 1))
        });

        let mut params = serde_json::Map::new();
        params.insert("device_id".to_string(), json!("abc123"));
        let id = ExecutionsApi::new(gateway.clone())
            .execute("def-1", &params)
            .unwrap();
        assert_eq!(id, "exec-1");

        let request = &gateway.requests()[0];
        assert_eq!(request.param("depth"), Some("1"));
        assert_eq!(
            request.body.as_ref().unwrap(),
            &json!({"definition_id": ["def-1"], "device_id": "abc123"})
        );
    }

    #[test]
    fn test_execute_error_list_fails() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.on("POST", endpoints::EXECUTE, |_| {
            Ok(Envelope::with_errors(["definition disabled"]))
        });

        let err = ExecutionsApi::new(gateway)
            .execute("def-1", &serde_json::Map::new())
            .unwrap_err();
        assert_eq!(err.message, "definition disabled");
    }

    #[test]
    fn test_results_absent_until_reported() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.on("GET", endpoints::EXECUTION_RESULTS, |_| Ok(Envelope::default()));

        let result = ExecutionsApi::new(gateway).results("exec-1").unwrap();
        assert!(result.is_none());
    }
}
