//! In-memory [`Gateway`] for tests of components built on the client.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::error::RemoteFailure;
use crate::gateway::{Envelope, Gateway, Upload};

type EnvelopeHandler = Arc<dyn Fn(&RecordedRequest) -> Result<Envelope, RemoteFailure> + Send + Sync>;
type TextHandler = Arc<dyn Fn(&RecordedRequest) -> Result<String, RemoteFailure> + Send + Sync>;

/// A request as seen by the fake.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub upload: Option<Upload>,
}

impl RecordedRequest {
    /// First value of a query parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Uploaded document as UTF-8 text.
    pub fn upload_text(&self) -> Option<String> {
        self.upload
            .as_ref()
            .map(|u| String::from_utf8_lossy(&u.content).into_owned())
    }
}

/// Route table keyed by method and path. Unrouted requests fail with 404.
#[derive(Default)]
pub struct InMemoryGateway {
    routes: Mutex<HashMap<(String, String), EnvelopeHandler>>,
    text_routes: Mutex<HashMap<String, TextHandler>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl std::fmt::Debug for InMemoryGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryGateway")
            .field("requests", &self.requests.lock().len())
            .finish()
    }
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `method path` (`GET` or `POST`) to `handler`.
    pub fn on<F>(&self, method: &str, path: &str, handler: F)
    where
        F: Fn(&RecordedRequest) -> Result<Envelope, RemoteFailure> + Send + Sync + 'static,
    {
        self.routes
            .lock()
            .insert((method.to_uppercase(), path.to_string()), Arc::new(handler));
    }

    /// Route text GETs on `path` to `handler`.
    pub fn on_text<F>(&self, path: &str, handler: F)
    where
        F: Fn(&RecordedRequest) -> Result<String, RemoteFailure> + Send + Sync + 'static,
    {
        self.text_routes
            .lock()
            .insert(path.to_string(), Arc::new(handler));
    }

    /// Serve `items` on `path`, honouring `limit` and `offset`.
    pub fn serve_pages(&self, path: &str, items: Vec<Value>) {
        self.on("GET", path, move |req| {
            let offset = req
                .param("offset")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(0)
                .min(items.len());
            let limit = req
                .param("limit")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(items.len());
            let end = offset.saturating_add(limit).min(items.len());
            Ok(Envelope::page(items[offset..end].to_vec(), items.len()))
        });
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Requests received on `path`.
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    /// Number of requests received on `path`.
    pub fn count(&self, path: &str) -> usize {
        self.requests.lock().iter().filter(|r| r.path == path).count()
    }

    fn record(
        &self,
        method: &str,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
        upload: Option<Upload>,
    ) -> RecordedRequest {
        let request = RecordedRequest {
            method: method.to_string(),
            path: path.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body,
            upload,
        };
        self.requests.lock().push(request.clone());
        request
    }

    fn dispatch(&self, request: &RecordedRequest) -> Result<Envelope, RemoteFailure> {
        let handler = self
            .routes
            .lock()
            .get(&(request.method.clone(), request.path.clone()))
            .cloned();
        match handler {
            Some(handler) => handler(request),
            None => Err(not_found(request)),
        }
    }
}

fn not_found(request: &RecordedRequest) -> RemoteFailure {
    RemoteFailure::from_status(
        404,
        Some(format!("no route for {} {}", request.method, request.path)),
        "",
    )
}

impl Gateway for InMemoryGateway {
    fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Envelope, RemoteFailure> {
        let request = self.record("GET", path, query, None, None);
        self.dispatch(&request)
    }

    fn get_text(&self, path: &str, query: &[(&str, &str)]) -> Result<String, RemoteFailure> {
        let request = self.record("GET", path, query, None, None);
        let handler = self.text_routes.lock().get(path).cloned();
        match handler {
            Some(handler) => handler(&request),
            None => Err(not_found(&request)),
        }
    }

    fn post_json(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: &Value,
    ) -> Result<Envelope, RemoteFailure> {
        let request = self.record("POST", path, query, Some(body.clone()), None);
        self.dispatch(&request)
    }

    fn post_file(
        &self,
        path: &str,
        query: &[(&str, &str)],
        upload: &Upload,
    ) -> Result<Envelope, RemoteFailure> {
        let request = self.record("POST", path, query, None, Some(upload.clone()));
        self.dispatch(&request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unrouted_request_is_not_found() {
        let gateway = InMemoryGateway::new();
        let err = gateway.get("/missing", &[]).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(gateway.count("/missing"), 1);
    }

    #[test]
    fn test_serve_pages_slices() {
        let gateway = InMemoryGateway::new();
        gateway.serve_pages("/p", (0..5).map(|i| json!({"id": i})).collect());

        let page = gateway.get("/p", &[("limit", "2"), ("offset", "4")]).unwrap();
        assert_eq!(page.resources.len(), 1);
        assert_eq!(page.total(), Some(5));
    }
}
