//! HTTP implementation of the [`Gateway`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{RequestBuilder, Response, multipart};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use url::Url;

use fusion_oauth::SharedTokenProvider;

use crate::api::{ActivitiesApi, DefinitionsApi, ExecutionsApi};
use crate::error::{Error, RemoteFailure, Result};
use crate::gateway::{Envelope, Gateway, SharedGateway, Upload};

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Content type of uploaded workflow documents.
const UPLOAD_MIME: &str = "application/x-yaml";

/// Multipart field carrying the uploaded document.
const UPLOAD_FIELD: &str = "data_file";

/// Falcon API client.
///
/// Cheap to clone; clones share the HTTP connection pool and the token
/// provider, so one bearer token serves every call in a run.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use fusion_client::FalconClient;
/// use fusion_oauth::StaticTokenProvider;
///
/// # fn example() -> fusion_client::Result<()> {
/// let client = FalconClient::builder()
///     .base_url("https://api.crowdstrike.com")
///     .token_provider(Arc::new(StaticTokenProvider::new("token")))
///     .build()?;
///
/// let definitions = client.definitions().fetch_all();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct FalconClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::blocking::Client,
    base_url: Url,
    tokens: Option<SharedTokenProvider>,
}

impl std::fmt::Debug for FalconClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FalconClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("authenticated", &self.inner.tokens.is_some())
            .finish()
    }
}

impl FalconClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// This client as a shared gateway.
    pub fn gateway(&self) -> SharedGateway {
        Arc::new(self.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Access the activities (actions) API.
    pub fn activities(&self) -> ActivitiesApi {
        ActivitiesApi::new(self.gateway())
    }

    /// Access the workflow definitions API.
    pub fn definitions(&self) -> DefinitionsApi {
        DefinitionsApi::new(self.gateway())
    }

    /// Access the executions API.
    pub fn executions(&self) -> ExecutionsApi {
        ExecutionsApi::new(self.gateway())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal HTTP methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Build a URL for an API path.
    pub(crate) fn url(&self, path: &str) -> std::result::Result<Url, RemoteFailure> {
        self.inner
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| RemoteFailure::permanent(format!("Invalid URL for '{}': {}", path, e)))
    }

    fn authorize(&self, request: RequestBuilder) -> std::result::Result<RequestBuilder, RemoteFailure> {
        match &self.inner.tokens {
            Some(tokens) => Ok(request.bearer_auth(tokens.access_token()?)),
            None => Ok(request),
        }
    }

    /// Send a request, re-authenticating once if the token was rejected.
    fn send<F>(&self, build: F) -> std::result::Result<Response, RemoteFailure>
    where
        F: Fn() -> std::result::Result<RequestBuilder, RemoteFailure>,
    {
        let response = self.authorize(build()?)?.send()?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        let Some(tokens) = &self.inner.tokens else {
            return Ok(response);
        };

        tracing::debug!("Bearer token rejected, re-authenticating");
        tokens.invalidate();
        Ok(self.authorize(build()?)?.send()?)
    }

    /// Decode a response into the standard envelope.
    fn envelope(&self, response: Response) -> std::result::Result<Envelope, RemoteFailure> {
        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            return Err(failure_from_body(status, &body));
        }
        if body.trim().is_empty() {
            return Ok(Envelope::default());
        }
        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            RemoteFailure::permanent(format!("Unexpected response ({}): {}", e, preview))
        })
    }
}

/// Build a failure from a non-success response body.
fn failure_from_body(status: StatusCode, body: &str) -> RemoteFailure {
    let structured = serde_json::from_str::<Envelope>(body)
        .ok()
        .and_then(|env| env.error_message());
    let failure = RemoteFailure::from_status(status.as_u16(), structured, body);
    tracing::debug!(status = status.as_u16(), error = %failure, "Request failed");
    failure
}

impl Gateway for FalconClient {
    fn get(&self, path: &str, query: &[(&str, &str)]) -> std::result::Result<Envelope, RemoteFailure> {
        let url = self.url(path)?;
        tracing::debug!(path, ?query, "GET");
        let response = self.send(|| Ok(self.inner.http.get(url.clone()).query(query)))?;
        self.envelope(response)
    }

    fn get_text(&self, path: &str, query: &[(&str, &str)]) -> std::result::Result<String, RemoteFailure> {
        let url = self.url(path)?;
        tracing::debug!(path, ?query, "GET (text)");
        let response = self.send(|| {
            Ok(self
                .inner
                .http
                .get(url.clone())
                .query(query)
                .header(ACCEPT, "application/yaml, application/json;q=0.5"))
        })?;

        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("json"));
        let body = response.text()?;

        if !status.is_success() {
            return Err(failure_from_body(status, &body));
        }
        // A JSON body on a text endpoint is an error envelope.
        if is_json
            && let Ok(env) = serde_json::from_str::<Envelope>(&body)
            && let Some(message) = env.error_message()
        {
            return Err(RemoteFailure::permanent(message));
        }
        Ok(body)
    }

    fn post_json(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> std::result::Result<Envelope, RemoteFailure> {
        let url = self.url(path)?;
        tracing::debug!(path, ?query, "POST");
        let response = self.send(|| Ok(self.inner.http.post(url.clone()).query(query).json(body)))?;
        self.envelope(response)
    }

    fn post_file(
        &self,
        path: &str,
        query: &[(&str, &str)],
        upload: &Upload,
    ) -> std::result::Result<Envelope, RemoteFailure> {
        let url = self.url(path)?;
        tracing::debug!(path, ?query, file = %upload.file_name, "POST (upload)");
        let response = self.send(|| {
            let part = multipart::Part::bytes(upload.content.clone())
                .file_name(upload.file_name.clone())
                .mime_str(UPLOAD_MIME)?;
            let form = multipart::Form::new().part(UPLOAD_FIELD, part);
            Ok(self.inner.http.post(url.clone()).query(query).multipart(form))
        })?;
        self.envelope(response)
    }
}

/// Builder for creating a FalconClient.
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: Option<String>,
    tokens: Option<SharedTokenProvider>,
    timeout: Duration,
    user_agent: Option<String>,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            base_url: None,
            tokens: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }

    /// Set the API base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the bearer token provider.
    pub fn token_provider(mut self, tokens: SharedTokenProvider) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<FalconClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Config("base_url is required".to_string()))?;

        let mut base_url = Url::parse(&base_url)?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("fusion-client/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::blocking::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .timeout(self.timeout)
            .build()
            .map_err(RemoteFailure::from)?;

        Ok(FalconClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                tokens: self.tokens,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusion_oauth::StaticTokenProvider;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> FalconClient {
        ClientBuilder::new()
            .base_url(server.uri())
            .token_provider(Arc::new(StaticTokenProvider::new("tok")))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_base_url() {
        let result = ClientBuilder::new().build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_normalizes_trailing_slash() {
        let client = ClientBuilder::new()
            .base_url("https://api.example.com")
            .build()
            .unwrap();
        assert_eq!(client.base_url().as_str(), "https://api.example.com/");

        let client = ClientBuilder::new()
            .base_url("https://api.example.com/")
            .build()
            .unwrap();
        assert_eq!(client.base_url().as_str(), "https://api.example.com/");
    }

    #[test]
    fn test_url_building() {
        let client = ClientBuilder::new()
            .base_url("https://api.example.com")
            .build()
            .unwrap();

        let url = client.url("/workflows/combined/activities/v1").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/workflows/combined/activities/v1"
        );
    }

    #[test]
    fn test_get_sends_bearer_and_query() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let server = rt.block_on(MockServer::start());
        rt.block_on(
            Mock::given(method("GET"))
                .and(path("/workflows/combined/activities/v1"))
                .and(header("authorization", "Bearer tok"))
                .and(query_param("limit", "2"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "meta": {"pagination": {"total": 5}},
                    "resources": [{"id": "a"}, {"id": "b"}],
                    "errors": []
                })))
                .mount(&server),
        );

        let env = client_for(&server)
            .get("/workflows/combined/activities/v1", &[("limit", "2")])
            .unwrap();
        assert_eq!(env.resources.len(), 2);
        assert_eq!(env.total(), Some(5));
    }

    #[test]
    fn test_error_status_uses_structured_errors() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let server = rt.block_on(MockServer::start());
        rt.block_on(
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                    "errors": [{"code": 400, "message": "invalid filter"}]
                })))
                .mount(&server),
        );

        let err = client_for(&server).get("/x", &[]).unwrap_err();
        assert_eq!(err.message, "invalid filter");
        assert_eq!(err.status, Some(400));
        assert!(!err.retryable);
    }

    #[test]
    fn test_server_error_is_retryable() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let server = rt.block_on(MockServer::start());
        rt.block_on(
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
                .mount(&server),
        );

        let err = client_for(&server).get("/x", &[]).unwrap_err();
        assert!(err.retryable);
        assert_eq!(err.message, "upstream down");
    }

    #[test]
    fn test_get_text_returns_yaml() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let server = rt.block_on(MockServer::start());
        rt.block_on(
            Mock::given(method("GET"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .insert_header("content-type", "application/yaml")
                        .set_body_string("name: Demo\n"),
                )
                .mount(&server),
        );

        let text = client_for(&server).get_text("/export", &[]).unwrap();
        assert_eq!(text, "name: Demo\n");
    }

    #[test]
    fn test_get_text_json_errors_fail() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let server = rt.block_on(MockServer::start());
        rt.block_on(
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "errors": [{"message": "definition not found"}]
                })))
                .mount(&server),
        );

        let err = client_for(&server).get_text("/export", &[]).unwrap_err();
        assert_eq!(err.message, "definition not found");
    }

    #[test]
    fn test_post_file_uses_multipart_field() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let server = rt.block_on(MockServer::start());
        rt.block_on(
            Mock::given(method("POST"))
                .and(query_param("validate_only", "true"))
                .and(body_string_contains("name=\"data_file\""))
                .and(body_string_contains("name: Demo"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resources": []})))
                .expect(1)
                .mount(&server),
        );

        let upload = Upload::new("demo.yaml", "name: Demo\n");
        client_for(&server)
            .post_file("/import", &[("validate_only", "true")], &upload)
            .unwrap();
        rt.block_on(server.verify());
    }
}
