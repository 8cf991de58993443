//! OAuth2 client-credentials grant.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{OAuthError, Result};

/// Token endpoint path, relative to the API base URL.
pub const TOKEN_PATH: &str = "/oauth2/token";

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: u64 = 1799;

/// API client id/secret pair plus the base URL they belong to.
///
/// The secret is held in memory only and never printed by `Debug`.
#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub base_url: String,
}

impl ClientCredentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Full URL of the token endpoint.
    pub fn token_url(&self) -> String {
        format!("{}{}", self.base_url, TOKEN_PATH)
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &mask_secret(&self.client_id))
            .field("client_secret", &"********")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Token returned by the client-credentials exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
    #[serde(default)]
    pub token_type: String,
}

fn default_expires_in() -> u64 {
    DEFAULT_EXPIRES_IN_SECS
}

#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    #[serde(default)]
    errors: Vec<TokenErrorItem>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorItem {
    #[serde(default)]
    message: String,
}

/// Exchange a client id/secret pair for a bearer token.
pub fn exchange_client_credentials(
    http: &reqwest::blocking::Client,
    credentials: &ClientCredentials,
) -> Result<TokenResponse> {
    if credentials.client_id.is_empty() || credentials.client_secret.is_empty() {
        return Err(OAuthError::Config(
            "client id and client secret must both be set".to_string(),
        ));
    }

    let form = [
        ("client_id", credentials.client_id.as_str()),
        ("client_secret", credentials.client_secret.as_str()),
        ("grant_type", "client_credentials"),
    ];

    let response = http.post(credentials.token_url()).form(&form).send()?;
    let status = response.status();

    if !status.is_success() {
        let text = response.text().unwrap_or_default();
        let message = serde_json::from_str::<TokenErrorBody>(&text)
            .ok()
            .map(|body| {
                body.errors
                    .into_iter()
                    .map(|e| e.message)
                    .filter(|m| !m.is_empty())
                    .collect::<Vec<_>>()
                    .join("; ")
            })
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| text.chars().take(500).collect());
        return Err(OAuthError::Rejected {
            status: status.as_u16(),
            message,
        });
    }

    let body = response.text()?;
    serde_json::from_str(&body)
        .map_err(|e| OAuthError::Serialization(format!("Failed to parse token response: {}", e)))
}

/// Shorten an identifier for display, keeping only its first 8 and last 4 characters.
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn mock_server() -> (tokio::runtime::Runtime, MockServer) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let server = rt.block_on(MockServer::start());
        (rt, server)
    }

    #[test]
    fn test_credentials_trim_base_url() {
        let creds = ClientCredentials::new("id", "secret", "https://api.example.com/");
        assert_eq!(creds.token_url(), "https://api.example.com/oauth2/token");
    }

    #[test]
    fn test_debug_hides_secret() {
        let creds = ClientCredentials::new("abcdefgh12345678", "topsecret", "https://x");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("topsecret"));
        assert!(debug.contains("abcdefgh...5678"));
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("abcdefgh12345678"), "abcdefgh...5678");
        assert_eq!(mask_secret("short"), "*****");
    }

    #[test]
    fn test_exchange_success() {
        let (rt, server) = mock_server();
        rt.block_on(
            Mock::given(method("POST"))
                .and(path("/oauth2/token"))
                .and(body_string_contains("grant_type=client_credentials"))
                .and(body_string_contains("client_id=my-id"))
                .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                    "access_token": "tok-123",
                    "expires_in": 1799,
                    "token_type": "bearer"
                })))
                .expect(1)
                .mount(&server),
        );

        let http = reqwest::blocking::Client::new();
        let creds = ClientCredentials::new("my-id", "my-secret", server.uri());
        let token = exchange_client_credentials(&http, &creds).unwrap();
        assert_eq!(token.access_token, "tok-123");
        assert_eq!(token.expires_in, 1799);
    }

    #[test]
    fn test_exchange_defaults_expiry() {
        let (rt, server) = mock_server();
        rt.block_on(
            Mock::given(method("POST"))
                .and(path("/oauth2/token"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(serde_json::json!({ "access_token": "tok" })),
                )
                .mount(&server),
        );

        let http = reqwest::blocking::Client::new();
        let creds = ClientCredentials::new("id", "secret", server.uri());
        let token = exchange_client_credentials(&http, &creds).unwrap();
        assert_eq!(token.expires_in, DEFAULT_EXPIRES_IN_SECS);
    }

    #[test]
    fn test_exchange_rejected() {
        let (rt, server) = mock_server();
        rt.block_on(
            Mock::given(method("POST"))
                .and(path("/oauth2/token"))
                .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                    "errors": [{ "code": 403, "message": "access denied, invalid credentials" }]
                })))
                .mount(&server),
        );

        let http = reqwest::blocking::Client::new();
        let creds = ClientCredentials::new("id", "bad", server.uri());
        let err = exchange_client_credentials(&http, &creds).unwrap_err();
        match err {
            OAuthError::Rejected { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "access denied, invalid credentials");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_exchange_requires_credentials() {
        let http = reqwest::blocking::Client::new();
        let creds = ClientCredentials::new("", "", "http://127.0.0.1:9");
        let err = exchange_client_credentials(&http, &creds).unwrap_err();
        assert!(matches!(err, OAuthError::Config(_)));
        assert!(!err.is_transient());
    }
}
