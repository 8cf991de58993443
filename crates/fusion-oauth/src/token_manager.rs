//! Bearer token lifecycle.
//!
//! The token is cached in memory only, inside a [`CredentialCache`] owned by
//! the provider that the gateway client holds. There is no process-wide
//! singleton; every call site sharing a provider shares its cached token.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::{OAuthError, Result};
use crate::oauth::{ClientCredentials, TokenResponse, exchange_client_credentials};

/// Safety margin subtracted from the reported token lifetime.
pub const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Timeout applied to token requests.
const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// TokenProvider Trait
// ============================================================================

/// Supplies bearer credentials on demand.
pub trait TokenProvider: Send + Sync + fmt::Debug {
    /// Get a valid access token, acquiring a new one if the cached one expired.
    fn access_token(&self) -> Result<String>;

    /// Drop any cached token so the next call re-authenticates.
    fn invalidate(&self);
}

/// Shared token provider used by every gateway call in one run.
pub type SharedTokenProvider = Arc<dyn TokenProvider>;

// ============================================================================
// CredentialCache
// ============================================================================

/// A bearer token with its (margin-adjusted) expiry instant.
#[derive(Clone)]
pub struct CachedToken {
    pub access_token: String,
    pub expires_at: Instant,
}

impl CachedToken {
    /// Build a cache entry from a token response received at `now`.
    pub fn from_response(response: &TokenResponse, now: Instant) -> Self {
        let lifetime = Duration::from_secs(response.expires_in).saturating_sub(REFRESH_MARGIN);
        Self {
            access_token: response.access_token.clone(),
            expires_at: now + lifetime,
        }
    }

    /// Whether the token must be refreshed at `now`.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

impl fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedToken")
            .field("access_token", &"********")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// In-memory holder for the current bearer token.
#[derive(Debug, Default)]
pub struct CredentialCache {
    slot: Mutex<Option<CachedToken>>,
}

impl CredentialCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached token, if one exists and has not expired at `now`.
    pub fn get_valid(&self, now: Instant) -> Option<String> {
        self.slot
            .lock()
            .as_ref()
            .filter(|t| !t.is_expired_at(now))
            .map(|t| t.access_token.clone())
    }

    /// True when there is no token or the cached one has expired at `now`.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.get_valid(now).is_none()
    }

    pub fn store(&self, token: CachedToken) {
        *self.slot.lock() = Some(token);
    }

    pub fn clear(&self) {
        *self.slot.lock() = None;
    }
}

// ============================================================================
// ClientCredentialsProvider
// ============================================================================

/// Token provider backed by the client-credentials grant.
#[derive(Debug)]
pub struct ClientCredentialsProvider {
    credentials: ClientCredentials,
    http: reqwest::blocking::Client,
    cache: CredentialCache,
}

impl ClientCredentialsProvider {
    /// Create a provider with its own HTTP client.
    pub fn new(credentials: ClientCredentials) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(TOKEN_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| OAuthError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_http(credentials, http))
    }

    /// Create a provider that reuses an existing HTTP client.
    pub fn with_http(credentials: ClientCredentials, http: reqwest::blocking::Client) -> Self {
        Self {
            credentials,
            http,
            cache: CredentialCache::new(),
        }
    }

    pub fn credentials(&self) -> &ClientCredentials {
        &self.credentials
    }

    pub fn cache(&self) -> &CredentialCache {
        &self.cache
    }
}

impl TokenProvider for ClientCredentialsProvider {
    fn access_token(&self) -> Result<String> {
        let now = Instant::now();
        if let Some(token) = self.cache.get_valid(now) {
            return Ok(token);
        }

        tracing::debug!(url = %self.credentials.token_url(), "Requesting bearer token");
        let response = exchange_client_credentials(&self.http, &self.credentials)?;
        let cached = CachedToken::from_response(&response, now);
        let token = cached.access_token.clone();
        self.cache.store(cached);
        tracing::info!(expires_in = response.expires_in, "Bearer token acquired");
        Ok(token)
    }

    fn invalidate(&self) {
        self.cache.clear();
    }
}

// ============================================================================
// StaticTokenProvider (for testing)
// ============================================================================

/// Provider that always returns the same token.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl TokenProvider for StaticTokenProvider {
    fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }

    fn invalidate(&self) {}
}
