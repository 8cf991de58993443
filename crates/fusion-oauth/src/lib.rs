//! OAuth2 client-credentials authentication for the Falcon workflow APIs.
//!
//! The workflow catalog, import and execution endpoints all authenticate with
//! a short-lived bearer token obtained by exchanging a client id/secret pair.
//!
//! # Components
//!
//! - [`oauth`]: credential pair and the blocking token exchange
//! - [`token_manager`]: [`TokenProvider`] trait, in-memory [`CredentialCache`]
//!   with an explicit expiry check, and the provider implementations

pub mod error;
pub mod oauth;
pub mod token_manager;

pub use error::{OAuthError, Result};
pub use oauth::{ClientCredentials, TokenResponse, exchange_client_credentials, mask_secret};
pub use token_manager::{
    CachedToken, ClientCredentialsProvider, CredentialCache, SharedTokenProvider,
    StaticTokenProvider, TokenProvider,
};
