//! Credential Module
//!
//! Supplies bearer tokens for the storage backend.
//!
//! Tokens are fetched on demand and never cached beyond their declared
//! lifetime. Two providers ship with the server:
//! - `RefreshTokenProvider`: OAuth2 refresh-token grant
//! - `StaticTokenProvider`: fixed token for local development

mod provider;
mod types;

pub use provider::{CredentialProvider, RefreshTokenProvider, StaticTokenProvider};
pub use types::{AccessToken, CredentialError};

use std::sync::Arc;

use crate::config::CredentialConfig;

/// Build the provider selected by configuration
pub fn from_config(config: &CredentialConfig) -> Result<Arc<dyn CredentialProvider>, CredentialError> {
    let provider: Arc<dyn CredentialProvider> = match config {
        CredentialConfig::RefreshToken {
            client_id,
            client_secret,
            refresh_token,
            token_url,
            timeout,
        } => Arc::new(RefreshTokenProvider::new(
            token_url,
            client_id,
            client_secret,
            refresh_token,
            *timeout,
        )?),
        CredentialConfig::Static { access_token } => {
            Arc::new(StaticTokenProvider::new(access_token))
        }
    };
    Ok(provider)
}
