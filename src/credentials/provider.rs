//! Credential Providers
//!
//! Defines the provider trait and the built-in token sources.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tokio::sync::Mutex;

use super::types::{AccessToken, CredentialError};

/// Headroom kept before a cached token's expiry
const EXPIRY_SKEW_SECS: i64 = 60;

/// Bearer token source for the storage backend
///
/// Implementations may block on network I/O. A returned token must be
/// valid for at least the next backend call; no caching is allowed past
/// the token's own declared lifetime.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn access_token(&self) -> Result<AccessToken, CredentialError>;
}

/// Fixed token, for development against a short-lived token
pub struct StaticTokenProvider {
    token: AccessToken,
}

impl StaticTokenProvider {
    pub fn new(token: &str) -> Self {
        Self {
            token: AccessToken::new(token, None),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<AccessToken, CredentialError> {
        Ok(self.token.clone())
    }
}

/// OAuth2 refresh-token grant
pub struct RefreshTokenProvider {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    timeout: Duration,
    cached: Mutex<Option<AccessToken>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl RefreshTokenProvider {
    /// Create a provider whose refresh calls give up after `timeout`
    pub fn new(
        token_url: &str,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
        timeout: Duration,
    ) -> Result<Self, CredentialError> {
        // The cache lock is held across a refresh, so it must not hang
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CredentialError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            token_url: token_url.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            refresh_token: refresh_token.to_string(),
            timeout,
            cached: Mutex::new(None),
        })
    }

    fn map_transport(&self, err: reqwest::Error) -> CredentialError {
        if err.is_timeout() {
            CredentialError::Timeout {
                after_secs: self.timeout.as_secs(),
            }
        } else {
            CredentialError::Transport(err.without_url().to_string())
        }
    }

    async fn refresh(&self) -> Result<AccessToken, CredentialError> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", self.refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialError::Rejected { status, body });
        }

        let parsed: TokenResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.map_transport(e)
            } else {
                CredentialError::Malformed(e.to_string())
            }
        })?;

        if parsed.access_token.is_empty() {
            return Err(CredentialError::Malformed("empty access_token".to_string()));
        }

        let expires_at = parsed
            .expires_in
            .map(|secs| Utc::now() + chrono::Duration::seconds(secs));

        tracing::debug!(expires_at = ?expires_at, "Refreshed backend access token");

        Ok(AccessToken::new(parsed.access_token, expires_at))
    }
}

#[async_trait]
impl CredentialProvider for RefreshTokenProvider {
    async fn access_token(&self) -> Result<AccessToken, CredentialError> {
        // Held across the refresh so concurrent callers share one request
        let mut cached = self.cached.lock().await;

        let skew = chrono::Duration::seconds(EXPIRY_SKEW_SECS);
        if let Some(token) = cached.as_ref() {
            // Tokens without a declared lifetime are never reused
            if token.expires_at().is_some() && token.is_fresh_at(Utc::now(), skew) {
                return Ok(token.clone());
            }
        }

        let token = self.refresh().await?;
        *cached = Some(token.clone());
        Ok(token)
    }
}
