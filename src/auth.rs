//! Access-token acquisition for directory calls.
//!
//! The poller resolves a token per tenant before each dispatch. The trait
//! seam keeps the engine testable without a live token endpoint; the HTTP
//! implementation speaks the client-credentials flow.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config::AuthConfig;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token request failed: {0}")]
    Transport(String),
    #[error("token endpoint returned {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("no credentials configured for tenant {0}")]
    NotConfigured(String),
}

/// A bearer token scoped to one tenant. The secret is deliberately not
/// printable through `Debug`.
#[derive(Clone)]
pub struct AccessToken {
    secret: String,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken").field("secret", &"***").finish()
    }
}

#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Resolve a valid access token for a tenant.
    async fn access_token(&self, tenant_id: &str) -> Result<AccessToken, AuthError>;
}

// ---------------------------------------------------------------------------
// HTTP client-credentials provider
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Client-credentials token provider against the identity platform's token
/// endpoint. `{tenant}` in the configured URL is replaced per request.
pub struct HttpTokenProvider {
    client: reqwest::Client,
    config: AuthConfig,
}

impl HttpTokenProvider {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            config,
        }
    }
}

#[async_trait]
impl TokenProvider for HttpTokenProvider {
    async fn access_token(&self, tenant_id: &str) -> Result<AccessToken, AuthError> {
        if self.config.client_id.is_empty() {
            return Err(AuthError::NotConfigured(tenant_id.to_string()));
        }
        let url = self.config.token_url.replace("{tenant}", tenant_id);
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("scope", self.config.scope.as_str()),
        ];

        let resp = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: TokenResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        Ok(AccessToken::new(body.access_token))
    }
}

// ---------------------------------------------------------------------------
// Static provider (tests, single-tenant deployments)
// ---------------------------------------------------------------------------

/// Fixed per-tenant tokens; tenants without an entry fail token resolution.
#[derive(Default)]
pub struct StaticTokenProvider {
    tokens: HashMap<String, String>,
}

impl StaticTokenProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, tenant_id: impl Into<String>, token: impl Into<String>) -> Self {
        self.tokens.insert(tenant_id.into(), token.into());
        self
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self, tenant_id: &str) -> Result<AccessToken, AuthError> {
        self.tokens
            .get(tenant_id)
            .map(AccessToken::new)
            .ok_or_else(|| AuthError::NotConfigured(tenant_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_provider_resolves_known_tenant() {
        let provider = StaticTokenProvider::new().with_token("t1", "tok-1");
        let token = provider.access_token("t1").await.unwrap();
        assert_eq!(token.secret(), "tok-1");
        assert!(provider.access_token("t2").await.is_err());
    }

    #[test]
    fn test_token_debug_redacts_secret() {
        let token = AccessToken::new("super-secret");
        let printed = format!("{token:?}");
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("***"));
    }
}
