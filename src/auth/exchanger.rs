// src/auth/exchanger.rs
//! Client side of the token-exchange relay.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub token_type: String,
    pub scope: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{description} ({code})")]
pub struct ExchangeError {
    pub code: String,
    pub description: String,
}

impl ExchangeError {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
        }
    }
}

/// Trades an authorization code for a bearer token. Failures are final: no
/// retry, no fallback to a cached token.
#[async_trait]
pub trait OAuthExchanger: Send + Sync {
    async fn exchange(&self, code: &str) -> Result<TokenGrant, ExchangeError>;
}

#[derive(Serialize)]
struct ExchangeRequest<'a> {
    code: &'a str,
}

#[derive(Debug, Deserialize)]
struct ExchangeResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Posts `{code}` to the relay endpoint.
pub struct RelayExchanger {
    client: Client,
    endpoint: String,
}

impl RelayExchanger {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ExchangeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ExchangeError::new("client_error", e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl OAuthExchanger for RelayExchanger {
    async fn exchange(&self, code: &str) -> Result<TokenGrant, ExchangeError> {
        info!("Exchanging authorization code via {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&ExchangeRequest { code })
            .send()
            .await
            .map_err(|e| {
                error!("Token exchange request failed: {}", e);
                ExchangeError::new("network_error", format!("Token exchange failed: {}", e))
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let parsed: Option<ExchangeResponse> = serde_json::from_str(&body).ok();

        if !status.is_success() {
            error!("Token exchange failed with status {}: {}", status, body);
            return Err(match parsed.and_then(|p| p.error.map(|e| (e, p.error_description))) {
                Some((code, description)) => ExchangeError::new(
                    code.clone(),
                    description.unwrap_or(code),
                ),
                None => ExchangeError::new(
                    "token_exchange_failed",
                    format!("Token exchange failed: {}", status.as_u16()),
                ),
            });
        }

        let parsed = parsed.ok_or_else(|| {
            ExchangeError::new("invalid_response", "Token exchange returned malformed JSON")
        })?;

        if let Some(code) = parsed.error {
            let description = parsed.error_description.unwrap_or_else(|| code.clone());
            return Err(ExchangeError::new(code, description));
        }

        let access_token = parsed
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ExchangeError::new("invalid_response", "No access token received from GitHub")
            })?;

        Ok(TokenGrant {
            access_token,
            token_type: parsed.token_type.unwrap_or_else(|| "bearer".to_string()),
            scope: parsed.scope,
        })
    }
}
