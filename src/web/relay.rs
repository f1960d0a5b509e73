// src/web/relay.rs
//! Server half of the code-for-token exchange. Holds the client secret so
//! the browser-side flow never sees it.

use super::types::{RelayErrorResponse, TokenResponse, UpstreamTokenResponse};
use crate::error::{PilotError, PilotResult};
use reqwest::Client;
use rocket::http::Status;
use serde_json::json;
use std::time::Duration;
use tracing::{error, info};

const USER_AGENT: &str = "PortfolioPilot/1.0";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub type RelayFailure = (Status, RelayErrorResponse);

pub struct TokenRelay {
    client: Client,
    client_id: String,
    access_token_url: String,
    client_secret: Option<String>,
}

impl TokenRelay {
    pub fn new(
        client_id: impl Into<String>,
        access_token_url: impl Into<String>,
        client_secret: Option<String>,
    ) -> PilotResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| PilotError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            client_id: client_id.into(),
            access_token_url: access_token_url.into(),
            client_secret,
        })
    }

    pub async fn exchange(&self, code: Option<&str>) -> Result<TokenResponse, RelayFailure> {
        let Some(code) = code.filter(|c| !c.is_empty()) else {
            return Err((
                Status::BadRequest,
                RelayErrorResponse::new("invalid_request", "Authorization code is required"),
            ));
        };

        let Some(secret) = self.client_secret.as_deref() else {
            error!("GITHUB_CLIENT_SECRET environment variable is not set");
            return Err((
                Status::InternalServerError,
                RelayErrorResponse::new("server_error", "Server configuration error"),
            ));
        };

        let response = self
            .client
            .post(&self.access_token_url)
            .header("Accept", "application/json")
            .json(&json!({
                "client_id": self.client_id,
                "client_secret": secret,
                "code": code,
            }))
            .send()
            .await
            .map_err(|e| {
                error!("Token exchange error: {}", e);
                internal_error()
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("GitHub token exchange failed: {}", status);
            let code = Status::from_code(status.as_u16()).unwrap_or(Status::BadGateway);
            return Err((
                code,
                RelayErrorResponse::new(
                    "token_exchange_failed",
                    format!("GitHub API returned {}", status.as_u16()),
                ),
            ));
        }

        let data: UpstreamTokenResponse = response.json().await.map_err(|e| {
            error!("Unreadable GitHub token response: {}", e);
            internal_error()
        })?;

        if let Some(oauth_error) = data.error {
            error!("GitHub OAuth error: {}", oauth_error);
            return Err((
                Status::BadRequest,
                RelayErrorResponse::new(
                    &oauth_error,
                    data.error_description
                        .unwrap_or_else(|| "GitHub OAuth error".to_string()),
                ),
            ));
        }

        let Some(access_token) = data.access_token.filter(|t| !t.is_empty()) else {
            error!("No access token in GitHub response");
            return Err((
                Status::InternalServerError,
                RelayErrorResponse::new("invalid_response", "No access token received from GitHub"),
            ));
        };

        info!("Token exchange succeeded");
        Ok(TokenResponse {
            access_token,
            token_type: data.token_type.unwrap_or_else(|| "bearer".to_string()),
            scope: data.scope,
        })
    }
}

fn internal_error() -> RelayFailure {
    (
        Status::InternalServerError,
        RelayErrorResponse::new(
            "internal_error",
            "Internal server error during token exchange",
        ),
    )
}
