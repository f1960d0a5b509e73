// src/error.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type PilotResult<T> = Result<T, PilotError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthErrorKind {
    Network,
    Auth,
    Token,
    User,
}

/// Session or identity failure. Persisted in the auth-error slot, so it keeps
/// the `{type, message}` shape on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct AuthError {
    #[serde(rename = "type")]
    pub kind: AuthErrorKind,
    pub message: String,
}

impl AuthError {
    pub fn new(kind: AuthErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(AuthErrorKind::Network, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(AuthErrorKind::Auth, message)
    }

    pub fn token(message: impl Into<String>) -> Self {
        Self::new(AuthErrorKind::Token, message)
    }

    pub fn session_expired() -> Self {
        Self::token("Session expired. Please log in again.")
    }
}

#[derive(Debug, Error)]
pub enum PilotError {
    #[error("Network error: {0}")]
    Network(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("GitHub API rate limit exceeded. Please wait a while or log in to raise the limit.")]
    RateLimited,

    #[error("{0}")]
    AnalysisFailed(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl PilotError {
    pub fn is_network(&self) -> bool {
        matches!(self, PilotError::Network(_))
    }
}

impl From<reqwest::Error> for PilotError {
    fn from(e: reqwest::Error) -> Self {
        PilotError::Network(e.to_string())
    }
}

impl From<sqlx::Error> for PilotError {
    fn from(e: sqlx::Error) -> Self {
        PilotError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for PilotError {
    fn from(e: serde_json::Error) -> Self {
        PilotError::Storage(format!("Malformed stored value: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_serializes_with_type_tag() {
        let err = AuthError::auth("Invalid OAuth state parameter");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "auth");
        assert_eq!(json["message"], "Invalid OAuth state parameter");

        let back: AuthError = serde_json::from_value(json).unwrap();
        assert_eq!(back, err);
    }

    #[test]
    fn test_auth_error_display_is_message() {
        let err: PilotError = AuthError::session_expired().into();
        assert_eq!(err.to_string(), "Session expired. Please log in again.");
    }
}
