// src/environment.rs
use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub const GITHUB_CLIENT_SECRET_VAR: &str = "GITHUB_CLIENT_SECRET";
pub const GEMINI_API_KEY_VAR: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    pub client_id: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub authorize_url: String,
    pub access_token_url: String,
    pub api_base: String,
    #[serde(default = "default_page_limit")]
    pub repository_page_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    pub api_base: String,
    pub model: String,
    #[serde(default = "default_model_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub github: GithubConfig,
    pub token_exchange_url: String,
    pub gemini: GeminiConfig,
    pub storage_path: PathBuf,
    #[serde(default = "default_session_ttl")]
    pub session_ttl_hours: i64,
    #[serde(default = "default_state_ttl")]
    pub oauth_state_ttl_minutes: i64,
    #[serde(default = "default_relay_port")]
    pub relay_port: u16,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    local: EnvironmentConfig,
    production: EnvironmentConfig,
}

fn default_page_limit() -> usize {
    20
}

fn default_model_timeout() -> u64 {
    120
}

fn default_session_ttl() -> i64 {
    24
}

fn default_state_ttl() -> i64 {
    10
}

fn default_relay_port() -> u16 {
    8787
}

impl EnvironmentConfig {
    /// Load configuration for the current environment from `path`
    pub fn load(path: &Path) -> Result<Self> {
        let environment = Self::get_environment();
        info!("Loading configuration for environment: {}", environment);

        Self::load_from_file(path, &environment)
    }

    fn get_environment() -> String {
        std::env::var("PORTFOLIO_PILOT_ENV")
            .or_else(|_| std::env::var("ENVIRONMENT"))
            .unwrap_or_else(|_| "local".to_string())
    }

    fn load_from_file(path: &Path, environment: &str) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!(
                "{} not found. Portfolio Pilot cannot start without configuration.",
                path.display()
            );
        }

        let config_content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_yaml(&config_content, environment)
    }

    pub fn from_yaml(content: &str, environment: &str) -> Result<Self> {
        let config_file: ConfigFile =
            serde_yaml::from_str(content).context("Failed to parse configuration")?;

        let env_config = match environment {
            "production" => config_file.production,
            _ => config_file.local,
        };

        Ok(Self {
            storage_path: Self::resolve_path(&env_config.storage_path)?,
            ..env_config
        })
    }

    fn resolve_path(path: &PathBuf) -> Result<PathBuf> {
        if path.is_absolute() {
            Ok(path.clone())
        } else {
            let current_dir = std::env::current_dir().context("Failed to get current directory")?;
            Ok(current_dir.join(path))
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::hours(self.session_ttl_hours)
    }

    pub fn oauth_state_ttl(&self) -> Duration {
        Duration::minutes(self.oauth_state_ttl_minutes)
    }

    /// Ensure the directory holding the storage database exists
    pub async fn ensure_directories(&self) -> Result<()> {
        if let Some(parent) = self.storage_path.parent() {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create storage directory: {}", parent.display())
            })?;
        }
        Ok(())
    }
}

pub fn github_client_secret() -> Option<String> {
    std::env::var(GITHUB_CLIENT_SECRET_VAR)
        .ok()
        .filter(|s| !s.trim().is_empty())
}

pub fn gemini_api_key() -> Option<String> {
    std::env::var(GEMINI_API_KEY_VAR)
        .ok()
        .filter(|s| !s.trim().is_empty())
}
