// src/app.rs
//! Composition root for one page load. Everything external (storage, clock,
//! relay, GitHub, model) comes in through [`AppParts`] so tests can swap in
//! fakes.

use crate::analysis::{AnalysisCache, AnalysisRequestor, GeminiClient, ModelClient, UserInput};
use crate::analytics::Analytics;
use crate::auth::{AuthServices, AuthSnapshot, AuthStateMachine, OAuthExchanger, RelayExchanger};
use crate::clock::{Clock, SystemClock};
use crate::environment::{gemini_api_key, EnvironmentConfig};
use crate::error::PilotResult;
use crate::github::{GithubClient, RepositoryProvider};
use crate::session::{AntiForgeryStore, AuthErrorSlot, TokenStore};
use crate::storage::{KeyValueStore, SqliteStore};
use crate::view::{View, ViewController, ViewServices};
use anyhow::{Context, Result};
use std::sync::Arc;
use url::Url;

pub struct AppParts {
    pub store: Arc<dyn KeyValueStore>,
    pub clock: Arc<dyn Clock>,
    pub exchanger: Arc<dyn OAuthExchanger>,
    pub provider: Arc<dyn RepositoryProvider>,
    pub model: Arc<dyn ModelClient>,
}

pub struct AppContext {
    pub config: EnvironmentConfig,
    pub store: Arc<dyn KeyValueStore>,
    pub cache: Arc<AnalysisCache>,
    pub auth: AuthStateMachine,
    pub view: ViewController,
}

impl AppContext {
    /// Wire the production services described by `config`.
    pub async fn from_config(config: EnvironmentConfig) -> Result<Self> {
        config.ensure_directories().await?;

        let store: Arc<dyn KeyValueStore> = Arc::new(
            SqliteStore::open(&config.storage_path)
                .await
                .context("Failed to open storage")?,
        );
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let tokens = Arc::new(TokenStore::new(
            store.clone(),
            clock.clone(),
            config.session_ttl(),
        ));
        let provider = GithubClient::new(
            &config.github.api_base,
            config.github.repository_page_limit,
        )?
        .with_token_store(tokens);
        let exchanger = RelayExchanger::new(&config.token_exchange_url)?;
        let model = GeminiClient::new(&config.gemini, gemini_api_key())?;

        Ok(Self::assemble(
            config,
            AppParts {
                store,
                clock,
                exchanger: Arc::new(exchanger),
                provider: Arc::new(provider),
                model: Arc::new(model),
            },
        ))
    }

    pub fn assemble(config: EnvironmentConfig, parts: AppParts) -> Self {
        let AppParts {
            store,
            clock,
            exchanger,
            provider,
            model,
        } = parts;

        let tokens = Arc::new(TokenStore::new(
            store.clone(),
            clock.clone(),
            config.session_ttl(),
        ));

        let auth = AuthStateMachine::new(AuthServices {
            tokens,
            errors: AuthErrorSlot::new(store.clone()),
            states: AntiForgeryStore::new(store.clone(), clock.clone(), config.oauth_state_ttl()),
            exchanger,
            provider: provider.clone(),
            analytics: Analytics,
            github: config.github.clone(),
        });

        let cache = Arc::new(AnalysisCache::new(store.clone(), clock.clone()));
        let view = ViewController::new(ViewServices {
            provider,
            requestor: AnalysisRequestor::new(model),
            cache: AnalysisCache::new(store.clone(), clock),
            analytics: Analytics,
        });

        Self {
            config,
            store,
            cache,
            auth,
            view,
        }
    }

    /// Settle auth for this page load, then let the view leave the landing
    /// page if it can.
    pub async fn page_load(&mut self, location: &mut Url) -> AuthSnapshot {
        let snapshot = self.auth.initialize(location).await;
        self.view.on_auth_ready(&snapshot).await;
        snapshot
    }

    /// Location of a page load that carries no callback.
    pub fn home_url(&self) -> PilotResult<Url> {
        Url::parse(&self.config.github.redirect_uri).map_err(|e| {
            crate::error::PilotError::Configuration(format!("Invalid redirect_uri: {}", e))
        })
    }

    pub async fn analyze(&mut self, input: UserInput) -> View {
        let viewer = self.auth.user().map(|u| u.login.clone());
        self.view.get_started();
        self.view.submit(input, viewer.as_deref()).await
    }

    pub async fn logout(&mut self) -> PilotResult<()> {
        self.auth.logout().await?;
        self.view.on_logout().await
    }
}
