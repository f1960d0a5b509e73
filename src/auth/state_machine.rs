// src/auth/state_machine.rs
//! Login lifecycle: callback handling, session restore, validation, logout.
//!
//! A login is a full redirect away from the application. The machine cannot
//! observe its completion; the next page load calls [`AuthStateMachine::initialize`]
//! with the URL the provider redirected to, and only persisted storage links
//! the two runs.

use super::callback::{authorize_url, strip_oauth_params, CallbackParams};
use super::exchanger::OAuthExchanger;
use crate::analytics::Analytics;
use crate::environment::GithubConfig;
use crate::error::{AuthError, PilotResult};
use crate::github::{Profile, RepositoryProvider};
use crate::session::{AntiForgeryStore, AuthErrorSlot, TokenStore};
use std::sync::Arc;
use tracing::{error, info, warn};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    Uninitialized,
    CheckingCallback,
    CheckingSession,
    Authenticated,
    Unauthenticated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthSnapshot {
    pub phase: AuthPhase,
    pub user: Option<Profile>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub error: Option<AuthError>,
}

pub struct AuthServices {
    pub tokens: Arc<TokenStore>,
    pub errors: AuthErrorSlot,
    pub states: AntiForgeryStore,
    pub exchanger: Arc<dyn OAuthExchanger>,
    pub provider: Arc<dyn RepositoryProvider>,
    pub analytics: Analytics,
    pub github: GithubConfig,
}

pub struct AuthStateMachine {
    services: AuthServices,
    phase: AuthPhase,
    user: Option<Profile>,
    error: Option<AuthError>,
}

impl AuthStateMachine {
    pub fn new(services: AuthServices) -> Self {
        Self {
            services,
            phase: AuthPhase::Uninitialized,
            user: None,
            error: None,
        }
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        AuthSnapshot {
            phase: self.phase,
            user: self.user.clone(),
            is_authenticated: self.user.is_some(),
            is_loading: matches!(
                self.phase,
                AuthPhase::Uninitialized | AuthPhase::CheckingCallback | AuthPhase::CheckingSession
            ),
            error: self.error.clone(),
        }
    }

    pub fn user(&self) -> Option<&Profile> {
        self.user.as_ref()
    }

    /// Resolve the page load's auth state. Runs at most once; later calls
    /// return the settled snapshot. `location` is the visible URL and has its
    /// OAuth parameters stripped when it carried a callback.
    pub async fn initialize(&mut self, location: &mut Url) -> AuthSnapshot {
        if self.phase != AuthPhase::Uninitialized {
            return self.snapshot();
        }

        let params = CallbackParams::from_url(location);
        if params.is_callback() {
            self.phase = AuthPhase::CheckingCallback;
            // Outcome is recorded on self either way.
            let _ = self.handle_callback(location).await;
        } else {
            self.phase = AuthPhase::CheckingSession;
            if let Err(e) = self.restore_session().await {
                error!("Auth initialization error: {}", e);
                self.user = None;
                self.error = Some(AuthError::network("Failed to initialize authentication"));
                self.phase = AuthPhase::Unauthenticated;
            }
        }

        self.snapshot()
    }

    /// Build the authorization redirect. The caller must hand the URL to the
    /// user agent; this run ends there.
    pub async fn login(&mut self) -> PilotResult<Url> {
        self.error = None;
        self.services.errors.clear().await?;

        let state = self.services.states.issue().await?;
        let url = authorize_url(&self.services.github, &state)?;
        info!("Redirecting to GitHub for authorization");
        Ok(url)
    }

    /// Consume the OAuth parameters on `location`. Returns the signed-in
    /// profile, `None` when the redirect carried neither code nor error, or
    /// the failure (also persisted for the next page load).
    pub async fn handle_callback(
        &mut self,
        location: &mut Url,
    ) -> Result<Option<Profile>, AuthError> {
        let params = CallbackParams::from_url(location);
        *location = strip_oauth_params(location);

        let result = self.complete_callback(params).await;
        match &result {
            Ok(Some(user)) => {
                self.user = Some(user.clone());
                self.error = None;
                self.phase = AuthPhase::Authenticated;
            }
            Ok(None) => {
                self.user = None;
                self.phase = AuthPhase::Unauthenticated;
            }
            Err(auth_error) => {
                error!("GitHub auth error: {}", auth_error);
                if let Err(e) = self.services.errors.store(auth_error).await {
                    warn!("Failed to persist auth error: {}", e);
                }
                self.user = None;
                self.error = Some(auth_error.clone());
                self.phase = AuthPhase::Unauthenticated;
            }
        }
        result
    }

    async fn complete_callback(
        &self,
        params: CallbackParams,
    ) -> Result<Option<Profile>, AuthError> {
        if let Some(error) = params.error {
            return Err(AuthError::auth(
                params
                    .error_description
                    .unwrap_or_else(|| format!("GitHub OAuth error: {}", error)),
            ));
        }

        let state_ok = self
            .services
            .states
            .matches(params.state.as_deref())
            .await
            .map_err(|e| AuthError::network(format!("Failed to read OAuth state: {}", e)))?;
        if !state_ok {
            return Err(AuthError::auth(
                "Invalid OAuth state parameter. Possible CSRF attack.",
            ));
        }

        let Some(code) = params.code else {
            return Ok(None);
        };

        let grant = self
            .services
            .exchanger
            .exchange(&code)
            .await
            .map_err(|e| AuthError::token(e.description))?;

        let user = self
            .services
            .provider
            .authenticated_user(&grant.access_token)
            .await
            .map_err(|e| AuthError::token(format!("Failed to fetch user info: {}", e)))?;

        self.services
            .tokens
            .save(&grant.access_token, &grant.token_type, user.clone())
            .await
            .map_err(|e| AuthError::token(format!("Failed to store session: {}", e)))?;

        if let Err(e) = self.services.states.clear().await {
            warn!("Failed to clear OAuth state: {}", e);
        }
        if let Err(e) = self.services.errors.clear().await {
            warn!("Failed to clear stored auth error: {}", e);
        }

        info!("GitHub auth successful for {}", user.login);
        self.services.analytics.track_signup(&user);
        Ok(Some(user))
    }

    async fn restore_session(&mut self) -> PilotResult<()> {
        if let Some(stored) = self.services.errors.load().await {
            self.error = Some(stored);
        }

        let Some(session) = self.services.tokens.load().await? else {
            self.phase = AuthPhase::Unauthenticated;
            return Ok(());
        };

        match self
            .services
            .provider
            .authenticated_user(&session.token)
            .await
        {
            Ok(_) => {
                info!("Restored session for {}", session.user.login);
                self.user = Some(session.user);
                self.error = None;
                self.phase = AuthPhase::Authenticated;
                if let Err(e) = self.services.errors.clear().await {
                    warn!("Failed to clear stored auth error: {}", e);
                }
                Ok(())
            }
            // The token was never judged; keep it for the next load.
            Err(e) if e.is_network() => Err(e),
            Err(e) => {
                info!("Stored session rejected by GitHub: {}", e);
                self.services.tokens.clear().await?;
                self.user = None;
                self.error = Some(AuthError::session_expired());
                self.phase = AuthPhase::Unauthenticated;
                Ok(())
            }
        }
    }

    pub async fn logout(&mut self) -> PilotResult<()> {
        self.services.tokens.clear().await?;
        self.services.errors.clear().await?;
        self.services.states.clear().await?;

        self.user = None;
        self.error = None;
        self.phase = AuthPhase::Unauthenticated;
        info!("Logged out");
        Ok(())
    }

    pub async fn clear_error(&mut self) {
        self.error = None;
        if let Err(e) = self.services.errors.clear().await {
            warn!("Failed to clear stored auth error: {}", e);
        }
    }

    /// Re-check the current token against GitHub. Any failure ends the
    /// session.
    pub async fn validate_session(&mut self) -> bool {
        if self.user.is_none() {
            return false;
        }

        let valid = match self.services.tokens.token().await {
            Some(token) => match self.services.provider.authenticated_user(&token).await {
                Ok(_) => true,
                Err(e) => {
                    warn!("Session validation failed: {}", e);
                    false
                }
            },
            None => false,
        };

        if !valid {
            if let Err(e) = self.services.tokens.clear().await {
                warn!("Failed to clear session: {}", e);
            }
            self.user = None;
            self.error = Some(AuthError::session_expired());
            self.phase = AuthPhase::Unauthenticated;
        }
        valid
    }
}
