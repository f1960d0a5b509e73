// src/auth/callback.rs
use crate::environment::GithubConfig;
use crate::error::{PilotError, PilotResult};
use url::Url;

const OAUTH_PARAMS: [&str; 4] = ["code", "state", "error", "error_description"];

/// OAuth parameters GitHub appends to the redirect target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    pub fn from_url(url: &Url) -> Self {
        let mut params = Self::default();
        for (key, value) in url.query_pairs() {
            let value = Some(value.into_owned()).filter(|v| !v.is_empty());
            match key.as_ref() {
                "code" => params.code = value,
                "state" => params.state = value,
                "error" => params.error = value,
                "error_description" => params.error_description = value,
                _ => {}
            }
        }
        params
    }

    /// True when this page load is the provider redirecting back.
    pub fn is_callback(&self) -> bool {
        self.code.is_some() || self.error.is_some()
    }
}

/// Remove OAuth parameters, keeping any others. Already-clean URLs are
/// returned unchanged.
pub fn strip_oauth_params(url: &Url) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !OAUTH_PARAMS.contains(&key.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut clean = url.clone();
    if kept.is_empty() {
        clean.set_query(None);
    } else if kept.len() != url.query_pairs().count() {
        clean.query_pairs_mut().clear().extend_pairs(kept);
    }
    clean
}

pub fn authorize_url(config: &GithubConfig, state: &str) -> PilotResult<Url> {
    let scope = config.scopes.join(" ");
    Url::parse_with_params(
        &config.authorize_url,
        &[
            ("client_id", config.client_id.as_str()),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("scope", scope.as_str()),
            ("state", state),
        ],
    )
    .map_err(|e| PilotError::Configuration(format!("Invalid authorize URL: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn github_config() -> GithubConfig {
        GithubConfig {
            client_id: "client-123".to_string(),
            redirect_uri: "http://localhost:5173/".to_string(),
            scopes: vec!["read:user".to_string(), "public_repo".to_string()],
            authorize_url: "https://github.com/login/oauth/authorize".to_string(),
            access_token_url: "https://github.com/login/oauth/access_token".to_string(),
            api_base: "https://api.github.com".to_string(),
            repository_page_limit: 20,
        }
    }

    #[test]
    fn test_parse_callback_params() {
        let url = Url::parse("http://localhost:5173/?code=abc&state=xyz&tab=1").unwrap();
        let params = CallbackParams::from_url(&url);
        assert_eq!(params.code.as_deref(), Some("abc"));
        assert_eq!(params.state.as_deref(), Some("xyz"));
        assert!(params.is_callback());

        let denied = Url::parse(
            "http://localhost:5173/?error=access_denied&error_description=The+user+has+denied",
        )
        .unwrap();
        let params = CallbackParams::from_url(&denied);
        assert_eq!(params.error.as_deref(), Some("access_denied"));
        assert_eq!(params.error_description.as_deref(), Some("The user has denied"));
        assert!(params.is_callback());

        let plain = Url::parse("http://localhost:5173/?state=only").unwrap();
        assert!(!CallbackParams::from_url(&plain).is_callback());
    }

    #[test]
    fn test_strip_is_idempotent() {
        let url = Url::parse("http://localhost:5173/app?code=abc&state=xyz&tab=repos").unwrap();
        let clean = strip_oauth_params(&url);
        assert_eq!(clean.as_str(), "http://localhost:5173/app?tab=repos");
        assert_eq!(strip_oauth_params(&clean), clean);

        let only_oauth = Url::parse("http://localhost:5173/?code=abc&state=xyz").unwrap();
        let clean = strip_oauth_params(&only_oauth);
        assert_eq!(clean.as_str(), "http://localhost:5173/");
        assert_eq!(strip_oauth_params(&clean), clean);
    }

    #[test]
    fn test_authorize_url_carries_client_scope_and_state() {
        let url = authorize_url(&github_config(), "state-1").unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert_eq!(url.host_str(), Some("github.com"));
        assert!(pairs.contains(&("client_id".to_string(), "client-123".to_string())));
        assert!(pairs.contains(&("redirect_uri".to_string(), "http://localhost:5173/".to_string())));
        assert!(pairs.contains(&("scope".to_string(), "read:user public_repo".to_string())));
        assert!(pairs.contains(&("state".to_string(), "state-1".to_string())));
    }
}
