// src/github/client.rs
//! GitHub REST client: repository listing, README, file tree, current user.

use super::types::{
    Profile, ReadmePayload, RepositoryDetails, RepositorySummary, TreePayload,
};
use crate::error::{PilotError, PilotResult};
use crate::session::TokenStore;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::future::join_all;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

pub const NO_README: &str = "No README file found.";
pub const README_DECODE_FAILED: &str = "README could not be decoded.";
pub const FILE_TREE_UNAVAILABLE: &str =
    "Could not fetch file tree. The repository might be empty or inaccessible.";
pub const FILE_TREE_TOO_LARGE: &str = "File tree is too large to display.";

const USER_AGENT: &str = "PortfolioPilot/1.0";
const ACCEPT: &str = "application/vnd.github.v3+json";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_USERNAME_LEN: usize = 39;

/// Trim `raw` and check it against GitHub's login charset (ASCII
/// alphanumerics and `-`, not starting with `-`, at most 39 characters).
pub fn validate_username(raw: &str) -> PilotResult<String> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(PilotError::NotFound("Please enter a GitHub username.".to_string()));
    }
    let valid = username.len() <= MAX_USERNAME_LEN
        && !username.starts_with('-')
        && username.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if !valid {
        return Err(PilotError::NotFound(format!(
            "GitHub user \"{}\" not found.",
            username
        )));
    }
    Ok(username.to_string())
}

#[async_trait]
pub trait RepositoryProvider: Send + Sync {
    /// Profile of the user owning `token`. Fails with `Unauthorized` when
    /// GitHub rejects the token.
    async fn authenticated_user(&self, token: &str) -> PilotResult<Profile>;

    /// Most recently updated repositories owned by `username`, bounded.
    async fn list_repositories(&self, username: &str) -> PilotResult<Vec<RepositorySummary>>;

    /// Decoded README text, or [`NO_README`] when there is none.
    async fn readme(&self, owner: &str, repo: &str) -> PilotResult<String>;

    /// Newline-joined file paths, or a descriptive sentinel when the tree is
    /// absent, inaccessible or truncated.
    async fn file_tree(&self, owner: &str, repo: &str) -> PilotResult<String>;
}

pub struct GithubClient {
    client: Client,
    api_base: Url,
    page_limit: usize,
    tokens: Option<Arc<TokenStore>>,
}

impl GithubClient {
    pub fn new(api_base: impl Into<String>, page_limit: usize) -> PilotResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| PilotError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        let api_base = api_base.into();
        let api_base = Url::parse(&api_base)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| PilotError::Configuration(format!("Invalid GitHub API base: {}", api_base)))?;

        Ok(Self {
            client,
            api_base,
            page_limit,
            tokens: None,
        })
    }

    /// Authenticate requests with the stored session token when one exists.
    pub fn with_token_store(mut self, tokens: Arc<TokenStore>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// API URL for `segments`, each percent-encoded as a single path segment.
    fn endpoint(&self, segments: &[&str]) -> PilotResult<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| PilotError::Configuration("GitHub API base cannot take a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn request(&self, url: Url) -> RequestBuilder {
        let builder = self.client.get(url).header("Accept", ACCEPT);
        match &self.tokens {
            Some(tokens) => match tokens.token().await {
                Some(token) => builder.bearer_auth(token),
                None => builder,
            },
            None => builder,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> PilotResult<T> {
        let path = url.path().to_string();
        let response = self.request(url).await.send().await?;
        let response = check_status(response, &path)?;
        Ok(response.json::<T>().await?)
    }

    async fn enrich(&self, repo: RepositorySummary) -> RepositorySummary {
        let owner = repo.owner.login.clone();
        let name = repo.name.clone();

        let (languages, details) = tokio::join!(
            async {
                let url = self.endpoint(&["repos", &owner, &name, "languages"])?;
                self.get_json::<BTreeMap<String, u64>>(url).await
            },
            async {
                let url = self.endpoint(&["repos", &owner, &name])?;
                self.get_json::<RepositoryDetails>(url).await
            },
        );

        let mut repo = repo;
        match languages {
            Ok(stats) => repo = repo.with_languages(stats),
            Err(e) => debug!("Language breakdown unavailable for {}/{}: {}", owner, name, e),
        }
        match details {
            Ok(details) => repo = repo.with_topics(details.topics),
            Err(e) => debug!("Topics unavailable for {}/{}: {}", owner, name, e),
        }
        repo
    }
}

fn is_rate_limited(response: &Response) -> bool {
    if response.status() == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    if response.status() != StatusCode::FORBIDDEN {
        return false;
    }
    let headers = response.headers();
    // Secondary limits answer 403 with `retry-after` instead.
    headers.contains_key("retry-after")
        || headers
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim() == "0")
            .unwrap_or(false)
}

fn check_status(response: Response, path: &str) -> PilotResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if is_rate_limited(&response) {
        warn!("GitHub rate limit hit on {}", path);
        return Err(PilotError::RateLimited);
    }
    match status {
        StatusCode::NOT_FOUND => Err(PilotError::NotFound(format!("{} was not found on GitHub", path))),
        StatusCode::UNAUTHORIZED => Err(PilotError::Unauthorized(format!(
            "GitHub rejected the credentials ({})",
            status
        ))),
        _ => Err(PilotError::Network(format!(
            "GitHub returned {} for {}",
            status, path
        ))),
    }
}

/// GitHub wraps base64 content at 60 columns.
fn decode_readme(payload: &ReadmePayload) -> Option<String> {
    if let Some(encoding) = payload.encoding.as_deref() {
        if encoding != "base64" {
            return Some(payload.content.clone());
        }
    }
    let compact: String = payload
        .content
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    STANDARD
        .decode(compact.as_bytes())
        .ok()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

#[async_trait]
impl RepositoryProvider for GithubClient {
    async fn authenticated_user(&self, token: &str) -> PilotResult<Profile> {
        let response = self
            .client
            .get(self.endpoint(&["user"])?)
            .header("Accept", ACCEPT)
            .bearer_auth(token)
            .send()
            .await?;

        let response = match check_status(response, "/user") {
            Ok(response) => response,
            // A token GitHub no longer knows reads as a 401 or 403 here.
            Err(PilotError::NotFound(_)) => {
                return Err(PilotError::Unauthorized("GitHub user endpoint not found".to_string()))
            }
            Err(e) => return Err(e),
        };

        let profile: Profile = response.json().await?;
        debug!("Resolved GitHub user {}", profile.login);
        Ok(profile)
    }

    async fn list_repositories(&self, username: &str) -> PilotResult<Vec<RepositorySummary>> {
        let username = validate_username(username)?;
        let username = username.as_str();
        let mut url = self.endpoint(&["users", username, "repos"])?;
        url.query_pairs_mut()
            .append_pair("type", "owner")
            .append_pair("sort", "updated")
            .append_pair("per_page", "100");
        info!("Fetching repositories for {}", username);

        let repos: Vec<RepositorySummary> = match self.get_json(url).await {
            Ok(repos) => repos,
            Err(PilotError::NotFound(_)) => {
                return Err(PilotError::NotFound(format!(
                    "GitHub user \"{}\" not found.",
                    username
                )))
            }
            Err(e) => {
                error!("GitHub API error listing repositories for {}: {}", username, e);
                return Err(e);
            }
        };

        let page: Vec<RepositorySummary> = repos.into_iter().take(self.page_limit).collect();
        let enriched = join_all(page.into_iter().map(|repo| self.enrich(repo))).await;

        info!("Fetched {} repositories for {}", enriched.len(), username);
        Ok(enriched)
    }

    async fn readme(&self, owner: &str, repo: &str) -> PilotResult<String> {
        let url = self.endpoint(&["repos", owner, repo, "readme"])?;
        let response = self.request(url).await.send().await?;

        if !response.status().is_success() {
            debug!("No README for {}/{} ({})", owner, repo, response.status());
            return Ok(NO_README.to_string());
        }

        let payload: ReadmePayload = match response.json().await {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Malformed README payload for {}/{}: {}", owner, repo, e);
                return Ok(README_DECODE_FAILED.to_string());
            }
        };

        Ok(decode_readme(&payload).unwrap_or_else(|| README_DECODE_FAILED.to_string()))
    }

    async fn file_tree(&self, owner: &str, repo: &str) -> PilotResult<String> {
        let mut url = self.endpoint(&["repos", owner, repo, "git", "trees", "HEAD"])?;
        url.query_pairs_mut().append_pair("recursive", "1");
        let response = self.request(url).await.send().await?;

        if !response.status().is_success() {
            debug!("No file tree for {}/{} ({})", owner, repo, response.status());
            return Ok(FILE_TREE_UNAVAILABLE.to_string());
        }

        let payload: TreePayload = match response.json().await {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Malformed tree payload for {}/{}: {}", owner, repo, e);
                return Ok(FILE_TREE_UNAVAILABLE.to_string());
            }
        };

        if payload.truncated {
            return Ok(FILE_TREE_TOO_LARGE.to_string());
        }

        Ok(payload
            .tree
            .into_iter()
            .map(|entry| entry.path)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
