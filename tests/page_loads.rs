//! End-to-end flows across separate page loads that share only the durable
//! store and the URL handed over by the browser.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use portfolio_pilot::analysis::{ModelClient, UserInput};
use portfolio_pilot::auth::{AuthPhase, ExchangeError, OAuthExchanger, TokenGrant};
use portfolio_pilot::clock::ManualClock;
use portfolio_pilot::environment::EnvironmentConfig;
use portfolio_pilot::github::{Profile, RepositoryOwner, RepositoryProvider, RepositorySummary};
use portfolio_pilot::storage::{keys, KeyValueStore, SqliteStore};
use portfolio_pilot::view::View;
use portfolio_pilot::{AppContext, AppParts, AuthErrorKind, PilotError, PilotResult};
use serde_json::json;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

#[derive(Default)]
struct CountingExchanger {
    calls: AtomicUsize,
}

#[async_trait]
impl OAuthExchanger for CountingExchanger {
    async fn exchange(&self, code: &str) -> Result<TokenGrant, ExchangeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(TokenGrant {
            access_token: format!("gho_{}", code),
            token_type: "bearer".to_string(),
            scope: Some("read:user".to_string()),
        })
    }
}

struct FakeGithub {
    repos: usize,
}

#[async_trait]
impl RepositoryProvider for FakeGithub {
    async fn authenticated_user(&self, token: &str) -> PilotResult<Profile> {
        if !token.starts_with("gho_") {
            return Err(PilotError::Unauthorized("Bad credentials".to_string()));
        }
        Ok(Profile {
            id: 583231,
            login: "octocat".to_string(),
            display_name: Some("The Octocat".to_string()),
            avatar_url: "https://avatars.githubusercontent.com/u/583231".to_string(),
            email: None,
        })
    }

    async fn list_repositories(&self, username: &str) -> PilotResult<Vec<RepositorySummary>> {
        Ok((0..self.repos)
            .map(|i| RepositorySummary {
                name: format!("project-{}", i),
                description: Some("A project".to_string()),
                html_url: format!("https://github.com/{}/project-{}", username, i),
                language: Some("Rust".to_string()),
                stargazers_count: i as u32,
                forks_count: 0,
                owner: RepositoryOwner {
                    login: username.to_string(),
                },
                languages: vec![],
                language_stats: Default::default(),
                topics: vec![],
                size: None,
                created_at: None,
                updated_at: None,
            })
            .collect())
    }

    async fn readme(&self, _: &str, _: &str) -> PilotResult<String> {
        Ok("# Project".to_string())
    }

    async fn file_tree(&self, _: &str, _: &str) -> PilotResult<String> {
        Ok("Cargo.toml\nsrc/lib.rs".to_string())
    }
}

#[derive(Default)]
struct RecordingModel {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl ModelClient for RecordingModel {
    async fn generate_json(
        &self,
        prompt: &str,
        _schema: serde_json::Value,
        _temperature: f32,
    ) -> PilotResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(portfolio_json().to_string())
    }
}

fn portfolio_json() -> serde_json::Value {
    let repo = |name: &str| {
        json!({
            "name": name,
            "description": "A project",
            "score": 77,
            "strengths": ["Focused"],
            "areasForImprovement": ["Tests"],
            "technologies": ["Rust"]
        })
    };
    let rec = |id: &str| {
        json!({
            "id": id,
            "priority": "Medium",
            "title": "Pin a project",
            "description": "Pin your best work.",
            "category": "Professionalism"
        })
    };

    json!({
        "overallScore": 74,
        "summary": "Consistent Rust work.",
        "scoreBreakdown": {
            "documentation": 60, "codeQuality": 78, "projectDiversity": 65,
            "commitPatterns": 70, "techStack": 82
        },
        "repositories": [repo("project-0"), repo("project-1"), repo("project-2")],
        "recommendations": [rec("a"), rec("b"), rec("c"), rec("d"), rec("e")],
        "commitAnalysis": {
            "consistency": "Steady", "messageQuality": "Good",
            "frequency": "Weekly", "summary": "Regular contributor."
        },
        "techStackAnalysis": {
            "languages": ["Rust"], "frameworks": ["Tokio"], "tools": ["Cargo"],
            "summary": "Systems focus.", "recommendations": ["Add a web project"]
        }
    })
}

fn config(storage_path: &Path) -> EnvironmentConfig {
    let yaml = format!(
        r#"
local: &local
  github:
    client_id: client-123
    redirect_uri: http://localhost:5173/
    scopes: ["read:user", "public_repo"]
    authorize_url: https://github.com/login/oauth/authorize
    access_token_url: https://github.com/login/oauth/access_token
    api_base: https://api.github.com
  token_exchange_url: http://127.0.0.1:8787/api/github-token
  gemini:
    api_base: https://generativelanguage.googleapis.com
    model: gemini-2.5-flash
  storage_path: {}
production: *local
"#,
        storage_path.display()
    );
    EnvironmentConfig::from_yaml(&yaml, "local").unwrap()
}

struct Browser {
    dir: tempfile::TempDir,
    store: Arc<SqliteStore>,
    clock: ManualClock,
    exchanger: Arc<CountingExchanger>,
    model: Arc<RecordingModel>,
}

impl Browser {
    async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::open(&dir.path().join("pilot.db")).await.unwrap());
        Self {
            dir,
            store,
            clock: ManualClock::new(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()),
            exchanger: Arc::new(CountingExchanger::default()),
            model: Arc::new(RecordingModel::default()),
        }
    }

    /// A fresh process: new services, same storage.
    fn open(&self) -> AppContext {
        AppContext::assemble(
            config(&self.dir.path().join("pilot.db")),
            AppParts {
                store: self.store.clone(),
                clock: Arc::new(self.clock.clone()),
                exchanger: self.exchanger.clone(),
                provider: Arc::new(FakeGithub { repos: 6 }),
                model: self.model.clone(),
            },
        )
    }

    async fn login(&self) -> String {
        let mut app = self.open();
        let mut home = app.home_url().unwrap();
        app.page_load(&mut home).await;
        let authorize = app.auth.login().await.unwrap();
        authorize
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }
}

fn input() -> UserInput {
    UserInput {
        username: "octocat".to_string(),
        target_role: "Backend Engineer".to_string(),
        experience_level: "Senior".to_string(),
        focus_areas: ["Code Quality".to_string()].into_iter().collect(),
    }
}

#[tokio::test]
async fn login_completes_on_the_next_page_load() {
    let browser = Browser::new().await;
    let state = browser.login().await;

    let mut app = browser.open();
    let mut location =
        Url::parse(&format!("http://localhost:5173/?code=abc&state={}", state)).unwrap();
    let snapshot = app.page_load(&mut location).await;

    assert_eq!(snapshot.phase, AuthPhase::Authenticated);
    assert_eq!(snapshot.user.unwrap().login, "octocat");
    assert_eq!(location.as_str(), "http://localhost:5173/");
    assert_eq!(app.view.view(), View::Form);
    assert_eq!(browser.exchanger.calls.load(Ordering::SeqCst), 1);
    assert_eq!(browser.store.get(keys::OAUTH_STATE).await.unwrap(), None);

    // Session expires after a day.
    browser.clock.advance(chrono::Duration::hours(25));
    let mut later = browser.open();
    let mut home = later.home_url().unwrap();
    let snapshot = later.page_load(&mut home).await;
    assert_eq!(snapshot.phase, AuthPhase::Unauthenticated);
    assert_eq!(browser.store.get(keys::SESSION).await.unwrap(), None);
}

#[tokio::test]
async fn forged_state_never_stores_a_session() {
    let browser = Browser::new().await;
    browser.login().await;

    let mut app = browser.open();
    let mut location =
        Url::parse("http://localhost:5173/?code=abc&state=attacker").unwrap();
    let snapshot = app.page_load(&mut location).await;

    assert_eq!(snapshot.error.unwrap().kind, AuthErrorKind::Auth);
    assert_eq!(browser.exchanger.calls.load(Ordering::SeqCst), 0);
    assert_eq!(browser.store.get(keys::SESSION).await.unwrap(), None);
    assert_eq!(app.view.view(), View::Landing);
}

#[tokio::test]
async fn denied_consent_skips_the_exchange() {
    let browser = Browser::new().await;
    browser.login().await;

    let mut app = browser.open();
    let mut location = Url::parse(
        "http://localhost:5173/?error=access_denied&error_description=The+user+has+denied+your+application+access.",
    )
    .unwrap();
    let snapshot = app.page_load(&mut location).await;

    assert_eq!(snapshot.phase, AuthPhase::Unauthenticated);
    assert_eq!(snapshot.error.unwrap().kind, AuthErrorKind::Auth);
    assert_eq!(browser.exchanger.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn analysis_survives_reload_until_reset() {
    let browser = Browser::new().await;
    let state = browser.login().await;
    let mut app = browser.open();
    let mut location =
        Url::parse(&format!("http://localhost:5173/?code=abc&state={}", state)).unwrap();
    app.page_load(&mut location).await;

    let view = app.analyze(input()).await;
    assert_eq!(view, View::Results);

    let prompts = browser.model.prompts.lock().unwrap().clone();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].matches("\"name\": \"project-").count(), 6);

    // Reload: cached results come straight back.
    let mut reloaded = browser.open();
    let mut home = reloaded.home_url().unwrap();
    reloaded.page_load(&mut home).await;
    assert_eq!(reloaded.view.view(), View::Results);
    assert_eq!(reloaded.view.analysis().unwrap().overall_score, 74);

    reloaded.view.reset().await.unwrap();
    assert_eq!(reloaded.view.view(), View::Form);
    assert_eq!(browser.store.get(keys::ANALYSIS).await.unwrap(), None);
}

#[tokio::test]
async fn logout_clears_session_and_cache() {
    let browser = Browser::new().await;
    let state = browser.login().await;
    let mut app = browser.open();
    let mut location =
        Url::parse(&format!("http://localhost:5173/?code=abc&state={}", state)).unwrap();
    app.page_load(&mut location).await;
    app.analyze(input()).await;

    app.logout().await.unwrap();

    assert_eq!(browser.store.get(keys::SESSION).await.unwrap(), None);
    assert_eq!(browser.store.get(keys::ANALYSIS).await.unwrap(), None);
    assert_eq!(app.view.view(), View::Landing);
}

#[tokio::test]
async fn other_tab_changes_show_up_on_the_next_load() {
    let browser = Browser::new().await;
    let state = browser.login().await;
    let mut first = browser.open();
    let mut location =
        Url::parse(&format!("http://localhost:5173/?code=abc&state={}", state)).unwrap();
    first.page_load(&mut location).await;

    let mut second = browser.open();
    let mut home = second.home_url().unwrap();
    assert_eq!(second.page_load(&mut home).await.phase, AuthPhase::Authenticated);

    second.logout().await.unwrap();
    // The first tab keeps its in-memory state until it reloads.
    assert_eq!(first.auth.snapshot().phase, AuthPhase::Authenticated);

    let mut reloaded = browser.open();
    let mut home = reloaded.home_url().unwrap();
    assert_eq!(reloaded.page_load(&mut home).await.phase, AuthPhase::Unauthenticated);
    assert_eq!(reloaded.view.view(), View::Landing);
}

#[tokio::test]
async fn concurrent_analyses_resolve_last_write_wins() {
    let browser = Browser::new().await;
    let state = browser.login().await;
    let mut first = browser.open();
    let mut location =
        Url::parse(&format!("http://localhost:5173/?code=abc&state={}", state)).unwrap();
    first.page_load(&mut location).await;
    let mut second = browser.open();
    let mut home = second.home_url().unwrap();
    second.page_load(&mut home).await;

    first.analyze(input()).await;
    let later = UserInput {
        target_role: "Data Engineer".to_string(),
        ..input()
    };
    second.analyze(later).await;

    let mut reloaded = browser.open();
    let mut home = reloaded.home_url().unwrap();
    reloaded.page_load(&mut home).await;
    assert_eq!(reloaded.view.view(), View::Results);
    assert_eq!(reloaded.view.user_input().unwrap().target_role, "Data Engineer");
}
