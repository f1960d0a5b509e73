// src/view/controller.rs
//! Drives the `landing -> form -> loading -> results` cycle and the
//! deep-dive overlay on top of `results`.

use crate::analysis::{
    AnalysisCache, AnalysisRequestor, PortfolioAnalysis, SingleRepoAnalysis, UserInput,
};
use crate::analytics::Analytics;
use crate::auth::AuthSnapshot;
use crate::error::{PilotError, PilotResult};
use crate::github::{validate_username, RepositoryProvider, RepositorySummary};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Landing,
    Form,
    Loading,
    Results,
}

impl View {
    pub fn title(&self) -> &'static str {
        match self {
            View::Landing => "Landing",
            View::Form => "Analysis Form",
            View::Loading => "Loading",
            View::Results => "Results Dashboard",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadingProgress {
    pub percent: u8,
    pub step: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeepDive {
    pub repo: RepositorySummary,
    pub is_loading: bool,
    pub result: Option<SingleRepoAnalysis>,
}

pub struct ViewServices {
    pub provider: Arc<dyn RepositoryProvider>,
    pub requestor: AnalysisRequestor,
    pub cache: AnalysisCache,
    pub analytics: Analytics,
}

pub struct ViewController {
    services: ViewServices,
    view: View,
    user_input: Option<UserInput>,
    analysis: Option<PortfolioAnalysis>,
    repositories: Vec<RepositorySummary>,
    error: Option<String>,
    progress: watch::Sender<LoadingProgress>,
    deep_dive: Option<DeepDive>,
}

impl ViewController {
    pub fn new(services: ViewServices) -> Self {
        let (progress, _) = watch::channel(LoadingProgress::default());
        Self {
            services,
            view: View::Landing,
            user_input: None,
            analysis: None,
            repositories: Vec::new(),
            error: None,
            progress,
            deep_dive: None,
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn analysis(&self) -> Option<&PortfolioAnalysis> {
        self.analysis.as_ref()
    }

    pub fn user_input(&self) -> Option<&UserInput> {
        self.user_input.as_ref()
    }

    pub fn repositories(&self) -> &[RepositorySummary] {
        &self.repositories
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn deep_dive(&self) -> Option<&DeepDive> {
        self.deep_dive.as_ref()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<LoadingProgress> {
        self.progress.subscribe()
    }

    fn set_view(&mut self, view: View) {
        if self.view != view {
            self.services.analytics.track_page_view(view.title());
        }
        self.view = view;
    }

    fn report(&self, percent: u8, step: &str) {
        self.progress.send_replace(LoadingProgress {
            percent,
            step: step.to_string(),
        });
    }

    /// Called once auth has settled. An authenticated user leaves the landing
    /// page for the cached results, or the form when nothing is cached.
    pub async fn on_auth_ready(&mut self, auth: &AuthSnapshot) {
        if auth.is_loading || !auth.is_authenticated || self.view != View::Landing {
            return;
        }

        match self.services.cache.load().await {
            Ok(Some(record)) => {
                info!("Loaded saved analysis for {}", record.username);
                self.analysis = Some(record.analysis);
                self.user_input = Some(record.user_input);
                self.set_view(View::Results);
            }
            Ok(None) => self.set_view(View::Form),
            Err(e) => {
                warn!("Failed to read saved analysis: {}", e);
                self.set_view(View::Form);
            }
        }
    }

    pub fn get_started(&mut self) {
        if self.view == View::Landing {
            self.set_view(View::Form);
        }
    }

    /// Run the repository fetch then the model call. Failures land back on the
    /// form with a message; a second submit while loading is ignored.
    pub async fn submit(&mut self, input: UserInput, viewer: Option<&str>) -> View {
        if self.view == View::Loading {
            warn!("Analysis already in progress, ignoring submit");
            return self.view;
        }

        let input = match validate_username(&input.username) {
            Ok(username) => UserInput { username, ..input },
            Err(e) => {
                self.error = Some(e.to_string());
                self.set_view(View::Form);
                return self.view;
            }
        };

        self.error = None;
        self.user_input = Some(input.clone());
        self.set_view(View::Loading);

        match self.run_pipeline(&input, viewer).await {
            Ok(analysis) => {
                self.analysis = Some(analysis);
                self.set_view(View::Results);
            }
            Err(e) => {
                error!("Analysis failed: {}", e);
                self.error = Some(e.to_string());
                self.set_view(View::Form);
            }
        }

        self.progress.send_replace(LoadingProgress::default());
        self.view
    }

    async fn run_pipeline(
        &mut self,
        input: &UserInput,
        viewer: Option<&str>,
    ) -> PilotResult<PortfolioAnalysis> {
        self.report(10, "Authenticating with GitHub...");

        self.report(25, "Fetching your repositories...");
        let repos = self
            .services
            .provider
            .list_repositories(&input.username)
            .await?;
        if repos.is_empty() {
            return Err(PilotError::NotFound(format!(
                "No public repositories found for \"{}\".",
                input.username
            )));
        }
        self.repositories = repos;

        self.report(60, "Analyzing code quality and extracting skills...");
        let analysis = self
            .services
            .requestor
            .analyze_portfolio(input, &self.repositories)
            .await?;

        self.report(85, "Generating recommendations...");
        self.report(95, "Finalizing your report...");
        if let Err(e) = self.services.cache.save(&analysis, input).await {
            error!("Failed to save analysis: {}", e);
        }
        if let Some(login) = viewer {
            self.services.analytics.track_analysis(login, &input.target_role);
        }

        self.report(100, "Analysis complete!");
        Ok(analysis)
    }

    /// Back to the form with nothing remembered.
    pub async fn reset(&mut self) -> PilotResult<()> {
        self.clear_memory();
        self.set_view(View::Form);
        self.services.cache.clear().await
    }

    /// Logout drops the cached analysis too.
    pub async fn on_logout(&mut self) -> PilotResult<()> {
        self.clear_memory();
        self.set_view(View::Landing);
        self.services.cache.clear().await
    }

    fn clear_memory(&mut self) {
        self.analysis = None;
        self.user_input = None;
        self.repositories.clear();
        self.error = None;
        self.deep_dive = None;
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Open the overlay for `repo`. Fetch or model failures leave the overlay
    /// open with no result.
    pub async fn select_repo(&mut self, repo: RepositorySummary) {
        if self.view != View::Results {
            warn!("Deep-dive is only available on the results view");
            return;
        }
        let Some(input) = self.user_input.clone() else {
            return;
        };

        self.deep_dive = Some(DeepDive {
            repo: repo.clone(),
            is_loading: true,
            result: None,
        });

        let result = self.run_deep_dive(&repo, &input).await;
        if let Some(overlay) = self.deep_dive.as_mut() {
            overlay.is_loading = false;
            match result {
                Ok(analysis) => overlay.result = Some(analysis),
                Err(e) => error!("Deep dive analysis failed for {}: {}", repo.name, e),
            }
        }
    }

    async fn run_deep_dive(
        &self,
        repo: &RepositorySummary,
        input: &UserInput,
    ) -> PilotResult<SingleRepoAnalysis> {
        let owner = repo.owner.login.as_str();
        let provider = &self.services.provider;
        let (readme, file_tree) = tokio::try_join!(
            provider.readme(owner, &repo.name),
            provider.file_tree(owner, &repo.name),
        )?;

        self.services
            .requestor
            .analyze_single_repo(repo, &readme, &file_tree, input)
            .await
    }

    /// Deep-dive by name. Repositories are re-listed when this page load has
    /// not fetched them yet.
    pub async fn select_repo_by_name(&mut self, name: &str) -> PilotResult<()> {
        if self.repositories.is_empty() {
            let Some(username) = self.user_input.as_ref().map(|i| i.username.clone()) else {
                return Err(PilotError::NotFound("No analysis loaded.".to_string()));
            };
            self.repositories = self.services.provider.list_repositories(&username).await?;
        }

        let repo = self
            .repositories
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
            .cloned()
            .ok_or_else(|| PilotError::NotFound(format!("Repository \"{}\" not found.", name)))?;

        self.select_repo(repo).await;
        Ok(())
    }

    pub fn close_deep_dive(&mut self) {
        self.deep_dive = None;
    }
}
