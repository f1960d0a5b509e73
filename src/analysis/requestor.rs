// src/analysis/requestor.rs
use super::gemini::ModelClient;
use super::prompts::{portfolio_prompt, repository_digest, single_repo_prompt};
use super::schema;
use super::types::{PortfolioAnalysis, SingleRepoAnalysis, UserInput};
use crate::error::{PilotError, PilotResult};
use crate::github::RepositorySummary;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{error, info};

const PORTFOLIO_TEMPERATURE: f32 = 0.3;
const SINGLE_REPO_TEMPERATURE: f32 = 0.2;

const PORTFOLIO_FAILURE: &str = "The AI model failed to generate a portfolio analysis.";
const SINGLE_REPO_FAILURE: &str = "The AI model failed to analyze the repository.";

/// Stateless: every call is a fresh round trip to the model.
#[derive(Clone)]
pub struct AnalysisRequestor {
    model: Arc<dyn ModelClient>,
}

impl AnalysisRequestor {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model }
    }

    pub async fn analyze_portfolio(
        &self,
        input: &UserInput,
        repositories: &[RepositorySummary],
    ) -> PilotResult<PortfolioAnalysis> {
        let digest = repository_digest(repositories)?;
        let prompt = portfolio_prompt(input, &digest);

        info!(
            "Requesting portfolio analysis for {} ({} repositories)",
            input.username,
            repositories.len()
        );

        let analysis: PortfolioAnalysis = self
            .request(&prompt, schema::portfolio_analysis(), PORTFOLIO_TEMPERATURE)
            .await
            .map_err(|e| failure(PORTFOLIO_FAILURE, e))?;

        analysis
            .validate(repositories.len())
            .map_err(|reason| failure(PORTFOLIO_FAILURE, reason))?;
        Ok(analysis)
    }

    pub async fn analyze_single_repo(
        &self,
        repo: &RepositorySummary,
        readme: &str,
        file_tree: &str,
        input: &UserInput,
    ) -> PilotResult<SingleRepoAnalysis> {
        let prompt = single_repo_prompt(repo, readme, file_tree, input);
        info!("Requesting deep-dive analysis for {}", repo.name);

        let analysis: SingleRepoAnalysis = self
            .request(&prompt, schema::single_repo_analysis(), SINGLE_REPO_TEMPERATURE)
            .await
            .map_err(|e| failure(SINGLE_REPO_FAILURE, e))?;

        analysis
            .validate()
            .map_err(|reason| failure(SINGLE_REPO_FAILURE, reason))?;
        Ok(analysis)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        prompt: &str,
        schema: serde_json::Value,
        temperature: f32,
    ) -> Result<T, String> {
        let text = self
            .model
            .generate_json(prompt, schema, temperature)
            .await
            .map_err(|e| e.to_string())?;

        serde_json::from_str(strip_code_fence(&text))
            .map_err(|e| format!("response does not match schema: {}", e))
    }
}

fn failure(message: &str, reason: impl std::fmt::Display) -> PilotError {
    error!("{} Reason: {}", message, reason);
    PilotError::AnalysisFailed(message.to_string())
}

/// Accept a document wrapped in a markdown fence.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.strip_prefix("json").unwrap_or(rest);
    body.strip_suffix("```").unwrap_or(body).trim()
}


#[cfg(test)]
mod tests {
    use super::fakes::ScriptedModel;
    use super::*;
    use crate::analysis::types::fixtures::{portfolio, single_repo, user_input};
    use crate::github::types::fixtures::summary;

    fn requestor(model: &Arc<ScriptedModel>) -> AnalysisRequestor {
        AnalysisRequestor::new(model.clone())
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
    }

    #[tokio::test]
    async fn test_portfolio_digest_includes_every_repository() {
        let body = serde_json::to_string(&portfolio(4)).unwrap();
        let model = Arc::new(ScriptedModel::new(vec![Ok(body)]));
        let repos: Vec<RepositorySummary> =
            (0..7).map(|i| summary(&format!("repo-{}", i))).collect();

        let analysis = requestor(&model)
            .analyze_portfolio(&user_input("octocat"), &repos)
            .await
            .unwrap();
        assert_eq!(analysis.repositories.len(), 4);

        let prompt = model.prompts.lock().unwrap()[0].clone();
        let start = prompt.find('[').unwrap();
        let end = prompt.rfind(']').unwrap();
        let digest: serde_json::Value = serde_json::from_str(&prompt[start..=end]).unwrap();
        assert_eq!(digest.as_array().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn test_out_of_bounds_result_is_rejected_whole() {
        let body = serde_json::to_string(&portfolio(6)).unwrap();
        let model = Arc::new(ScriptedModel::new(vec![Ok(body)]));
        let repos: Vec<RepositorySummary> =
            (0..8).map(|i| summary(&format!("repo-{}", i))).collect();

        let err = requestor(&model)
            .analyze_portfolio(&user_input("octocat"), &repos)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "The AI model failed to generate a portfolio analysis."
        );
    }

    #[tokio::test]
    async fn test_malformed_and_failed_calls_are_analysis_failures() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok("{\"overallScore\": 50}".to_string()),
            Err(PilotError::Network("timeout".to_string())),
        ]));
        let repos = vec![summary("api")];
        let input = user_input("octocat");

        for _ in 0..2 {
            let err = requestor(&model)
                .analyze_portfolio(&input, &repos)
                .await
                .unwrap_err();
            assert!(matches!(err, PilotError::AnalysisFailed(_)));
        }
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn test_single_repo_analysis() {
        let fenced = format!(
            "```json\n{}\n```",
            serde_json::to_string(&single_repo("api")).unwrap()
        );
        let model = Arc::new(ScriptedModel::new(vec![Ok(fenced)]));

        let analysis = requestor(&model)
            .analyze_single_repo(&summary("api"), "# API", "src/lib.rs", &user_input("octocat"))
            .await
            .unwrap();
        assert_eq!(analysis.repo_name, "api");
        assert!(model.prompts.lock().unwrap()[0].contains("src/lib.rs"));
    }
}
