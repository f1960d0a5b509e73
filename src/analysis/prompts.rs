// src/analysis/prompts.rs
use super::types::UserInput;
use crate::error::{PilotError, PilotResult};
use crate::github::RepositorySummary;
use serde::Serialize;

/// Per-repository fields the model sees for the portfolio pass.
#[derive(Debug, Serialize)]
pub struct RepositoryDigest<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub language: Option<&'a str>,
    pub stars: u32,
    pub forks: u32,
}

impl<'a> From<&'a RepositorySummary> for RepositoryDigest<'a> {
    fn from(repo: &'a RepositorySummary) -> Self {
        Self {
            name: &repo.name,
            description: repo.description.as_deref(),
            language: repo.language.as_deref(),
            stars: repo.stargazers_count,
            forks: repo.forks_count,
        }
    }
}

pub fn repository_digest(repos: &[RepositorySummary]) -> PilotResult<String> {
    let digest: Vec<RepositoryDigest> = repos.iter().map(RepositoryDigest::from).collect();
    serde_json::to_string_pretty(&digest)
        .map_err(|e| PilotError::AnalysisFailed(format!("Failed to encode repositories: {}", e)))
}

pub fn portfolio_prompt(input: &UserInput, digest: &str) -> String {
    format!(
        r#"Act as an expert senior software engineer and hiring manager. Perform a detailed portfolio analysis for GitHub user "{username}".

**User Profile:**
- Target Role: {role}
- Experience Level: {experience}
- Key Focus Areas: {focus}

**User's Public Repositories (JSON format):**
{digest}

**Instructions:**
1. **Analyze the provided list of repositories.** Your entire analysis MUST be based on this real data.
2. Identify the 3-5 most impactful repositories and feature them in the 'repositories' section of your response. Impact can be judged by relevance to the target role, complexity, or apparent completeness.
3. Infer commit patterns and tech stack from the repository languages and descriptions.
4. Provide a professional, encouraging, and highly specific analysis. The scores should be judged against the user's experience level.
5. Strictly adhere to the JSON schema. Do not output any text outside the JSON structure."#,
        username = input.username,
        role = input.target_role,
        experience = input.experience_level,
        focus = input.focus_list(),
        digest = digest,
    )
}

pub fn single_repo_prompt(
    repo: &RepositorySummary,
    readme: &str,
    file_tree: &str,
    input: &UserInput,
) -> String {
    format!(
        r#"Act as an expert code reviewer and senior engineer. You are performing a deep-dive analysis of a single GitHub repository.

**User Profile:**
- Target Role: {role}
- Experience Level: {experience}

**Repository Details:**
- Name: {name}
- Description: {description}
- Primary Language: {language}

**Repository README Content:**
```markdown
{readme}
```

**Repository File Tree:**
```
{file_tree}
```

**Instructions:**
1. Based *only* on the provided README content and file tree, evaluate the repository's documentation and structure.
2. **README Quality:** Assess if the README is comprehensive. Does it have a clear title, description, setup instructions, usage examples, and license info? Is it well-formatted?
3. **Code & File Structure:** Analyze the file tree. Is it well-organized? Does it follow common conventions for its language/framework (e.g., src, dist, components, utils)? Are file names clear and consistent?
4. Provide specific, actionable feedback.
5. Strictly adhere to the JSON schema. Do not add any text outside the JSON structure."#,
        role = input.target_role,
        experience = input.experience_level,
        name = repo.name,
        description = repo.description.as_deref().unwrap_or("No description"),
        language = repo.language.as_deref().unwrap_or("Unknown"),
        readme = readme,
        file_tree = file_tree,
    )
}
