// src/github/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Snapshot of the authenticated GitHub user, taken once at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: u64,
    pub login: String,
    #[serde(rename = "name", default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl Profile {
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.login)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryOwner {
    pub login: String,
}

/// Read-only mirror of a repository as GitHub reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySummary {
    pub name: String,
    pub description: Option<String>,
    pub html_url: String,
    pub language: Option<String>,
    pub stargazers_count: u32,
    pub forks_count: u32,
    pub owner: RepositoryOwner,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub language_stats: BTreeMap<String, u64>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RepositorySummary {
    pub fn with_languages(mut self, stats: BTreeMap<String, u64>) -> Self {
        let mut ordered: Vec<(&String, &u64)> = stats.iter().collect();
        ordered.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        self.languages = ordered.into_iter().map(|(name, _)| name.clone()).collect();
        self.language_stats = stats;
        self
    }

    pub fn with_topics(mut self, topics: Vec<String>) -> Self {
        if !topics.is_empty() {
            self.topics = topics;
        }
        self
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RepositoryDetails {
    #[serde(default)]
    pub topics: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReadmePayload {
    pub content: String,
    #[serde(default)]
    pub encoding: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TreeEntry {
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TreePayload {
    #[serde(default)]
    pub tree: Vec<TreeEntry>,
    #[serde(default)]
    pub truncated: bool,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn summary(name: &str) -> RepositorySummary {
        RepositorySummary {
            name: name.to_string(),
            description: Some(format!("{} service", name)),
            html_url: format!("https://github.com/octocat/{}", name),
            language: Some("Rust".to_string()),
            stargazers_count: 4,
            forks_count: 1,
            owner: RepositoryOwner {
                login: "octocat".to_string(),
            },
            languages: vec![],
            language_stats: BTreeMap::new(),
            topics: vec![],
            size: None,
            created_at: None,
            updated_at: None,
        }
    }
}
