// src/analysis/types.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::RangeInclusive;

pub const FEATURED_REPOSITORIES: RangeInclusive<usize> = 3..=5;
pub const RECOMMENDATION_COUNT: RangeInclusive<usize> = 5..=7;
pub const IMPROVEMENT_COUNT: RangeInclusive<usize> = 2..=3;

/// Form submission driving one analysis cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    pub username: String,
    pub target_role: String,
    pub experience_level: String,
    pub focus_areas: BTreeSet<String>,
}

impl UserInput {
    pub fn focus_list(&self) -> String {
        self.focus_areas
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub documentation: u8,
    pub code_quality: u8,
    pub project_diversity: u8,
    pub commit_patterns: u8,
    pub tech_stack: u8,
}

impl ScoreBreakdown {
    fn scores(&self) -> [(&'static str, u8); 5] {
        [
            ("documentation", self.documentation),
            ("codeQuality", self.code_quality),
            ("projectDiversity", self.project_diversity),
            ("commitPatterns", self.commit_patterns),
            ("techStack", self.tech_stack),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoAnalysis {
    pub name: String,
    pub description: String,
    pub score: u8,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub technologies: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Documentation,
    #[serde(rename = "Code Quality")]
    CodeQuality,
    #[serde(rename = "Project Diversity")]
    ProjectDiversity,
    #[serde(rename = "Tech Stack")]
    TechStack,
    Professionalism,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitAnalysis {
    pub consistency: String,
    pub message_quality: String,
    pub frequency: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechStackAnalysis {
    pub languages: Vec<String>,
    pub frameworks: Vec<String>,
    pub tools: Vec<String>,
    pub summary: String,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioAnalysis {
    pub overall_score: u8,
    pub summary: String,
    pub score_breakdown: ScoreBreakdown,
    pub repositories: Vec<RepoAnalysis>,
    pub recommendations: Vec<Recommendation>,
    pub commit_analysis: CommitAnalysis,
    pub tech_stack_analysis: TechStackAnalysis,
}

impl PortfolioAnalysis {
    /// Check the bounds serde cannot express. `available` is the number of
    /// repositories the model was shown; fewer than three relaxes the
    /// featured-repository minimum.
    pub fn validate(&self, available: usize) -> Result<(), String> {
        check_score("overallScore", self.overall_score)?;
        for (field, score) in self.score_breakdown.scores() {
            check_score(field, score)?;
        }

        let min_featured = (*FEATURED_REPOSITORIES.start()).min(available).max(1);
        let featured = self.repositories.len();
        if featured < min_featured || featured > *FEATURED_REPOSITORIES.end() {
            return Err(format!(
                "expected {}-{} featured repositories, got {}",
                min_featured,
                FEATURED_REPOSITORIES.end(),
                featured
            ));
        }
        for repo in &self.repositories {
            check_score("repositories.score", repo.score)?;
        }

        check_count(
            "recommendations",
            &RECOMMENDATION_COUNT,
            self.recommendations.len(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rating {
    Excellent,
    Good,
    Fair,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeStructure {
    pub rating: Rating,
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadmeQuality {
    pub rating: Rating,
    pub feedback: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Improvement {
    pub area: String,
    pub suggestion: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleRepoAnalysis {
    pub repo_name: String,
    pub overall_impression: String,
    pub code_structure: CodeStructure,
    pub readme_quality: ReadmeQuality,
    pub potential_improvements: Vec<Improvement>,
}

impl SingleRepoAnalysis {
    pub fn validate(&self) -> Result<(), String> {
        check_count(
            "potentialImprovements",
            &IMPROVEMENT_COUNT,
            self.potential_improvements.len(),
        )
    }
}

fn check_score(field: &str, score: u8) -> Result<(), String> {
    if score > 100 {
        return Err(format!("{} out of range: {}", field, score));
    }
    Ok(())
}

fn check_count(field: &str, range: &RangeInclusive<usize>, count: usize) -> Result<(), String> {
    if !range.contains(&count) {
        return Err(format!(
            "expected {}-{} {}, got {}",
            range.start(),
            range.end(),
            field,
            count
        ));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn user_input(username: &str) -> UserInput {
        UserInput {
            username: username.to_string(),
            target_role: "Backend Engineer".to_string(),
            experience_level: "Mid-level".to_string(),
            focus_areas: ["Documentation", "Code Quality"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }

    pub fn repo_analysis(name: &str) -> RepoAnalysis {
        RepoAnalysis {
            name: name.to_string(),
            description: format!("{} description", name),
            score: 80,
            strengths: vec!["Clear scope".to_string()],
            areas_for_improvement: vec!["Add tests".to_string()],
            technologies: vec!["Rust".to_string()],
        }
    }

    pub fn recommendation(id: &str) -> Recommendation {
        Recommendation {
            id: id.to_string(),
            priority: Priority::High,
            title: "Write READMEs".to_string(),
            description: "Document setup and usage.".to_string(),
            category: Category::Documentation,
        }
    }

    pub fn portfolio(featured: usize) -> PortfolioAnalysis {
        PortfolioAnalysis {
            overall_score: 72,
            summary: "Solid foundations.".to_string(),
            score_breakdown: ScoreBreakdown {
                documentation: 60,
                code_quality: 75,
                project_diversity: 70,
                commit_patterns: 68,
                tech_stack: 80,
            },
            repositories: (0..featured)
                .map(|i| repo_analysis(&format!("repo-{}", i)))
                .collect(),
            recommendations: (0..5)
                .map(|i| recommendation(&format!("rec-{}", i)))
                .collect(),
            commit_analysis: CommitAnalysis {
                consistency: "Regular".to_string(),
                message_quality: "Descriptive".to_string(),
                frequency: "Weekly".to_string(),
                summary: "Steady contributor.".to_string(),
            },
            tech_stack_analysis: TechStackAnalysis {
                languages: vec!["Rust".to_string()],
                frameworks: vec!["Rocket".to_string()],
                tools: vec!["Docker".to_string()],
                summary: "Backend focused.".to_string(),
                recommendations: vec!["Try a frontend framework".to_string()],
            },
        }
    }

    pub fn single_repo(name: &str) -> SingleRepoAnalysis {
        SingleRepoAnalysis {
            repo_name: name.to_string(),
            overall_impression: "Well organised.".to_string(),
            code_structure: CodeStructure {
                rating: Rating::Good,
                feedback: "Conventional layout.".to_string(),
            },
            readme_quality: ReadmeQuality {
                rating: Rating::NeedsImprovement,
                feedback: "Sparse.".to_string(),
                suggestions: vec!["Add usage examples".to_string()],
            },
            potential_improvements: vec![
                Improvement {
                    area: "Add Unit Tests".to_string(),
                    suggestion: "Cover the parser.".to_string(),
                },
                Improvement {
                    area: "Error Handling".to_string(),
                    suggestion: "Propagate IO errors.".to_string(),
                },
            ],
        }
    }
}
