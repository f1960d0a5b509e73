// src/analysis/mod.rs
pub mod cache;
pub mod gemini;
pub mod prompts;
pub mod requestor;
pub mod schema;
pub mod types;

pub use cache::{AnalysisCache, StoredAnalysisRecord};
pub use gemini::{GeminiClient, ModelClient};
pub use requestor::AnalysisRequestor;
pub use types::{PortfolioAnalysis, SingleRepoAnalysis, UserInput};
