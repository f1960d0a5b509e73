// src/github/mod.rs
pub mod client;
pub mod types;

pub use client::{validate_username, GithubClient, RepositoryProvider};
pub use types::{Profile, RepositoryOwner, RepositorySummary};
