//! Portfolio Pilot: GitHub sign-in, repository fetch, AI portfolio scoring and
//! a locally persisted result, driven one page load at a time.

pub mod analysis;
pub mod analytics;
pub mod app;
pub mod auth;
pub mod cli;
pub mod clock;
pub mod environment;
pub mod error;
pub mod github;
pub mod session;
pub mod storage;
pub mod view;
pub mod web;

pub use app::{AppContext, AppParts};
pub use error::{AuthError, AuthErrorKind, PilotError, PilotResult};
