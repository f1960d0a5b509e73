// src/analytics.rs
//! Product analytics, emitted as structured tracing events on the
//! `analytics` target so any subscriber layer can forward them.

use crate::github::Profile;
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct Analytics;

impl Analytics {
    pub fn track_signup(&self, user: &Profile) {
        info!(
            target: "analytics",
            event = "sign_up",
            method = "github",
            user_id = %user.login,
            user_name = user.display_name.as_deref().unwrap_or(""),
            "Signup tracked"
        );
    }

    pub fn track_analysis(&self, user_id: &str, target_role: &str) {
        info!(
            target: "analytics",
            event = "analysis_completed",
            user_id = %user_id,
            target_role = %target_role,
            "Analysis tracked"
        );
    }

    pub fn track_page_view(&self, page: &str) {
        info!(target: "analytics", event = "page_view", page_title = %page);
    }
}
