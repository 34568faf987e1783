//! Public privacy policy.

use axum::{Json, Router, routing::get};

use crate::services::privacy::{PrivacyPolicy, privacy_policy};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/privacy-policy", get(policy))
}

async fn policy() -> Json<PrivacyPolicy> {
    Json(privacy_policy())
}
