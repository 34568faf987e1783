//! Shopify OAuth install routes.
//!
//! `GET /api/auth?shop=` stores a random `state` in the session and redirects
//! the merchant to Shopify's consent screen. Shopify redirects back to
//! `GET /api/auth/callback`, which checks the query signature and the
//! `state`, exchanges the code and stores the offline token for the shop.

use std::collections::BTreeMap;

use axum::{
    Router,
    extract::{Query, State},
    http::Uri,
    response::Redirect,
    routing::get,
};
use commission_manager_core::ShopDomain;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::shop_param;
use crate::shopify::signature::verify_query_hmac;
use crate::state::AppState;

const OAUTH_STATE_KEY: &str = "shopify_oauth_state";

/// Build the OAuth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth", get(connect))
        .route("/api/auth/callback", get(callback))
}

/// GET /api/auth - Start the install flow.
#[instrument(skip_all)]
async fn connect(
    State(state): State<AppState>,
    session: Session,
    uri: Uri,
) -> Result<Redirect, AppError> {
    let shop = shop_param(&uri)?;

    let oauth_state = uuid::Uuid::new_v4().to_string();
    session
        .insert(OAUTH_STATE_KEY, &oauth_state)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to store OAuth state: {e}")))?;

    let auth_url = state.oauth().authorization_url(
        &shop,
        &state.config().oauth_redirect_uri(),
        &oauth_state,
    );

    tracing::info!(shop = %shop, "Redirecting to Shopify OAuth");
    Ok(Redirect::to(&auth_url))
}

/// GET /api/auth/callback - Finish the install flow.
#[instrument(skip_all)]
async fn callback(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Redirect, AppError> {
    if let Some(error) = params.get("error") {
        tracing::warn!(error, "Shopify OAuth was denied");
        return Err(AppError::BadRequest(format!("OAuth denied: {error}")));
    }

    if !verify_query_hmac(&params, state.oauth().api_secret()) {
        tracing::warn!("Invalid HMAC signature in OAuth callback");
        return Err(AppError::InvalidSignature);
    }

    let (Some(code), Some(raw_shop)) = (params.get("code"), params.get("shop")) else {
        return Err(AppError::BadRequest("Missing required parameters".to_string()));
    };
    let shop = ShopDomain::parse(raw_shop)
        .map_err(|e| AppError::BadRequest(format!("Invalid shop: {e}")))?;

    let stored_state: Option<String> = session.get(OAUTH_STATE_KEY).await.ok().flatten();
    if stored_state.is_none() || stored_state.as_ref() != params.get("state") {
        tracing::warn!(shop = %shop, "OAuth state mismatch");
        return Err(AppError::InvalidSignature);
    }
    let _ = session.remove::<String>(OAUTH_STATE_KEY).await;

    let token = state.oauth().exchange_code(&shop, code).await?;
    state
        .shops()
        .save_shop_token(&shop, &token.access_token, &token.scope)
        .await?;

    tracing::info!(shop = %shop, scope = %token.scope, "Shop installed");

    let host = params.get("host").map_or("", String::as_str);
    Ok(Redirect::to(&format!(
        "/?shop={}&host={}",
        urlencoding::encode(shop.as_str()),
        urlencoding::encode(host)
    )))
}
