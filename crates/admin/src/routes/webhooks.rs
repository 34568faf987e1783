//! Mandatory privacy webhooks.
//!
//! Bodies are read raw so the signature can be checked before parsing.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
};
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::services::PrivacyService;
use crate::services::privacy::{
    CustomerDataReport, CustomerDataRequest, CustomerRedactReceipt, CustomerRedactRequest,
    ShopRedactReceipt, ShopRedactRequest,
};
use crate::shopify::signature::{WEBHOOK_HMAC_HEADER, verify_webhook_hmac};
use crate::state::AppState;

/// Build the webhook router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/webhooks/customers/data_request",
            post(customers_data_request),
        )
        .route("/api/webhooks/customers/redact", post(customers_redact))
        .route("/api/webhooks/shop/redact", post(shop_redact))
}

/// Check the body signature, then parse it.
fn verified_payload<T: DeserializeOwned>(
    state: &AppState,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<T, AppError> {
    let provided = headers
        .get(WEBHOOK_HMAC_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !verify_webhook_hmac(body, provided, &state.config().shopify.webhook_secret) {
        tracing::warn!(target: "gdpr_audit", "Webhook signature rejected");
        return Err(AppError::InvalidSignature);
    }

    serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("Invalid payload: {e}")))
}

/// POST /api/webhooks/customers/data_request
async fn customers_data_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<CustomerDataReport>, AppError> {
    let request: CustomerDataRequest = verified_payload(&state, &headers, &body)?;
    Ok(Json(PrivacyService::customer_data_request(request)))
}

/// POST /api/webhooks/customers/redact
async fn customers_redact(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<CustomerRedactReceipt>, AppError> {
    let request: CustomerRedactRequest = verified_payload(&state, &headers, &body)?;
    Ok(Json(PrivacyService::customer_redact(request)))
}

/// POST /api/webhooks/shop/redact
async fn shop_redact(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ShopRedactReceipt>, AppError> {
    let request: ShopRedactRequest = verified_payload(&state, &headers, &body)?;
    let receipt = PrivacyService::new(state.shops())
        .shop_redact(request)
        .await?;
    Ok(Json(receipt))
}
