//! Commission API handlers.

use axum::{
    Json, Router,
    extract::{Query, State, rejection::JsonRejection},
    routing::{get, post},
};
use commission_manager_core::{
    CollectionCommission, CollectionGid, Commission, CommissionStats, ProductCommission,
    ProductGid, RawId,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::AuthorizedShop;
use crate::services::commissions::{CommissionListing, warn_if_unusual};
use crate::services::{
    BulkApplier, BulkApplyOutcome, BulkScope, CommissionLister, CommissionService,
    CommissionServiceError, RemovalTarget, StatsAggregator,
};
use crate::state::AppState;

/// Build the commissions router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/commissions",
            post(set_commission).delete(remove_commission),
        )
        .route("/api/commissions/list", get(list_commissions))
        .route("/api/commissions/overview", get(overview))
}

// =============================================================================
// Request / Response Types
// =============================================================================

/// Body of `POST /api/commissions`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCommissionRequest {
    /// `product`, `collection` or `category`.
    #[serde(rename = "type")]
    pub target: String,
    /// Product or collection id (gid or numeric), or the category label.
    pub id: RawId,
    /// Numeric value; a JSON number or a numeric string.
    pub commission: serde_json::Value,
    pub commission_type: Option<String>,
    pub currency: Option<String>,
    /// Collections only: `false` stores a standing collection commission
    /// instead of writing one per member product.
    pub apply_to_products: Option<bool>,
}

/// Body of `DELETE /api/commissions`.
#[derive(Debug, Deserialize)]
pub struct RemoveCommissionRequest {
    #[serde(rename = "type")]
    pub target: String,
    pub id: RawId,
}

/// Result of `POST /api/commissions`, shaped by target.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SetCommissionResponse {
    Product(ProductCommission),
    Collection(CollectionCommission),
    Bulk(BulkApplyOutcome),
}

/// Result of `DELETE /api/commissions`.
#[derive(Debug, Serialize)]
pub struct RemoveCommissionResponse {
    pub success: bool,
    pub removed: bool,
}

/// Paging query for the list endpoint.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

// =============================================================================
// Route Handlers
// =============================================================================

/// POST /api/commissions - Set a product commission or bulk-apply one.
#[instrument(skip_all, fields(shop = %shop.domain))]
async fn set_commission(
    State(state): State<AppState>,
    shop: AuthorizedShop,
    payload: Result<Json<SetCommissionRequest>, JsonRejection>,
) -> Result<Json<SetCommissionResponse>, AppError> {
    let body = json_body(payload)?;
    let domain = &shop.domain;

    let commission = Commission::from_input(
        &body.commission,
        body.commission_type.as_deref(),
        body.currency.as_deref(),
    )
    .map_err(CommissionServiceError::from)?;
    warn_if_unusual(&commission);

    let catalog = shop.catalog.as_ref();
    let service = CommissionService::new(state.commissions(), catalog);
    let bulk = BulkApplier::new(
        state.commissions(),
        catalog,
        state.config().bulk_write_concurrency,
    );

    let response = match body.target.as_str() {
        "product" => {
            let product =
                ProductGid::parse(&body.id.as_text()).map_err(CommissionServiceError::from)?;
            service
                .set_product_commission(domain, &product, &commission, None)
                .await
                .map(SetCommissionResponse::Product)
        }
        "collection" => {
            let collection =
                CollectionGid::parse(&body.id.as_text()).map_err(CommissionServiceError::from)?;
            if body.apply_to_products.unwrap_or(true) {
                bulk.apply_to_scope(domain, &BulkScope::Collection(collection), &commission)
                    .await
                    .map(SetCommissionResponse::Bulk)
            } else {
                service
                    .set_collection_commission(domain, &collection, &commission)
                    .await
                    .map(SetCommissionResponse::Collection)
            }
        }
        "category" => {
            bulk.apply_to_scope(domain, &BulkScope::Category(body.id.as_text()), &commission)
                .await
                .map(SetCommissionResponse::Bulk)
        }
        other => return Err(AppError::BadRequest(format!("Invalid type: {other}"))),
    };

    response
        .map(Json)
        .map_err(|e| AppError::from(e).for_shop(domain))
}

/// DELETE /api/commissions - Remove a commission. Idempotent.
#[instrument(skip_all, fields(shop = %shop.domain))]
async fn remove_commission(
    State(state): State<AppState>,
    shop: AuthorizedShop,
    payload: Result<Json<RemoveCommissionRequest>, JsonRejection>,
) -> Result<Json<RemoveCommissionResponse>, AppError> {
    let body = json_body(payload)?;
    let target = RemovalTarget::parse(&body.target, &body.id)?;

    let removed = CommissionService::new(state.commissions(), shop.catalog.as_ref())
        .remove(&shop.domain, &target)
        .await?;

    Ok(Json(RemoveCommissionResponse {
        success: true,
        removed,
    }))
}

/// GET /api/commissions/list - Paginated commissions with live prices.
#[instrument(skip_all, fields(shop = %shop.domain))]
async fn list_commissions(
    State(state): State<AppState>,
    shop: AuthorizedShop,
    Query(query): Query<ListQuery>,
) -> Result<Json<CommissionListing>, AppError> {
    CommissionLister::new(state.commissions(), shop.catalog.as_ref())
        .list(&shop.domain, query.page, query.limit)
        .await
        .map(Json)
        .map_err(|e| AppError::from(e).for_shop(&shop.domain))
}

/// GET /api/commissions/overview - Aggregate commission statistics.
#[instrument(skip_all, fields(shop = %shop.domain))]
async fn overview(
    State(state): State<AppState>,
    shop: AuthorizedShop,
) -> Result<Json<CommissionStats>, AppError> {
    StatsAggregator::new(state.commissions(), shop.catalog.as_ref())
        .compute_overview(&shop.domain)
        .await
        .map(Json)
        .map_err(|e| AppError::from(e).for_shop(&shop.domain))
}
