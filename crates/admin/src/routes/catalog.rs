//! Catalog listing handlers used by the commission screens.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::AuthorizedShop;
use crate::services::CatalogService;
use crate::services::catalog::{CategoryListing, CollectionListing, ProductListing};
use crate::state::AppState;

/// Build the catalog router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(products))
        .route("/api/collections", get(collections))
        .route("/api/categories", get(categories))
}

/// Cursor and search query parameters.
#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub after: Option<String>,
    pub search: Option<String>,
}

impl CatalogQuery {
    fn search(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    fn after(&self) -> Option<&str> {
        self.after.as_deref().filter(|s| !s.is_empty())
    }
}

/// GET /api/products - One page of products with their effective commission.
#[instrument(skip_all, fields(shop = %shop.domain))]
async fn products(
    State(state): State<AppState>,
    shop: AuthorizedShop,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<ProductListing>, AppError> {
    CatalogService::new(state.commissions(), shop.catalog.as_ref())
        .products(&shop.domain, query.after(), query.search())
        .await
        .map(Json)
        .map_err(|e| AppError::from(e).for_shop(&shop.domain))
}

/// GET /api/collections - One page of collections.
#[instrument(skip_all, fields(shop = %shop.domain))]
async fn collections(
    State(state): State<AppState>,
    shop: AuthorizedShop,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<CollectionListing>, AppError> {
    CatalogService::new(state.commissions(), shop.catalog.as_ref())
        .collections(&shop.domain, query.after(), query.search())
        .await
        .map(Json)
        .map_err(|e| AppError::from(e).for_shop(&shop.domain))
}

/// GET /api/categories - Categories derived from product types.
#[instrument(skip_all, fields(shop = %shop.domain))]
async fn categories(
    State(state): State<AppState>,
    shop: AuthorizedShop,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<CategoryListing>, AppError> {
    CatalogService::new(state.commissions(), shop.catalog.as_ref())
        .categories(query.search())
        .await
        .map(Json)
        .map_err(|e| AppError::from(e).for_shop(&shop.domain))
}
