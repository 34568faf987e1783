//! Shop extractor for shop-scoped API routes.
//!
//! Every commission and catalog route names its shop in `?shop=`. The
//! extractor resolves it to an installed shop with a stored token and builds
//! the catalog client for it.

use std::sync::Arc;

use axum::extract::{FromRequestParts, Query};
use axum::http::{Uri, request::Parts};
use commission_manager_core::ShopDomain;
use serde::Deserialize;

use crate::error::AppError;
use crate::shopify::Catalog;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct ShopQuery {
    shop: Option<String>,
}

/// An installed shop and a catalog client authenticated for it.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(AuthorizedShop { domain, catalog }: AuthorizedShop) -> ... {
///     let page = catalog.list_products_page(None, 50, None).await?;
/// }
/// ```
pub struct AuthorizedShop {
    pub domain: ShopDomain,
    pub catalog: Arc<dyn Catalog>,
}

impl std::fmt::Debug for AuthorizedShop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizedShop")
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

/// Read and validate `?shop=` from a request.
///
/// # Errors
///
/// Returns `AppError::BadRequest` if the parameter is missing or malformed.
pub fn shop_param(uri: &Uri) -> Result<ShopDomain, AppError> {
    let raw = Query::<ShopQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(q)| q.shop)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing shop parameter".to_string()))?;
    ShopDomain::parse(&raw).map_err(|e| AppError::BadRequest(format!("Invalid shop: {e}")))
}

impl FromRequestParts<AppState> for AuthorizedShop {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let domain = shop_param(&parts.uri)?;

        let token = state
            .shops()
            .find_shop(&domain)
            .await?
            .and_then(|shop| shop.token().cloned());

        let Some(token) = token else {
            tracing::info!(shop = %domain, "Request for shop without a stored token");
            return Err(AppError::AuthRequired { shop: domain });
        };

        let catalog = state.catalogs().catalog_for(&domain, &token);
        Ok(Self { domain, catalog })
    }
}
