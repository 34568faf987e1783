//! Shop maintenance commands.
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `SHOPIFY_API_VERSION` - Admin API version (default: 2025-01)

use std::time::Duration;

use commission_manager_admin::db::ShopStore;
use commission_manager_admin::services::privacy::{ShopRedactReceipt, ShopRedactRequest};
use commission_manager_admin::services::{PrivacyService, StatsAggregator};
use commission_manager_admin::shopify::{CatalogProvider, ShopifyCatalogProvider};
use commission_manager_core::{CommissionStats, ShopDomain};

use super::{CommandError, connect};

const DEFAULT_API_VERSION: &str = "2025-01";

/// Compute the commission overview for an installed shop.
///
/// # Errors
///
/// Returns `CommandError` if the shop is unknown or has no token, or if the
/// store or catalog cannot be read.
pub async fn overview(shop: &ShopDomain) -> Result<CommissionStats, CommandError> {
    let store = connect().await?;

    let token = store
        .find_shop(shop)
        .await?
        .and_then(|s| s.token().cloned())
        .ok_or_else(|| CommandError::NotInstalled(shop.to_string()))?;

    let api_version =
        std::env::var("SHOPIFY_API_VERSION").unwrap_or_else(|_| DEFAULT_API_VERSION.to_owned());
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;
    let catalog = ShopifyCatalogProvider::new(http, api_version).catalog_for(shop, &token);

    tracing::info!(shop = %shop, "Computing commission overview (full catalog scan)...");
    let stats = StatsAggregator::new(&store, catalog.as_ref())
        .compute_overview(shop)
        .await?;
    Ok(stats)
}

/// Delete a shop and all of its commissions.
///
/// # Errors
///
/// Returns `CommandError` if the store cannot be reached or the delete fails.
pub async fn redact(shop: ShopDomain) -> Result<ShopRedactReceipt, CommandError> {
    let store = connect().await?;

    tracing::warn!(shop = %shop, "Erasing shop data");
    let receipt = PrivacyService::new(&store)
        .shop_redact(ShopRedactRequest {
            shop_id: None,
            shop_domain: shop,
        })
        .await?;

    tracing::info!(deleted = receipt.records_deleted.total, "Shop erased");
    Ok(receipt)
}
