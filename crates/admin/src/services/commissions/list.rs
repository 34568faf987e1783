//! Paginated commission listing, joined with live catalog prices.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use commission_manager_core::{Commission, CommissionId, ProductGid, ShopDomain};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use super::CommissionServiceError;
use crate::db::CommissionStore;
use crate::shopify::{Catalog, CatalogProduct};

/// Page size used when the caller does not give one.
pub const DEFAULT_LIMIT: u32 = 20;

/// Largest accepted page size.
pub const MAX_LIMIT: u32 = 100;

/// Currency reported for records whose product has no price currency.
const FALLBACK_CURRENCY: &str = "KES";

const UNKNOWN_PRODUCT: &str = "Unknown Product";

/// A product commission with the product's live price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedCommission {
    pub id: CommissionId,
    #[serde(rename = "type")]
    pub scope: &'static str,
    #[serde(flatten)]
    pub commission: Commission,
    /// Earnings from one sale at the current price.
    #[serde(with = "rust_decimal::serde::float")]
    pub commission_amount: Decimal,
    pub product_id: ProductGid,
    pub product_title: String,
    pub product_handle: String,
    pub product_link: String,
    /// Zero when the product is gone or unpriced.
    #[serde(with = "rust_decimal::serde::float")]
    pub product_price: Decimal,
    pub currency_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Counts shown above the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSummary {
    pub total_commissions: u64,
    pub product_commissions: usize,
    pub collection_commissions: usize,
}

/// Pagination echo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPagination {
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
    pub total_count: u64,
}

/// Response body of `GET /api/commissions/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommissionListing {
    pub commissions: Vec<EnrichedCommission>,
    pub summary: ListSummary,
    pub pagination: ListPagination,
}

/// Lists product commissions page by page.
pub struct CommissionLister<'a> {
    store: &'a dyn CommissionStore,
    catalog: &'a dyn Catalog,
}

impl<'a> CommissionLister<'a> {
    /// Create a lister.
    #[must_use]
    pub const fn new(store: &'a dyn CommissionStore, catalog: &'a dyn Catalog) -> Self {
        Self { store, catalog }
    }

    /// One page of commissions, newest first.
    ///
    /// `page` defaults to 1 and `limit` to 20 (at most 100).
    ///
    /// # Errors
    ///
    /// Returns `CommissionServiceError::Repository` if the store cannot be read
    /// and `CommissionServiceError::Catalog` if prices cannot be fetched.
    #[instrument(skip(self), fields(shop = %shop))]
    pub async fn list(
        &self,
        shop: &ShopDomain,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<CommissionListing, CommissionServiceError> {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

        let stored = self.store.list_product_commissions(shop, page, limit).await?;

        let ids: Vec<ProductGid> = stored.records.iter().map(|r| r.product_id.clone()).collect();
        let products: HashMap<ProductGid, CatalogProduct> = if ids.is_empty() {
            HashMap::new()
        } else {
            self.catalog
                .get_products_by_ids(&ids)
                .await?
                .into_iter()
                .map(|p| (p.id.clone(), p))
                .collect()
        };

        let commissions: Vec<EnrichedCommission> = stored
            .records
            .into_iter()
            .map(|record| {
                let product = products.get(&record.product_id);
                let price = product.and_then(|p| p.price);
                let product_title = if record.product_title.is_empty()
                    || record.product_title == UNKNOWN_PRODUCT
                {
                    product.map_or_else(|| UNKNOWN_PRODUCT.to_string(), |p| p.title.clone())
                } else {
                    record.product_title
                };

                EnrichedCommission {
                    id: record.id,
                    scope: "product",
                    commission_amount: record.commission.earnings(price),
                    commission: record.commission,
                    product_id: record.product_id,
                    product_title,
                    product_handle: record.product_handle,
                    product_link: record.product_link,
                    product_price: price.unwrap_or_default(),
                    currency_code: product
                        .and_then(|p| p.currency.as_ref())
                        .map_or_else(|| FALLBACK_CURRENCY.to_string(), ToString::to_string),
                    created_at: record.created_at,
                    updated_at: record.updated_at,
                }
            })
            .collect();

        Ok(CommissionListing {
            summary: ListSummary {
                total_commissions: stored.total,
                product_commissions: commissions.len(),
                collection_commissions: 0,
            },
            pagination: ListPagination {
                page,
                limit,
                total_pages: stored.total.div_ceil(u64::from(limit)),
                total_count: stored.total,
            },
            commissions,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use commission_manager_core::{CurrencyCode, ProductDetails};

    use super::*;
    use crate::db::{MemoryStore, NewProductCommission};
    use crate::services::testing::{FakeCatalog, priced, shop};

    async fn write(store: &MemoryStore, product: u32, commission: Commission) {
        store
            .upsert_product_commission(
                &shop(),
                &NewProductCommission {
                    product_id: ProductGid::parse(&product.to_string()).unwrap(),
                    commission,
                    details: ProductDetails::unknown(),
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_list_enriches_with_live_price() {
        let store = MemoryStore::new();
        let catalog = FakeCatalog::new(vec![priced(1, "200")]);
        write(&store, 1, Commission::percentage(Decimal::from(10))).await;
        write(
            &store,
            2,
            Commission::fixed_amount(Decimal::from(30), CurrencyCode::parse("USD").unwrap()),
        )
        .await;

        let listing = CommissionLister::new(&store, &catalog)
            .list(&shop(), None, None)
            .await
            .unwrap();

        assert_eq!(listing.pagination.total_count, 2);
        assert_eq!(listing.pagination.total_pages, 1);
        assert_eq!(listing.pagination.limit, DEFAULT_LIMIT);

        let by_product: HashMap<&str, &EnrichedCommission> = listing
            .commissions
            .iter()
            .map(|c| (c.product_id.numeric_id(), c))
            .collect();

        let priced = by_product["1"];
        assert_eq!(priced.commission_amount, Decimal::from(20));
        assert_eq!(priced.product_title, "Product 1");
        assert_eq!(priced.currency_code, "USD");

        let missing = by_product["2"];
        assert_eq!(missing.commission_amount, Decimal::from(30));
        assert_eq!(missing.product_price, Decimal::ZERO);
        assert_eq!(missing.product_title, "Unknown Product");
        assert_eq!(missing.currency_code, "KES");
    }

    #[tokio::test]
    async fn test_list_clamps_paging() {
        let store = MemoryStore::new();
        let catalog = FakeCatalog::new(vec![]);
        for i in 1..=3 {
            write(&store, i, Commission::percentage(Decimal::ONE)).await;
        }

        let listing = CommissionLister::new(&store, &catalog)
            .list(&shop(), Some(0), Some(1000))
            .await
            .unwrap();
        assert_eq!(listing.pagination.page, 1);
        assert_eq!(listing.pagination.limit, MAX_LIMIT);

        let listing = CommissionLister::new(&store, &catalog)
            .list(&shop(), Some(2), Some(2))
            .await
            .unwrap();
        assert_eq!(listing.pagination.total_pages, 2);
        assert_eq!(listing.commissions.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_list_skips_catalog() {
        let store = MemoryStore::new();
        let catalog = FakeCatalog::new(vec![]).failing();

        let listing = CommissionLister::new(&store, &catalog)
            .list(&shop(), None, None)
            .await
            .unwrap();
        assert!(listing.commissions.is_empty());
        assert_eq!(listing.pagination.total_pages, 0);
    }
}
