//! Commission overview for a shop.

use chrono::Utc;
use commission_manager_core::{CommissionStats, ProductGid, ShopDomain, StatsBuilder};
use rust_decimal::Decimal;
use tracing::instrument;

use super::CommissionServiceError;
use crate::db::CommissionStore;
use crate::shopify::Catalog;

/// Page size of the full catalog walk behind the overview. Price-only nodes
/// cost about 3 query points each.
pub const OVERVIEW_PAGE_SIZE: u32 = 250;

/// Computes [`CommissionStats`] from the store and the live catalog.
pub struct StatsAggregator<'a> {
    store: &'a dyn CommissionStore,
    catalog: &'a dyn Catalog,
}

impl<'a> StatsAggregator<'a> {
    /// Create a stats aggregator.
    #[must_use]
    pub const fn new(store: &'a dyn CommissionStore, catalog: &'a dyn Catalog) -> Self {
        Self { store, catalog }
    }

    /// Compute the overview.
    ///
    /// Walks the entire catalog to learn its size and prices. This is linear
    /// in catalog size on every call.
    ///
    /// # Errors
    ///
    /// Returns `CommissionServiceError::Catalog` if any catalog page fails and
    /// `CommissionServiceError::Repository` if the store cannot be read.
    #[instrument(skip(self), fields(shop = %shop))]
    pub async fn compute_overview(
        &self,
        shop: &ShopDomain,
    ) -> Result<CommissionStats, CommissionServiceError> {
        let builder = StatsBuilder::new(self.price_snapshot().await?);

        let commissions = self.store.list_all_product_commissions(shop).await?;
        let collection_commissions = self.store.list_collection_commissions(shop).await?.len();

        let stats = builder.build(&commissions, collection_commissions, Utc::now());

        tracing::info!(
            total_products = stats.total_products,
            total_commissions = stats.total_commissions,
            "Commission overview computed"
        );
        Ok(stats)
    }

    async fn price_snapshot(
        &self,
    ) -> Result<Vec<(ProductGid, Option<Decimal>)>, CommissionServiceError> {
        let mut snapshot = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self
                .catalog
                .list_product_prices_page(cursor.as_deref(), OVERVIEW_PAGE_SIZE)
                .await?;
            snapshot.extend(page.items.into_iter().map(|p| (p.id, p.price)));

            match page.next_cursor {
                Some(next) if page.has_more => cursor = Some(next),
                _ => break,
            }
        }

        Ok(snapshot)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use commission_manager_core::{Commission, CurrencyCode, ProductDetails};

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
    async fn test_overview_without_commissions() {
        let store = MemoryStore::new();
        let catalog = FakeCatalog::new(vec![priced(1, "100"), priced(2, "50")]);

        let stats = StatsAggregator::new(&store, &catalog)
            .compute_overview(&shop())
            .await
            .unwrap();

        assert_eq!(stats.total_commissions, 0);
        assert_eq!(stats.average_commission, Decimal::ZERO);
        assert!(stats.highest_commission.is_none());
        assert_eq!(stats.products_without_commissions, 2);
        assert!(!stats.summary.has_commissions);
    }

    #[tokio::test]
    async fn test_overview_prices_commissions_from_catalog() {
        let store = MemoryStore::new();
        let catalog = FakeCatalog::new(vec![priced(1, "200"), priced(2, "80"), priced(3, "10")]);

        write(&store, 1, Commission::percentage(Decimal::from(10))).await;
        write(
            &store,
            2,
            Commission::fixed_amount(Decimal::from(5), CurrencyCode::parse("KES").unwrap()),
        )
        .await;

        let stats = StatsAggregator::new(&store, &catalog)
            .compute_overview(&shop())
            .await
            .unwrap();

        assert_eq!(stats.total_commissions, 2);
        assert_eq!(stats.products_without_commissions, 1);
        assert_eq!(stats.total_potential_earnings, Decimal::from(25));
        assert_eq!(stats.average_commission, Decimal::from(10));
        assert_eq!(stats.percentage_commissions_count, 1);
        assert_eq!(stats.fixed_amount_commissions_count, 1);
    }

    #[tokio::test]
    async fn test_overview_walks_every_page() {
        let store = MemoryStore::new();
        let catalog = FakeCatalog::new((1..=600).map(|i| priced(i, "1")).collect());

        let stats = StatsAggregator::new(&store, &catalog)
            .compute_overview(&shop())
            .await
            .unwrap();

        assert_eq!(stats.total_products, 600);
        assert_eq!(catalog.price_page_calls(), 3);
        assert_eq!(catalog.product_page_calls(), 0);
    }

    #[tokio::test]
    async fn test_overview_catalog_failure_is_an_error() {
        let store = MemoryStore::new();
        let catalog = FakeCatalog::new(vec![]).failing();

        let result = StatsAggregator::new(&store, &catalog)
            .compute_overview(&shop())
            .await;
        assert!(matches!(result, Err(CommissionServiceError::Catalog(_))));
    }
}
