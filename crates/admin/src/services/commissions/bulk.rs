//! Apply one commission to every product in a collection or category.
//!
//! The member list is read from the catalog first; if that read fails nothing
//! is written. Writes are independent upserts issued with bounded
//! concurrency, so a failed write does not undo the others.

use std::collections::HashSet;

use commission_manager_core::{
    CategoryIndex, CollectionGid, Commission, ProductDetails, ProductGid, ShopDomain,
};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::instrument;

use super::CommissionServiceError;
use crate::db::{CommissionStore, NewProductCommission, RepositoryError};
use crate::services::catalog::scan_products;
use crate::shopify::{Catalog, CatalogProduct};

/// Products read from a collection for a bulk apply.
pub const COLLECTION_MEMBER_LIMIT: u32 = 100;

/// Page size of the catalog scan behind a category bulk apply.
pub const CATEGORY_PAGE_SIZE: u32 = 50;

/// Upper bound on products scanned for a category bulk apply.
pub const CATEGORY_SCAN_LIMIT: usize = 500;

/// What a bulk apply targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkScope {
    /// Every product of a collection.
    Collection(CollectionGid),
    /// Every product whose type equals the label exactly.
    Category(String),
}

impl BulkScope {
    const fn noun(&self) -> &'static str {
        match self {
            Self::Collection(_) => "collection",
            Self::Category(_) => "category",
        }
    }
}

/// Result of a bulk apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkApplyOutcome {
    pub updated_count: usize,
    pub failed_count: usize,
    pub scope_title: String,
    pub message: String,
}

/// Fans a commission out to the members of a scope.
pub struct BulkApplier<'a> {
    store: &'a dyn CommissionStore,
    catalog: &'a dyn Catalog,
    concurrency: usize,
}

impl<'a> BulkApplier<'a> {
    /// Create an applier issuing at most `concurrency` writes at a time.
    #[must_use]
    pub fn new(store: &'a dyn CommissionStore, catalog: &'a dyn Catalog, concurrency: usize) -> Self {
        Self {
            store,
            catalog,
            concurrency: concurrency.max(1),
        }
    }

    /// Write `commission` for every product in `scope`.
    ///
    /// # Errors
    ///
    /// Returns `CommissionServiceError::Catalog` if the member list cannot be
    /// read (no writes happen), or `CommissionServiceError::Repository` if
    /// every write failed.
    #[instrument(skip(self, commission), fields(shop = %shop, scope = ?scope))]
    pub async fn apply_to_scope(
        &self,
        shop: &ShopDomain,
        scope: &BulkScope,
        commission: &Commission,
    ) -> Result<BulkApplyOutcome, CommissionServiceError> {
        let (scope_title, members) = match scope {
            BulkScope::Collection(collection) => self.collection_members(collection).await?,
            BulkScope::Category(label) => (label.clone(), self.category_members(label).await?),
        };

        let targets: Vec<(ProductGid, ProductDetails)> = members
            .into_iter()
            .map(|p| {
                let details = ProductDetails::new(shop, p.title, p.handle);
                (p.id, details)
            })
            .collect();

        let (updated_count, mut failures) = self.write_all(shop, commission, targets).await;
        let failed_count = failures.len();

        if updated_count == 0 && !failures.is_empty() {
            return Err(failures.swap_remove(0).into());
        }

        let message = format!(
            "Applied {} commission to {updated_count} products in {} \"{scope_title}\"",
            commission.display(),
            scope.noun(),
        );

        tracing::info!(updated_count, failed_count, "Bulk commission applied");

        Ok(BulkApplyOutcome {
            updated_count,
            failed_count,
            scope_title,
            message,
        })
    }

    async fn collection_members(
        &self,
        collection: &CollectionGid,
    ) -> Result<(String, Vec<CatalogProduct>), CommissionServiceError> {
        let members = self
            .catalog
            .list_collection_products(collection, COLLECTION_MEMBER_LIMIT)
            .await?;
        Ok((members.title, members.products))
    }

    async fn category_members(
        &self,
        label: &str,
    ) -> Result<Vec<CatalogProduct>, CommissionServiceError> {
        let scanned =
            scan_products(self.catalog, CATEGORY_PAGE_SIZE, Some(CATEGORY_SCAN_LIMIT)).await?;

        let index = CategoryIndex::build(
            scanned
                .iter()
                .map(|p| (&p.id, p.product_type.as_deref())),
        );
        let wanted: HashSet<ProductGid> = index.members_exact(label).cloned().collect();

        tracing::debug!(
            scanned = index.len(),
            matched = wanted.len(),
            category = label,
            "Category scan complete"
        );

        Ok(scanned
            .into_iter()
            .filter(|p| wanted.contains(&p.id))
            .collect())
    }

    async fn write_all(
        &self,
        shop: &ShopDomain,
        commission: &Commission,
        targets: Vec<(ProductGid, ProductDetails)>,
    ) -> (usize, Vec<RepositoryError>) {
        let results: Vec<Result<(), (ProductGid, RepositoryError)>> = stream::iter(targets)
            .map(|(product_id, details)| async move {
                let input = NewProductCommission {
                    product_id,
                    commission: commission.clone(),
                    details,
                };
                self.store
                    .upsert_product_commission(shop, &input)
                    .await
                    .map(|_| ())
                    .map_err(|e| (input.product_id, e))
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut updated = 0;
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(()) => updated += 1,
                Err((product_id, e)) => {
                    tracing::warn!(%product_id, error = %e, "Bulk commission write failed");
                    failures.push(e);
                }
            }
        }
        (updated, failures)
    }
}
