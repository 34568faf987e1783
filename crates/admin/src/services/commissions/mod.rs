//! Commission resolution, writes, bulk apply, listing and statistics.
//!
//! Every service here borrows its collaborators: the [`CommissionStore`] from
//! application state and a [`Catalog`] built for the request's shop. Nothing
//! constructs a Shopify client on its own.

mod bulk;
mod error;
mod list;
mod stats;

use std::collections::{HashMap, HashSet};

use commission_manager_core::{
    CollectionCommission, CollectionGid, Commission, CommissionId, CommissionView,
    ProductCommission, ProductDetails, ProductGid, RawId, ShopDomain, resolve_precedence,
};
use tracing::instrument;

use crate::db::{CommissionStore, NewProductCommission, RepositoryError};
use crate::shopify::{Catalog, CatalogProduct};

pub use bulk::{
    BulkApplier, BulkApplyOutcome, BulkScope, CATEGORY_PAGE_SIZE, CATEGORY_SCAN_LIMIT,
    COLLECTION_MEMBER_LIMIT,
};
pub use error::CommissionServiceError;
pub use list::{CommissionLister, CommissionListing, EnrichedCommission, ListPagination, ListSummary};
pub use stats::{OVERVIEW_PAGE_SIZE, StatsAggregator};

// =============================================================================
// Resolution
// =============================================================================

/// Finds the effective commission for products.
pub struct CommissionResolver<'a> {
    store: &'a dyn CommissionStore,
}

impl<'a> CommissionResolver<'a> {
    /// Create a resolver over `store`.
    #[must_use]
    pub const fn new(store: &'a dyn CommissionStore) -> Self {
        Self { store }
    }

    /// Effective commission for one product.
    ///
    /// The product's own record wins; otherwise the most recently updated
    /// standing commission among `collection_ids` applies. `None` is a normal
    /// result.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be read.
    #[instrument(skip(self, collection_ids), fields(shop = %shop, product_id = %product))]
    pub async fn resolve(
        &self,
        shop: &ShopDomain,
        product: &ProductGid,
        collection_ids: &[CollectionGid],
    ) -> Result<Option<CommissionView>, RepositoryError> {
        if let Some(own) = self.store.find_product_commission(shop, product).await? {
            return Ok(resolve_precedence(Some(&own), &[]));
        }

        if collection_ids.is_empty() {
            return Ok(None);
        }

        let collections = self
            .store
            .find_collection_commissions(shop, collection_ids)
            .await?;
        Ok(resolve_precedence(None, &collections))
    }

    /// Effective commissions for a page of catalog products, in two queries.
    ///
    /// Products without any commission are absent from the map.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be read.
    pub async fn resolve_many(
        &self,
        shop: &ShopDomain,
        products: &[CatalogProduct],
    ) -> Result<HashMap<ProductGid, CommissionView>, RepositoryError> {
        let ids: Vec<ProductGid> = products.iter().map(|p| p.id.clone()).collect();
        let own: HashMap<ProductGid, ProductCommission> = self
            .store
            .find_product_commissions(shop, &ids)
            .await?
            .into_iter()
            .map(|r| (r.product_id.clone(), r))
            .collect();

        let collection_ids: Vec<CollectionGid> = products
            .iter()
            .filter(|p| !own.contains_key(&p.id))
            .flat_map(|p| p.collection_ids.iter().cloned())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let standing: Vec<CollectionCommission> = if collection_ids.is_empty() {
            Vec::new()
        } else {
            self.store
                .find_collection_commissions(shop, &collection_ids)
                .await?
        };

        let mut resolved = HashMap::with_capacity(products.len());
        for product in products {
            let matching: Vec<CollectionCommission> = standing
                .iter()
                .filter(|c| product.collection_ids.contains(&c.collection_id))
                .cloned()
                .collect();
            if let Some(view) = resolve_precedence(own.get(&product.id), &matching) {
                resolved.insert(product.id.clone(), view);
            }
        }
        Ok(resolved)
    }
}

// =============================================================================
// Single-record writes
// =============================================================================

/// What a `DELETE /api/commissions` call targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalTarget {
    /// A product commission by record id.
    Record(CommissionId),
    /// A product commission by product id.
    Product(ProductGid),
    /// A standing collection commission.
    Collection(CollectionGid),
    /// Categories have no standing record; removal is a no-op.
    Category(String),
}

impl RemovalTarget {
    /// Interpret a `{type, id}` removal request.
    ///
    /// For products the JSON type decides: a number is a record id, a string
    /// (gid or bare numeric id) is a product id. A string id therefore always
    /// means the same product it meant on `POST`.
    ///
    /// # Errors
    ///
    /// Returns [`CommissionServiceError::InvalidId`] for unknown types or
    /// unparseable ids.
    pub fn parse(kind: &str, id: &RawId) -> Result<Self, CommissionServiceError> {
        match kind {
            "product" => match id {
                RawId::Number(n) => i32::try_from(*n)
                    .map(|record| Self::Record(CommissionId::new(record)))
                    .map_err(|_| CommissionServiceError::InvalidId(format!("invalid record id {n}"))),
                RawId::Text(text) => Ok(Self::Product(ProductGid::parse(text)?)),
            },
            "collection" => Ok(Self::Collection(CollectionGid::parse(&id.as_text())?)),
            "category" => Ok(Self::Category(id.as_text())),
            other => Err(CommissionServiceError::InvalidId(format!(
                "unknown commission target type {other:?}"
            ))),
        }
    }
}

/// Creates, replaces and removes individual commission records.
pub struct CommissionService<'a> {
    store: &'a dyn CommissionStore,
    catalog: &'a dyn Catalog,
}

impl<'a> CommissionService<'a> {
    /// Create a commission service.
    #[must_use]
    pub const fn new(store: &'a dyn CommissionStore, catalog: &'a dyn Catalog) -> Self {
        Self { store, catalog }
    }

    /// Upsert the commission for one product.
    ///
    /// When `details` is `None` the product's title and handle are looked up
    /// in the catalog; if that fails the record is still written, with
    /// placeholder details.
    ///
    /// # Errors
    ///
    /// Returns `CommissionServiceError::Repository` if the write fails.
    #[instrument(skip(self, commission, details), fields(shop = %shop, product_id = %product))]
    pub async fn set_product_commission(
        &self,
        shop: &ShopDomain,
        product: &ProductGid,
        commission: &Commission,
        details: Option<ProductDetails>,
    ) -> Result<ProductCommission, CommissionServiceError> {
        let details = match details {
            Some(details) => details,
            None => self.lookup_details(shop, product).await,
        };

        let record = self
            .store
            .upsert_product_commission(
                shop,
                &NewProductCommission {
                    product_id: product.clone(),
                    commission: commission.clone(),
                    details,
                },
            )
            .await?;

        tracing::info!(
            commission = %record.commission.display(),
            record_id = %record.id,
            "Product commission saved"
        );
        Ok(record)
    }

    /// Upsert the standing commission for a collection.
    ///
    /// # Errors
    ///
    /// Returns `CommissionServiceError::Repository` if the write fails.
    #[instrument(skip(self, commission), fields(shop = %shop, collection_id = %collection))]
    pub async fn set_collection_commission(
        &self,
        shop: &ShopDomain,
        collection: &CollectionGid,
        commission: &Commission,
    ) -> Result<CollectionCommission, CommissionServiceError> {
        let record = self
            .store
            .upsert_collection_commission(shop, collection, commission)
            .await?;
        tracing::info!(commission = %record.commission.display(), "Collection commission saved");
        Ok(record)
    }

    /// Remove a commission. Returns whether a record existed.
    ///
    /// Removing something that does not exist is not an error.
    ///
    /// # Errors
    ///
    /// Returns `CommissionServiceError::Repository` if the delete fails.
    #[instrument(skip(self), fields(shop = %shop))]
    pub async fn remove(
        &self,
        shop: &ShopDomain,
        target: &RemovalTarget,
    ) -> Result<bool, CommissionServiceError> {
        let removed = match target {
            RemovalTarget::Record(id) => self.store.delete_product_commission(shop, *id).await?,
            RemovalTarget::Product(product) => {
                self.store
                    .delete_product_commission_for_product(shop, product)
                    .await?
            }
            RemovalTarget::Collection(collection) => {
                self.store
                    .delete_collection_commission(shop, collection)
                    .await?
            }
            RemovalTarget::Category(_) => false,
        };

        tracing::info!(removed, "Commission removal processed");
        Ok(removed)
    }

    async fn lookup_details(&self, shop: &ShopDomain, product: &ProductGid) -> ProductDetails {
        match self.catalog.get_product(product).await {
            Ok(Some(p)) => ProductDetails::new(shop, p.title, p.handle),
            Ok(None) => {
                tracing::warn!(product_id = %product, "Product not found in catalog");
                ProductDetails::unknown()
            }
            Err(e) => {
                tracing::warn!(product_id = %product, error = %e, "Product lookup failed");
                ProductDetails::unknown()
            }
        }
    }
}

/// Log commissions that are accepted but look like input mistakes.
pub fn warn_if_unusual(commission: &Commission) {
    match commission {
        Commission::Percentage { value }
            if value.is_sign_negative() || *value > rust_decimal::Decimal::ONE_HUNDRED =>
        {
            tracing::warn!(%value, "Percentage commission outside 0-100 accepted");
        }
        _ => {}
    }
}
