//! Catalog listings shown in the commission screens.
//!
//! Product and collection pages come straight from Shopify and are annotated
//! with the commission that applies to each entry. Categories are derived
//! from a bounded catalog scan.

use commission_manager_core::{Category, CategoryIndex, CommissionView, ShopDomain};
use serde::Serialize;
use tracing::instrument;

use super::commissions::{CATEGORY_PAGE_SIZE, CATEGORY_SCAN_LIMIT, CommissionResolver};
use super::CommissionServiceError;
use crate::db::CommissionStore;
use crate::shopify::{Catalog, CatalogCollection, CatalogProduct, Page, ShopifyError};

/// Products per page in the product listing.
pub const PRODUCT_PAGE_SIZE: u32 = 50;

/// Collections per page in the collection listing.
pub const COLLECTION_PAGE_SIZE: u32 = 50;

/// Read catalog pages until the catalog ends or `cap` products were read.
///
/// The result is truncated to `cap`. Any page failure aborts the scan.
///
/// # Errors
///
/// Returns the first `ShopifyError` encountered.
pub async fn scan_products(
    catalog: &dyn Catalog,
    page_size: u32,
    cap: Option<usize>,
) -> Result<Vec<CatalogProduct>, ShopifyError> {
    let mut scanned: Vec<CatalogProduct> = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = catalog
            .list_products_page(cursor.as_deref(), page_size, None)
            .await?;
        scanned.extend(page.items);

        if cap.is_some_and(|cap| scanned.len() >= cap) {
            break;
        }
        match page.next_cursor {
            Some(next) if page.has_more => cursor = Some(next),
            _ => break,
        }
    }

    if let Some(cap) = cap {
        scanned.truncate(cap);
    }
    Ok(scanned)
}

/// Cursor state echoed back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

impl<T> From<&Page<T>> for PageInfo {
    fn from(page: &Page<T>) -> Self {
        Self {
            has_next_page: page.has_more,
            end_cursor: page.next_cursor.clone(),
        }
    }
}

/// A product row with its storefront link and effective commission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedProduct {
    #[serde(flatten)]
    pub product: CatalogProduct,
    pub link: String,
    pub commission: Option<CommissionView>,
}

/// Response body of `GET /api/products`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListing {
    pub products: Vec<ListedProduct>,
    pub page_info: PageInfo,
}

/// A collection row with its standing commission, if one was saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedCollection {
    #[serde(flatten)]
    pub collection: CatalogCollection,
    pub commission: Option<CommissionView>,
}

/// Response body of `GET /api/collections`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionListing {
    pub collections: Vec<ListedCollection>,
    pub page_info: PageInfo,
}

/// Response body of `GET /api/categories`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryListing {
    pub categories: Vec<Category>,
    pub total_categories: usize,
}

/// Builds the catalog listings.
pub struct CatalogService<'a> {
    store: &'a dyn CommissionStore,
    catalog: &'a dyn Catalog,
}

impl<'a> CatalogService<'a> {
    /// Create a catalog service.
    #[must_use]
    pub const fn new(store: &'a dyn CommissionStore, catalog: &'a dyn Catalog) -> Self {
        Self { store, catalog }
    }

    /// One page of products with their effective commissions.
    ///
    /// # Errors
    ///
    /// Returns `CommissionServiceError::Catalog` if the page cannot be read and
    /// `CommissionServiceError::Repository` if commissions cannot be resolved.
    #[instrument(skip(self), fields(shop = %shop))]
    pub async fn products(
        &self,
        shop: &ShopDomain,
        after: Option<&str>,
        search: Option<&str>,
    ) -> Result<ProductListing, CommissionServiceError> {
        let page = self
            .catalog
            .list_products_page(after, PRODUCT_PAGE_SIZE, search)
            .await?;
        let page_info = PageInfo::from(&page);

        let mut resolved = CommissionResolver::new(self.store)
            .resolve_many(shop, &page.items)
            .await?;

        let products = page
            .items
            .into_iter()
            .map(|product| ListedProduct {
                link: shop.product_link(&product.handle),
                commission: resolved.remove(&product.id),
                product,
            })
            .collect();

        Ok(ProductListing {
            products,
            page_info,
        })
    }

    /// One page of collections with their standing commissions.
    ///
    /// # Errors
    ///
    /// Returns `CommissionServiceError::Catalog` if the page cannot be read and
    /// `CommissionServiceError::Repository` if the store cannot be read.
    #[instrument(skip(self), fields(shop = %shop))]
    pub async fn collections(
        &self,
        shop: &ShopDomain,
        after: Option<&str>,
        search: Option<&str>,
    ) -> Result<CollectionListing, CommissionServiceError> {
        let page = self
            .catalog
            .list_collections_page(after, COLLECTION_PAGE_SIZE, search)
            .await?;
        let page_info = PageInfo::from(&page);

        let ids: Vec<_> = page.items.iter().map(|c| c.id.clone()).collect();
        let standing = self.store.find_collection_commissions(shop, &ids).await?;

        let collections = page
            .items
            .into_iter()
            .map(|collection| ListedCollection {
                commission: standing
                    .iter()
                    .find(|s| s.collection_id == collection.id)
                    .map(CommissionView::from),
                collection,
            })
            .collect();

        Ok(CollectionListing {
            collections,
            page_info,
        })
    }

    /// Categories derived from the first 500 products.
    ///
    /// # Errors
    ///
    /// Returns `CommissionServiceError::Catalog` if the scan fails.
    #[instrument(skip(self))]
    pub async fn categories(
        &self,
        search: Option<&str>,
    ) -> Result<CategoryListing, CommissionServiceError> {
        let scanned =
            scan_products(self.catalog, CATEGORY_PAGE_SIZE, Some(CATEGORY_SCAN_LIMIT)).await?;
        let index = CategoryIndex::build(scanned.iter().map(|p| (&p.id, p.product_type.as_deref())));
        let categories = index.categories(search);

        Ok(CategoryListing {
            total_categories: categories.len(),
            categories,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use commission_manager_core::{CollectionGid, Commission, ProductDetails};
    use rust_decimal::Decimal;

    use super::*;
    use crate::db::{MemoryStore, NewProductCommission};
    use crate::services::testing::{FakeCatalog, product, shop};

    #[tokio::test]
    async fn test_scan_respects_cap() {
        let catalog = FakeCatalog::new((1..=700).map(|i| product(i, "P", None)).collect());
        let scanned = scan_products(&catalog, 50, Some(500)).await.unwrap();
        assert_eq!(scanned.len(), 500);
        assert_eq!(catalog.product_page_calls(), 10);
    }

    #[tokio::test]
    async fn test_products_page_carries_commission_and_link() {
        let store = MemoryStore::new();
        let catalog = FakeCatalog::new(vec![product(1, "Shoe", None), product(2, "Hat", None)]);
        store
            .upsert_product_commission(
                &shop(),
                &NewProductCommission {
                    product_id: catalog.products()[0].id.clone(),
                    commission: Commission::percentage(Decimal::from(7)),
                    details: ProductDetails::unknown(),
                },
            )
            .await
            .unwrap();

        let listing = CatalogService::new(&store, &catalog)
            .products(&shop(), None, None)
            .await
            .unwrap();

        assert_eq!(listing.products.len(), 2);
        assert_eq!(listing.products[0].link, "https://demo.myshopify.com/products/p-1");
        assert!(listing.products[0].commission.is_some());
        assert!(listing.products[1].commission.is_none());
        assert!(!listing.page_info.has_next_page);
    }

    #[tokio::test]
    async fn test_collections_page_shows_standing_commission() {
        let store = MemoryStore::new();
        let catalog = FakeCatalog::new(vec![])
            .with_collection(1, "Summer", &[])
            .with_collection(2, "Winter", &[]);
        store
            .upsert_collection_commission(
                &shop(),
                &CollectionGid::parse("2").unwrap(),
                &Commission::percentage(Decimal::from(4)),
            )
            .await
            .unwrap();

        let listing = CatalogService::new(&store, &catalog)
            .collections(&shop(), None, None)
            .await
            .unwrap();

        assert!(listing.collections[0].commission.is_none());
        assert_eq!(
            listing.collections[1].commission.as_ref().unwrap().commission.value(),
            Decimal::from(4)
        );
    }

    #[tokio::test]
    async fn test_categories_group_case_insensitively() {
        let store = MemoryStore::new();
        let catalog = FakeCatalog::new(vec![
            product(1, "A", Some("Shoes")),
            product(2, "B", Some("shoes")),
            product(3, "C", None),
        ]);

        let listing = CatalogService::new(&store, &catalog)
            .categories(None)
            .await
            .unwrap();

        assert_eq!(listing.total_categories, 2);
        assert_eq!(listing.categories[0].name, "Shoes");
        assert_eq!(listing.categories[0].product_count, 2);
        assert_eq!(listing.categories[1].name, "Uncategorized");
    }
}
