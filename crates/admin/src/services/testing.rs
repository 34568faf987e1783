//! In-process catalog and store doubles for tests.
//!
//! Enabled for this crate's unit tests and, through the `testing` feature,
//! for the integration tests. Pagination uses item offsets as cursors.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use commission_manager_core::{
    CollectionCommission, CollectionGid, Commission, CommissionId, CurrencyCode, ProductCommission,
    ProductGid, ShopDomain,
};
use rust_decimal::Decimal;
use secrecy::SecretString;

use crate::db::{
    CommissionPage, CommissionStore, MemoryStore, NewProductCommission, RepositoryError,
};

use crate::shopify::{
    Catalog, CatalogCollection, CatalogProduct, CatalogProvider, CollectionMembers, Page,
    ProductPrice, ShopifyError,
};

/// `demo.myshopify.com`.
///
/// # Panics
///
/// Never for this literal domain.
#[must_use]
#[allow(clippy::expect_used)]
pub fn shop() -> ShopDomain {
    ShopDomain::parse("demo.myshopify.com").expect("valid shop domain")
}

/// Product `n` with handle `p-n`.
///
/// # Panics
///
/// Never; any `u32` is a valid numeric id.
#[must_use]
#[allow(clippy::expect_used)]
pub fn product(n: u32, title: &str, product_type: Option<&str>) -> CatalogProduct {
    let id = ProductGid::parse(&n.to_string()).expect("numeric product id");
    let mut product = CatalogProduct::new(id, title, format!("p-{n}"));
    product.product_type = product_type.map(str::to_string);
    product
}

/// Product `n` titled `Product n`, priced in USD.
#[must_use]
pub fn priced(n: u32, price: &str) -> CatalogProduct {
    let mut product = product(n, &format!("Product {n}"), None);
    product.price = price.parse::<Decimal>().ok();
    product.currency = CurrencyCode::parse("USD").ok();
    product
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    Unavailable,
    Unauthorized,
}

impl Failure {
    fn error(self) -> ShopifyError {
        match self {
            Self::Unavailable => ShopifyError::InvalidData("catalog unavailable".to_string()),
            Self::Unauthorized => {
                ShopifyError::Unauthorized("Invalid or expired access token".to_string())
            }
        }
    }
}

/// Catalog backed by a fixed product list.
#[derive(Debug, Default)]
pub struct FakeCatalog {
    products: Vec<CatalogProduct>,
    collections: Vec<(CatalogCollection, Vec<ProductGid>)>,
    failure: Option<Failure>,
    product_page_calls: AtomicUsize,
    price_page_calls: AtomicUsize,
}

impl FakeCatalog {
    #[must_use]
    pub fn new(products: Vec<CatalogProduct>) -> Self {
        Self {
            products,
            ..Self::default()
        }
    }

    /// Add collection `n` whose members are products `members`.
    ///
    /// Member products also list the collection in `collection_ids`.
    ///
    /// # Panics
    ///
    /// Never; any `u32` is a valid numeric id.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_collection(mut self, n: u32, title: &str, members: &[u32]) -> Self {
        let id = CollectionGid::parse(&n.to_string()).expect("numeric collection id");
        let members: Vec<ProductGid> = members
            .iter()
            .filter_map(|m| ProductGid::parse(&m.to_string()).ok())
            .collect();
        for product in &mut self.products {
            if members.contains(&product.id) {
                product.collection_ids.push(id.clone());
            }
        }
        self.collections.push((
            CatalogCollection {
                id,
                title: title.to_string(),
                handle: title.to_lowercase(),
                products_count: members.len() as u64,
                image_url: None,
            },
            members,
        ));
        self
    }

    /// Every call fails as if Shopify were unreachable.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.failure = Some(Failure::Unavailable);
        self
    }

    /// Every call fails as if the stored token had been revoked.
    #[must_use]
    pub fn unauthorized(mut self) -> Self {
        self.failure = Some(Failure::Unauthorized);
        self
    }

    #[must_use]
    pub fn products(&self) -> &[CatalogProduct] {
        &self.products
    }

    /// Number of `list_products_page` calls so far.
    #[must_use]
    pub fn product_page_calls(&self) -> usize {
        self.product_page_calls.load(Ordering::SeqCst)
    }

    /// Number of `list_product_prices_page` calls so far.
    #[must_use]
    pub fn price_page_calls(&self) -> usize {
        self.price_page_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), ShopifyError> {
        self.failure.map_or(Ok(()), |f| Err(f.error()))
    }
}

fn paginate<T: Clone>(items: &[T], cursor: Option<&str>, page_size: u32) -> Page<T> {
    let start = cursor.and_then(|c| c.parse::<usize>().ok()).unwrap_or(0);
    let end = start.saturating_add(page_size as usize).min(items.len());
    let has_more = end < items.len();
    Page {
        items: items.get(start..end).unwrap_or_default().to_vec(),
        next_cursor: has_more.then(|| end.to_string()),
        has_more,
    }
}

fn matches_search(title: &str, search: Option<&str>) -> bool {
    search.is_none_or(|s| title.to_lowercase().contains(&s.to_lowercase()))
}

#[async_trait]
impl Catalog for FakeCatalog {
    async fn list_products_page(
        &self,
        cursor: Option<&str>,
        page_size: u32,
        search: Option<&str>,
    ) -> Result<Page<CatalogProduct>, ShopifyError> {
        self.product_page_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let matching: Vec<CatalogProduct> = self
            .products
            .iter()
            .filter(|p| matches_search(&p.title, search))
            .cloned()
            .collect();
        Ok(paginate(&matching, cursor, page_size))
    }

    async fn list_product_prices_page(
        &self,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<Page<ProductPrice>, ShopifyError> {
        self.price_page_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let prices: Vec<ProductPrice> = self.products.iter().map(ProductPrice::from).collect();
        Ok(paginate(&prices, cursor, page_size))
    }

    async fn get_products_by_ids(
        &self,
        ids: &[ProductGid],
    ) -> Result<Vec<CatalogProduct>, ShopifyError> {
        self.check()?;
        Ok(self
            .products
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn list_collection_products(
        &self,
        collection: &CollectionGid,
        page_size: u32,
    ) -> Result<CollectionMembers, ShopifyError> {
        self.check()?;
        let (found, members) = self
            .collections
            .iter()
            .find(|(c, _)| &c.id == collection)
            .ok_or_else(|| ShopifyError::NotFound(format!("collection {collection}")))?;
        Ok(CollectionMembers {
            title: found.title.clone(),
            products: self
                .products
                .iter()
                .filter(|p| members.contains(&p.id))
                .take(page_size as usize)
                .cloned()
                .collect(),
        })
    }

    async fn get_product(&self, id: &ProductGid) -> Result<Option<CatalogProduct>, ShopifyError> {
        self.check()?;
        Ok(self.products.iter().find(|p| &p.id == id).cloned())
    }

    async fn list_collections_page(
        &self,
        cursor: Option<&str>,
        page_size: u32,
        search: Option<&str>,
    ) -> Result<Page<CatalogCollection>, ShopifyError> {
        self.check()?;
        let collections: Vec<CatalogCollection> = self
            .collections
            .iter()
            .map(|(c, _)| c.clone())
            .filter(|c| matches_search(&c.title, search))
            .collect();
        Ok(paginate(&collections, cursor, page_size))
    }
}

/// Hands out the same [`FakeCatalog`] for every shop.
#[derive(Debug, Clone)]
pub struct FakeCatalogProvider {
    catalog: Arc<FakeCatalog>,
}

impl FakeCatalogProvider {
    #[must_use]
    pub const fn new(catalog: Arc<FakeCatalog>) -> Self {
        Self { catalog }
    }
}

impl CatalogProvider for FakeCatalogProvider {
    fn catalog_for(&self, _shop: &ShopDomain, _access_token: &SecretString) -> Arc<dyn Catalog> {
        self.catalog.clone()
    }
}

/// A [`MemoryStore`] whose product upserts fail for chosen products.
#[derive(Debug, Default)]
pub struct FailingWrites {
    inner: MemoryStore,
    rejected: Vec<ProductGid>,
}

impl FailingWrites {
    /// Upserts for products `rejected` fail; everything else reaches `inner`.
    #[must_use]
    pub fn new(inner: MemoryStore, rejected: &[u32]) -> Self {
        Self {
            inner,
            rejected: rejected
                .iter()
                .filter_map(|n| ProductGid::parse(&n.to_string()).ok())
                .collect(),
        }
    }

    #[must_use]
    pub const fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait]
impl CommissionStore for FailingWrites {
    async fn upsert_product_commission(
        &self,
        shop: &ShopDomain,
        input: &NewProductCommission,
    ) -> Result<ProductCommission, RepositoryError> {
        if self.rejected.contains(&input.product_id) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        self.inner.upsert_product_commission(shop, input).await
    }

    async fn find_product_commission(
        &self,
        shop: &ShopDomain,
        product: &ProductGid,
    ) -> Result<Option<ProductCommission>, RepositoryError> {
        self.inner.find_product_commission(shop, product).await
    }

    async fn find_product_commissions(
        &self,
        shop: &ShopDomain,
        products: &[ProductGid],
    ) -> Result<Vec<ProductCommission>, RepositoryError> {
        self.inner.find_product_commissions(shop, products).await
    }

    async fn delete_product_commission(
        &self,
        shop: &ShopDomain,
        id: CommissionId,
    ) -> Result<bool, RepositoryError> {
        self.inner.delete_product_commission(shop, id).await
    }

    async fn delete_product_commission_for_product(
        &self,
        shop: &ShopDomain,
        product: &ProductGid,
    ) -> Result<bool, RepositoryError> {
        self.inner
            .delete_product_commission_for_product(shop, product)
            .await
    }

    async fn list_product_commissions(
        &self,
        shop: &ShopDomain,
        page: u32,
        limit: u32,
    ) -> Result<CommissionPage, RepositoryError> {
        self.inner.list_product_commissions(shop, page, limit).await
    }

    async fn list_all_product_commissions(
        &self,
        shop: &ShopDomain,
    ) -> Result<Vec<ProductCommission>, RepositoryError> {
        self.inner.list_all_product_commissions(shop).await
    }

    async fn upsert_collection_commission(
        &self,
        shop: &ShopDomain,
        collection: &CollectionGid,
        commission: &Commission,
    ) -> Result<CollectionCommission, RepositoryError> {
        self.inner
            .upsert_collection_commission(shop, collection, commission)
            .await
    }

    async fn find_collection_commissions(
        &self,
        shop: &ShopDomain,
        collections: &[CollectionGid],
    ) -> Result<Vec<CollectionCommission>, RepositoryError> {
        self.inner.find_collection_commissions(shop, collections).await
    }

    async fn list_collection_commissions(
        &self,
        shop: &ShopDomain,
    ) -> Result<Vec<CollectionCommission>, RepositoryError> {
        self.inner.list_collection_commissions(shop).await
    }

    async fn delete_collection_commission(
        &self,
        shop: &ShopDomain,
        collection: &CollectionGid,
    ) -> Result<bool, RepositoryError> {
        self.inner.delete_collection_commission(shop, collection).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_pages_by_offset() {
        let catalog = FakeCatalog::new((1..=5).map(|i| product(i, "P", None)).collect());

        let first = catalog.list_products_page(None, 2, None).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.next_cursor.as_deref(), Some("2"));

        let last = catalog.list_products_page(Some("4"), 2, None).await.unwrap();
        assert_eq!(last.items.len(), 1);
        assert!(!last.has_more);
    }
}
