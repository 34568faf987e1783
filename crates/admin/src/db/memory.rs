//! In-process store for tests and `STORE_BACKEND=memory`.
//!
//! Mirrors the `PostgreSQL` semantics: upserts are keyed on
//! `(shop, product)` / `(shop, collection)`, ids are allocated from a
//! counter, and listings are ordered newest first.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use commission_manager_core::{
    CollectionCommission, CollectionCommissionId, CollectionGid, Commission, CommissionId,
    ProductCommission, ProductGid, ShopDomain,
};
use secrecy::SecretString;
use tokio::sync::RwLock;

use super::{
    CommissionPage, CommissionStore, NewProductCommission, RepositoryError, Shop, ShopErasure,
    ShopStore, page_offset,
};

#[derive(Debug, Default)]
struct Tables {
    shops: HashMap<ShopDomain, Shop>,
    products: HashMap<(ShopDomain, ProductGid), ProductCommission>,
    collections: HashMap<(ShopDomain, CollectionGid), CollectionCommission>,
    next_product_id: i32,
    next_collection_id: i32,
}

impl Tables {
    fn shop_products(&self, shop: &ShopDomain) -> Vec<ProductCommission> {
        let mut records: Vec<_> = self
            .products
            .values()
            .filter(|r| &r.shop == shop)
            .cloned()
            .collect();
        records.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        records
    }
}

/// Store that keeps every table in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shop without an access token (install started, not finished).
    pub async fn insert_pending_shop(&self, shop: &ShopDomain) {
        let now = Utc::now();
        self.tables.write().await.shops.insert(
            shop.clone(),
            Shop {
                domain: shop.clone(),
                access_token: None,
                scope: String::new(),
                installed_at: now,
                updated_at: now,
            },
        );
    }
}

#[async_trait]
impl ShopStore for MemoryStore {
    async fn find_shop(&self, shop: &ShopDomain) -> Result<Option<Shop>, RepositoryError> {
        Ok(self.tables.read().await.shops.get(shop).cloned())
    }

    async fn save_shop_token(
        &self,
        shop: &ShopDomain,
        access_token: &SecretString,
        scope: &str,
    ) -> Result<Shop, RepositoryError> {
        let now = Utc::now();
        let mut tables = self.tables.write().await;
        let record = tables
            .shops
            .entry(shop.clone())
            .and_modify(|s| {
                s.access_token = Some(access_token.clone());
                s.scope = scope.to_string();
                s.updated_at = now;
            })
            .or_insert_with(|| Shop {
                domain: shop.clone(),
                access_token: Some(access_token.clone()),
                scope: scope.to_string(),
                installed_at: now,
                updated_at: now,
            });
        Ok(record.clone())
    }

    async fn delete_shop(&self, shop: &ShopDomain) -> Result<ShopErasure, RepositoryError> {
        let mut tables = self.tables.write().await;

        let products_before = tables.products.len();
        tables.products.retain(|(s, _), _| s != shop);
        let collections_before = tables.collections.len();
        tables.collections.retain(|(s, _), _| s != shop);

        Ok(ShopErasure {
            shop_deleted: tables.shops.remove(shop).is_some(),
            product_commissions: (products_before - tables.products.len()) as u64,
            collection_commissions: (collections_before - tables.collections.len()) as u64,
        })
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[async_trait]
impl CommissionStore for MemoryStore {
    async fn upsert_product_commission(
        &self,
        shop: &ShopDomain,
        input: &NewProductCommission,
    ) -> Result<ProductCommission, RepositoryError> {
        let now = Utc::now();
        let mut tables = self.tables.write().await;
        let key = (shop.clone(), input.product_id.clone());

        if let Some(record) = tables.products.get_mut(&key) {
            record.commission = input.commission.clone();
            record.product_title.clone_from(&input.details.title);
            record.product_handle.clone_from(&input.details.handle);
            record.product_link.clone_from(&input.details.link);
            record.updated_at = now;
            return Ok(record.clone());
        }

        tables.next_product_id += 1;
        let record = ProductCommission {
            id: CommissionId::new(tables.next_product_id),
            shop: shop.clone(),
            product_id: input.product_id.clone(),
            commission: input.commission.clone(),
            product_title: input.details.title.clone(),
            product_handle: input.details.handle.clone(),
            product_link: input.details.link.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.products.insert(key, record.clone());
        Ok(record)
    }

    async fn find_product_commission(
        &self,
        shop: &ShopDomain,
        product: &ProductGid,
    ) -> Result<Option<ProductCommission>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .get(&(shop.clone(), product.clone()))
            .cloned())
    }

    async fn find_product_commissions(
        &self,
        shop: &ShopDomain,
        products: &[ProductGid],
    ) -> Result<Vec<ProductCommission>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(products
            .iter()
            .filter_map(|p| tables.products.get(&(shop.clone(), p.clone())).cloned())
            .collect())
    }

    async fn delete_product_commission(
        &self,
        shop: &ShopDomain,
        id: CommissionId,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        let key = tables
            .products
            .iter()
            .find(|(_, r)| &r.shop == shop && r.id == id)
            .map(|(k, _)| k.clone());

        Ok(key.is_some_and(|k| tables.products.remove(&k).is_some()))
    }

    async fn delete_product_commission_for_product(
        &self,
        shop: &ShopDomain,
        product: &ProductGid,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .products
            .remove(&(shop.clone(), product.clone()))
            .is_some())
    }

    async fn list_product_commissions(
        &self,
        shop: &ShopDomain,
        page: u32,
        limit: u32,
    ) -> Result<CommissionPage, RepositoryError> {
        let all = self.tables.read().await.shop_products(shop);
        let total = all.len() as u64;
        let offset = usize::try_from(page_offset(page, limit)).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);

        Ok(CommissionPage {
            records: all.into_iter().skip(offset).take(limit).collect(),
            total,
        })
    }

    async fn list_all_product_commissions(
        &self,
        shop: &ShopDomain,
    ) -> Result<Vec<ProductCommission>, RepositoryError> {
        Ok(self.tables.read().await.shop_products(shop))
    }

    async fn upsert_collection_commission(
        &self,
        shop: &ShopDomain,
        collection: &CollectionGid,
        commission: &Commission,
    ) -> Result<CollectionCommission, RepositoryError> {
        let now = Utc::now();
        let mut tables = self.tables.write().await;
        let key = (shop.clone(), collection.clone());

        if let Some(record) = tables.collections.get_mut(&key) {
            record.commission = commission.clone();
            record.updated_at = now;
            return Ok(record.clone());
        }

        tables.next_collection_id += 1;
        let record = CollectionCommission {
            id: CollectionCommissionId::new(tables.next_collection_id),
            shop: shop.clone(),
            collection_id: collection.clone(),
            commission: commission.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.collections.insert(key, record.clone());
        Ok(record)
    }

    async fn find_collection_commissions(
        &self,
        shop: &ShopDomain,
        collections: &[CollectionGid],
    ) -> Result<Vec<CollectionCommission>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(collections
            .iter()
            .filter_map(|c| tables.collections.get(&(shop.clone(), c.clone())).cloned())
            .collect())
    }

    async fn list_collection_commissions(
        &self,
        shop: &ShopDomain,
    ) -> Result<Vec<CollectionCommission>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut records: Vec<_> = tables
            .collections
            .values()
            .filter(|r| &r.shop == shop)
            .cloned()
            .collect();
        records.sort_by(|a, b| (b.updated_at, b.id).cmp(&(a.updated_at, a.id)));
        Ok(records)
    }

    async fn delete_collection_commission(
        &self,
        shop: &ShopDomain,
        collection: &CollectionGid,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .collections
            .remove(&(shop.clone(), collection.clone()))
            .is_some())
    }
}
