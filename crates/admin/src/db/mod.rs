//! Persistence for shops and commissions.
//!
//! # Tables
//!
//! - `shops` - Installed shops and their offline access tokens
//! - `product_commissions` - One commission per (shop, product)
//! - `collection_commissions` - Standing commission per (shop, collection)
//! - `tower_sessions.session` - OAuth state sessions (tower-sessions)
//!
//! # Backends
//!
//! [`PgStore`] is the production store. [`MemoryStore`] keeps everything in
//! process and backs tests and `STORE_BACKEND=memory`. Both implement
//! [`ShopStore`] and [`CommissionStore`]; handlers only see the traits.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p commission-manager-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use commission_manager_core::{
    CollectionCommission, CollectionGid, Commission, CommissionId, ProductCommission,
    ProductDetails, ProductGid, ShopDomain,
};
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// An installed shop.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct Shop {
    pub domain: ShopDomain,
    /// Offline access token; `None` until the OAuth install completes.
    pub access_token: Option<SecretString>,
    pub scope: String,
    pub installed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for Shop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shop")
            .field("domain", &self.domain)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("scope", &self.scope)
            .field("installed_at", &self.installed_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl Shop {
    /// The access token, if the shop completed OAuth.
    #[must_use]
    pub fn token(&self) -> Option<&SecretString> {
        self.access_token
            .as_ref()
            .filter(|t| !t.expose_secret().trim().is_empty())
    }
}

/// Input for a product commission upsert.
#[derive(Debug, Clone)]
pub struct NewProductCommission {
    pub product_id: ProductGid,
    pub commission: Commission,
    pub details: ProductDetails,
}

/// One page of product commissions, newest first.
#[derive(Debug, Clone)]
pub struct CommissionPage {
    pub records: Vec<ProductCommission>,
    pub total: u64,
}

/// What a shop erasure removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShopErasure {
    pub shop_deleted: bool,
    pub product_commissions: u64,
    pub collection_commissions: u64,
}

/// Shop records and their OAuth tokens.
#[async_trait]
pub trait ShopStore: Send + Sync {
    /// Look a shop up by domain.
    async fn find_shop(&self, shop: &ShopDomain) -> Result<Option<Shop>, RepositoryError>;

    /// Insert or refresh a shop's access token (install and re-install).
    async fn save_shop_token(
        &self,
        shop: &ShopDomain,
        access_token: &SecretString,
        scope: &str,
    ) -> Result<Shop, RepositoryError>;

    /// Remove a shop and every commission it owns. Unknown shops are a no-op.
    async fn delete_shop(&self, shop: &ShopDomain) -> Result<ShopErasure, RepositoryError>;

    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Product and collection commission records.
///
/// Upserts are last-write-wins per key; no optimistic concurrency.
#[async_trait]
pub trait CommissionStore: Send + Sync {
    /// Create or replace the commission for `(shop, product)`.
    async fn upsert_product_commission(
        &self,
        shop: &ShopDomain,
        input: &NewProductCommission,
    ) -> Result<ProductCommission, RepositoryError>;

    /// The commission for `(shop, product)`, if any.
    async fn find_product_commission(
        &self,
        shop: &ShopDomain,
        product: &ProductGid,
    ) -> Result<Option<ProductCommission>, RepositoryError>;

    /// Commissions for several products at once.
    async fn find_product_commissions(
        &self,
        shop: &ShopDomain,
        products: &[ProductGid],
    ) -> Result<Vec<ProductCommission>, RepositoryError>;

    /// Delete by record id. Returns whether a record was removed.
    async fn delete_product_commission(
        &self,
        shop: &ShopDomain,
        id: CommissionId,
    ) -> Result<bool, RepositoryError>;

    /// Delete by product id. Returns whether a record was removed.
    async fn delete_product_commission_for_product(
        &self,
        shop: &ShopDomain,
        product: &ProductGid,
    ) -> Result<bool, RepositoryError>;

    /// One page (1-based) of product commissions, newest `created_at` first.
    async fn list_product_commissions(
        &self,
        shop: &ShopDomain,
        page: u32,
        limit: u32,
    ) -> Result<CommissionPage, RepositoryError>;

    /// Every product commission of the shop.
    async fn list_all_product_commissions(
        &self,
        shop: &ShopDomain,
    ) -> Result<Vec<ProductCommission>, RepositoryError>;

    /// Create or replace the standing commission for `(shop, collection)`.
    async fn upsert_collection_commission(
        &self,
        shop: &ShopDomain,
        collection: &CollectionGid,
        commission: &Commission,
    ) -> Result<CollectionCommission, RepositoryError>;

    /// Standing commissions for the given collections.
    async fn find_collection_commissions(
        &self,
        shop: &ShopDomain,
        collections: &[CollectionGid],
    ) -> Result<Vec<CollectionCommission>, RepositoryError>;

    /// Every standing collection commission of the shop.
    async fn list_collection_commissions(
        &self,
        shop: &ShopDomain,
    ) -> Result<Vec<CollectionCommission>, RepositoryError>;

    /// Delete a standing collection commission. Returns whether one existed.
    async fn delete_collection_commission(
        &self,
        shop: &ShopDomain,
        collection: &CollectionGid,
    ) -> Result<bool, RepositoryError>;
}

/// Zero-based row offset for a 1-based page.
#[must_use]
pub fn page_offset(page: u32, limit: u32) -> u64 {
    u64::from(page.saturating_sub(1)) * u64::from(limit)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_page_offset() {
        assert_eq!(page_offset(1, 20), 0);
        assert_eq!(page_offset(3, 20), 40);
        assert_eq!(page_offset(0, 20), 0);
    }

    #[test]
    fn test_shop_debug_redacts_token() {
        let shop = Shop {
            domain: ShopDomain::parse("demo.myshopify.com").unwrap(),
            access_token: Some(SecretString::from("shpat_secret")),
            scope: "read_products".to_string(),
            installed_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let debug = format!("{shop:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("shpat_secret"));
    }
}
