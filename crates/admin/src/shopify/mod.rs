//! Shopify Admin API access for the commission app.
//!
//! # Architecture
//!
//! - [`Catalog`] is the read-only view of one shop's products and collections
//!   that the commission services depend on. Services never build a client
//!   themselves; they receive a `Catalog` from the [`CatalogProvider`] held in
//!   application state.
//! - [`AdminClient`] is the GraphQL implementation, bound to one shop's domain
//!   and access token.
//! - OAuth helpers and request signature checks live alongside the client.
//!
//! # Example
//!
//! ```rust,ignore
//! use commission_manager_admin::shopify::{Catalog, CatalogProvider};
//!
//! let catalog = state.catalogs().catalog_for(&shop.domain, &token);
//! let page = catalog.list_products_page(None, 50, Some("shoes")).await?;
//! ```

mod admin;
pub mod signature;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use commission_manager_core::{CollectionGid, ProductGid, ShopDomain};
use secrecy::SecretString;
use thiserror::Error;

pub use admin::{AdminClient, OAuthToken, ShopifyCatalogProvider, ShopifyOAuth};
pub use types::{CatalogCollection, CatalogProduct, CollectionMembers, Page, ProductPrice};

/// Failure talking to the Shopify Admin API.
#[derive(Debug, Error)]
pub enum ShopifyError {
    #[error("request to Shopify failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Shopify rejected the query: {}", join_messages(.0))]
    GraphQL(Vec<GraphQLError>),

    #[error("unreadable Shopify response: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field held a value we could not interpret (bad gid, price, ...).
    #[error("unexpected Shopify data: {0}")]
    InvalidData(String),

    #[error("missing in Shopify: {0}")]
    NotFound(String),

    /// Throttled; the payload is the `Retry-After` delay in seconds.
    #[error("throttled by Shopify for {0}s")]
    RateLimited(u64),

    /// The access token was revoked or never valid.
    #[error("Shopify refused the access token: {0}")]
    Unauthorized(String),

    #[error("OAuth exchange failed: {0}")]
    OAuth(String),
}

/// One entry of a GraphQL `errors` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphQLError {
    pub message: String,
    /// Response path the error applies to, e.g. `["product", "variants"]`.
    pub path: Vec<String>,
}

impl GraphQLError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
        }
    }
}

impl From<graphql_client::Error> for GraphQLError {
    fn from(error: graphql_client::Error) -> Self {
        Self {
            path: error
                .path
                .into_iter()
                .flatten()
                .map(|fragment| fragment.to_string())
                .collect(),
            message: error.message,
        }
    }
}

impl std::fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{} (at {})", self.message, self.path.join("."))
        }
    }
}

fn join_messages(errors: &[GraphQLError]) -> String {
    let mut joined = String::new();
    for (i, error) in errors.iter().enumerate() {
        if i > 0 {
            joined.push_str("; ");
        }
        joined.push_str(&error.to_string());
    }
    joined
}

/// Read-only access to one shop's catalog.
///
/// Every method is a single round trip (or a short fixed sequence of them);
/// pagination policy belongs to the caller.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// One page of products, optionally filtered by a Shopify search query.
    async fn list_products_page(
        &self,
        cursor: Option<&str>,
        page_size: u32,
        search: Option<&str>,
    ) -> Result<Page<CatalogProduct>, ShopifyError>;

    /// One page of product ids and prices for whole-catalog scans.
    ///
    /// Lighter than [`Catalog::list_products_page`], so pages can be larger.
    async fn list_product_prices_page(
        &self,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<Page<ProductPrice>, ShopifyError>;

    /// Products by id, without collection membership. Unknown or deleted
    /// ids are silently skipped.
    async fn get_products_by_ids(
        &self,
        ids: &[ProductGid],
    ) -> Result<Vec<CatalogProduct>, ShopifyError>;

    /// The first `page_size` products of a collection.
    ///
    /// Returns [`ShopifyError::NotFound`] when the collection does not exist.
    async fn list_collection_products(
        &self,
        collection: &CollectionGid,
        page_size: u32,
    ) -> Result<CollectionMembers, ShopifyError>;

    /// A single product, `None` if it does not exist.
    async fn get_product(&self, id: &ProductGid) -> Result<Option<CatalogProduct>, ShopifyError>;

    /// One page of collections, optionally filtered by a Shopify search query.
    async fn list_collections_page(
        &self,
        cursor: Option<&str>,
        page_size: u32,
        search: Option<&str>,
    ) -> Result<Page<CatalogCollection>, ShopifyError>;
}

/// Builds a [`Catalog`] for an authorized shop.
pub trait CatalogProvider: Send + Sync {
    /// Catalog bound to `shop`, authenticated with `access_token`.
    fn catalog_for(&self, shop: &ShopDomain, access_token: &SecretString) -> Arc<dyn Catalog>;
}
