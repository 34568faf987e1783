//! Catalog types returned by [`Catalog`](super::Catalog).
//!
//! These are the app's view of Shopify data, decoupled from the raw GraphQL
//! response shapes in `admin::queries`.

use commission_manager_core::{CollectionGid, CurrencyCode, ProductGid};
use rust_decimal::Decimal;
use serde::Serialize;

/// A product as seen by the commission app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProduct {
    pub id: ProductGid,
    pub title: String,
    pub handle: String,
    /// Free-text product type; the source of derived categories.
    pub product_type: Option<String>,
    pub status: Option<String>,
    /// Minimum variant price.
    #[serde(with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    pub currency: Option<CurrencyCode>,
    pub image_url: Option<String>,
    /// Collections the product belongs to (first page only).
    pub collection_ids: Vec<CollectionGid>,
}

impl CatalogProduct {
    /// A product with only identity fields set.
    #[must_use]
    pub fn new(id: ProductGid, title: impl Into<String>, handle: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            handle: handle.into(),
            product_type: None,
            status: None,
            price: None,
            currency: None,
            image_url: None,
            collection_ids: Vec::new(),
        }
    }
}

/// Identity and minimum price of a product, read by whole-catalog scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductPrice {
    pub id: ProductGid,
    pub price: Option<Decimal>,
    pub currency: Option<CurrencyCode>,
}

impl From<&CatalogProduct> for ProductPrice {
    fn from(product: &CatalogProduct) -> Self {
        Self {
            id: product.id.clone(),
            price: product.price,
            currency: product.currency.clone(),
        }
    }
}

/// A collection as seen by the commission app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogCollection {
    pub id: CollectionGid,
    pub title: String,
    pub handle: String,
    pub products_count: u64,
    pub image_url: Option<String>,
}

/// Products of one collection, capped at the requested page size.
///
/// Members carry identity fields only (id, title, handle).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionMembers {
    pub title: String,
    pub products: Vec<CatalogProduct>,
}

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}
