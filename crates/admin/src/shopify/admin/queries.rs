//! GraphQL documents for the Shopify Admin API and their response shapes.
//!
//! Documents are sent through `graphql_client::QueryBody`; response shapes
//! are plain serde structs converted into [`crate::shopify::types`] by the
//! `From`/`TryFrom` impls at the bottom of this file.

use std::str::FromStr;

use commission_manager_core::{CollectionGid, CurrencyCode, ProductGid};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::shopify::ShopifyError;
use crate::shopify::types::{CatalogCollection, CatalogProduct, ProductPrice};

// Shopify rejects any query whose requested cost exceeds 1000 points. Each
// object costs 1 and a connection costs 2 plus its `first` times the cost of
// one node, so page sizes and fragments below are chosen together:
//
//   CommissionProductSummary   ~4 per product
//   CommissionProductFields    ~16 per product (adds `collections(first: 10)`)
//
// Only the 50-per-page product listing and single-product reads carry
// collection membership.

macro_rules! product_summary {
    () => {
        r"
fragment CommissionProductSummary on Product {
  id
  title
  handle
  productType
  status
  featuredImage { url }
  priceRangeV2 { minVariantPrice { amount currencyCode } }
}
"
    };
}

macro_rules! product_fields {
    () => {
        concat!(
            r"
fragment CommissionProductFields on Product {
  ...CommissionProductSummary
  collections(first: 10) { nodes { id } }
}
",
            product_summary!()
        )
    };
}

// =============================================================================
// Documents
// =============================================================================

pub const PRODUCTS: &str = concat!(
    r"
query CommissionProducts($first: Int!, $after: String, $query: String) {
  products(first: $first, after: $after, query: $query) {
    nodes { ...CommissionProductFields }
    pageInfo { hasNextPage endCursor }
  }
}
",
    product_fields!()
);

pub const PRODUCT_PRICES: &str = r"
query CommissionProductPrices($first: Int!, $after: String) {
  products(first: $first, after: $after) {
    nodes {
      id
      priceRangeV2 { minVariantPrice { amount currencyCode } }
    }
    pageInfo { hasNextPage endCursor }
  }
}
";

pub const PRODUCTS_BY_IDS: &str = concat!(
    r"
query CommissionProductsByIds($ids: [ID!]!) {
  nodes(ids: $ids) {
    ... on Product { ...CommissionProductSummary }
  }
}
",
    product_summary!()
);

pub const PRODUCT: &str = concat!(
    r"
query CommissionProduct($id: ID!) {
  product(id: $id) { ...CommissionProductFields }
}
",
    product_fields!()
);

pub const COLLECTION_PRODUCTS: &str = r"
query CommissionCollectionProducts($id: ID!, $first: Int!) {
  collection(id: $id) {
    title
    products(first: $first) {
      nodes { id title handle }
    }
  }
}
";

pub const COLLECTIONS: &str = r"
query CommissionCollections($first: Int!, $after: String, $query: String) {
  collections(first: $first, after: $after, query: $query) {
    nodes {
      id
      title
      handle
      productsCount { count }
      image { url }
    }
    pageInfo { hasNextPage endCursor }
  }
}
";

// =============================================================================
// Variables
// =============================================================================

#[derive(Debug, Serialize)]
pub struct PageVariables<'a> {
    pub first: u32,
    pub after: Option<&'a str>,
    pub query: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct CursorVariables<'a> {
    pub first: u32,
    pub after: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct IdsVariables<'a> {
    pub ids: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct IdVariables<'a> {
    pub id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CollectionProductsVariables<'a> {
    pub id: &'a str,
    pub first: u32,
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    pub nodes: Vec<T>,
    pub page_info: Option<PageInfo>,
}

#[derive(Debug, Deserialize)]
pub struct IdNode {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct UrlNode {
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyV2 {
    pub amount: String,
    pub currency_code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRange {
    pub min_variant_price: MoneyV2,
}

/// Product node. Every field defaults so that non-product entries of a
/// `nodes(ids:)` lookup deserialize as an empty node instead of failing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductNode {
    pub id: Option<String>,
    pub title: String,
    pub handle: String,
    pub product_type: Option<String>,
    pub status: Option<String>,
    pub featured_image: Option<UrlNode>,
    pub price_range_v2: Option<PriceRange>,
    pub collections: Option<Connection<IdNode>>,
}

#[derive(Debug, Deserialize)]
pub struct ProductsData {
    pub products: Connection<ProductNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceNode {
    pub id: String,
    pub price_range_v2: Option<PriceRange>,
}

#[derive(Debug, Deserialize)]
pub struct ProductPricesData {
    pub products: Connection<PriceNode>,
}

#[derive(Debug, Deserialize)]
pub struct NodesData {
    pub nodes: Vec<Option<ProductNode>>,
}

#[derive(Debug, Deserialize)]
pub struct ProductData {
    pub product: Option<ProductNode>,
}

#[derive(Debug, Deserialize)]
pub struct CollectionWithProducts {
    pub title: String,
    pub products: Connection<ProductNode>,
}

#[derive(Debug, Deserialize)]
pub struct CollectionProductsData {
    pub collection: Option<CollectionWithProducts>,
}

#[derive(Debug, Deserialize)]
pub struct Count {
    pub count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionNode {
    pub id: String,
    pub title: String,
    pub handle: String,
    pub products_count: Option<Count>,
    pub image: Option<UrlNode>,
}

#[derive(Debug, Deserialize)]
pub struct CollectionsData {
    pub collections: Connection<CollectionNode>,
}

// =============================================================================
// Conversions
// =============================================================================

fn invalid(what: &str, err: impl std::fmt::Display) -> ShopifyError {
    ShopifyError::InvalidData(format!("{what}: {err}"))
}

type Money = (Option<Decimal>, Option<CurrencyCode>);

fn min_price(range: Option<PriceRange>) -> Result<Money, ShopifyError> {
    let Some(range) = range else {
        return Ok((None, None));
    };
    let money = range.min_variant_price;
    let price = Decimal::from_str(&money.amount).map_err(|e| invalid("price", e))?;
    let currency = CurrencyCode::parse(&money.currency_code).map_err(|e| invalid("currency", e))?;
    Ok((Some(price), Some(currency)))
}

impl TryFrom<PriceNode> for ProductPrice {
    type Error = ShopifyError;

    fn try_from(node: PriceNode) -> Result<Self, Self::Error> {
        let (price, currency) = min_price(node.price_range_v2)?;
        Ok(Self {
            id: ProductGid::parse(&node.id).map_err(|e| invalid("product id", e))?,
            price,
            currency,
        })
    }
}

impl TryFrom<ProductNode> for CatalogProduct {
    type Error = ShopifyError;

    fn try_from(node: ProductNode) -> Result<Self, Self::Error> {
        let raw_id = node
            .id
            .ok_or_else(|| ShopifyError::InvalidData("product node without id".to_string()))?;
        let id = ProductGid::parse(&raw_id).map_err(|e| invalid("product id", e))?;

        let (price, currency) = min_price(node.price_range_v2)?;

        let collection_ids = node
            .collections
            .map(|c| c.nodes)
            .unwrap_or_default()
            .into_iter()
            .map(|n| CollectionGid::parse(&n.id).map_err(|e| invalid("collection id", e)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id,
            title: node.title,
            handle: node.handle,
            product_type: node.product_type.filter(|t| !t.trim().is_empty()),
            status: node.status,
            price,
            currency,
            image_url: node.featured_image.map(|i| i.url),
            collection_ids,
        })
    }
}

impl TryFrom<CollectionNode> for CatalogCollection {
    type Error = ShopifyError;

    fn try_from(node: CollectionNode) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CollectionGid::parse(&node.id).map_err(|e| invalid("collection id", e))?,
            title: node.title,
            handle: node.handle,
            products_count: node.products_count.map_or(0, |c| c.count),
            image_url: node.image.map(|i| i.url),
        })
    }
}
