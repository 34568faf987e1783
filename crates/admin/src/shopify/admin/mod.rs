//! Shopify Admin API GraphQL client.
//!
//! One [`AdminClient`] is bound to one shop and its offline access token.
//! Clients are cheap to build: they share the `reqwest::Client` (and its
//! connection pool) owned by [`ShopifyCatalogProvider`].

use std::sync::Arc;

use async_trait::async_trait;
use commission_manager_core::{CollectionGid, ProductGid, ShopDomain};
use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, de::DeserializeOwned};
use tracing::instrument;

use super::{
    Catalog, CatalogProvider, GraphQLError, ShopifyError,
    types::{CatalogCollection, CatalogProduct, CollectionMembers, Page, ProductPrice},
};

mod collections;
mod oauth;
mod products;
pub(crate) mod queries;

pub use oauth::{OAuthToken, ShopifyOAuth};

/// Shopify Admin API GraphQL client for one shop.
#[derive(Clone)]
pub struct AdminClient {
    inner: Arc<AdminClientInner>,
}

struct AdminClientInner {
    client: reqwest::Client,
    shop: ShopDomain,
    endpoint: String,
    access_token: SecretString,
}

impl std::fmt::Debug for AdminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminClient")
            .field("shop", &self.inner.shop)
            .field("endpoint", &self.inner.endpoint)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

impl AdminClient {
    /// Create a client for `shop` on the given API version.
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        shop: &ShopDomain,
        api_version: &str,
        access_token: SecretString,
    ) -> Self {
        let endpoint = format!("https://{shop}/admin/api/{api_version}/graphql.json");
        Self::with_endpoint(client, shop, endpoint, access_token)
    }

    /// Create a client that posts to an explicit GraphQL endpoint.
    #[must_use]
    pub fn with_endpoint(
        client: reqwest::Client,
        shop: &ShopDomain,
        endpoint: impl Into<String>,
        access_token: SecretString,
    ) -> Self {
        Self {
            inner: Arc::new(AdminClientInner {
                client,
                shop: shop.clone(),
                endpoint: endpoint.into(),
                access_token,
            }),
        }
    }

    /// The shop this client is bound to.
    #[must_use]
    pub fn shop(&self) -> &ShopDomain {
        &self.inner.shop
    }

    // =========================================================================
    // GraphQL Execution
    // =========================================================================

    /// Execute a GraphQL document and return its `data`.
    async fn execute<V, T>(
        &self,
        operation_name: &'static str,
        query: &'static str,
        variables: V,
    ) -> Result<T, ShopifyError>
    where
        V: Serialize + Send,
        T: DeserializeOwned,
    {
        let body = graphql_client::QueryBody {
            variables,
            query,
            operation_name,
        };

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .header("X-Shopify-Access-Token", self.inner.access_token.expose_secret())
            .json(&body)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(ShopifyError::RateLimited(retry_after));
        }

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ShopifyError::Unauthorized(
                "Invalid or expired access token".to_string(),
            ));
        }

        let response = response.error_for_status()?;
        let graphql_response: graphql_client::Response<T> = response.json().await?;

        if let Some(errors) = graphql_response.errors
            && !errors.is_empty()
        {
            return Err(ShopifyError::GraphQL(
                errors.into_iter().map(GraphQLError::from).collect(),
            ));
        }

        graphql_response
            .data
            .ok_or_else(|| ShopifyError::GraphQL(vec![GraphQLError::new("No data in response")]))
    }
}

#[async_trait]
impl Catalog for AdminClient {
    #[instrument(skip(self), fields(shop = %self.inner.shop))]
    async fn list_products_page(
        &self,
        cursor: Option<&str>,
        page_size: u32,
        search: Option<&str>,
    ) -> Result<Page<CatalogProduct>, ShopifyError> {
        self.products_page(cursor, page_size, search).await
    }

    #[instrument(skip(self), fields(shop = %self.inner.shop))]
    async fn list_product_prices_page(
        &self,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<Page<ProductPrice>, ShopifyError> {
        self.product_prices_page(cursor, page_size).await
    }

    #[instrument(skip(self, ids), fields(shop = %self.inner.shop, count = ids.len()))]
    async fn get_products_by_ids(
        &self,
        ids: &[ProductGid],
    ) -> Result<Vec<CatalogProduct>, ShopifyError> {
        self.products_by_ids(ids).await
    }

    #[instrument(skip(self), fields(shop = %self.inner.shop, collection_id = %collection))]
    async fn list_collection_products(
        &self,
        collection: &CollectionGid,
        page_size: u32,
    ) -> Result<CollectionMembers, ShopifyError> {
        self.collection_products(collection, page_size).await
    }

    #[instrument(skip(self), fields(shop = %self.inner.shop, product_id = %id))]
    async fn get_product(&self, id: &ProductGid) -> Result<Option<CatalogProduct>, ShopifyError> {
        self.product(id).await
    }

    #[instrument(skip(self), fields(shop = %self.inner.shop))]
    async fn list_collections_page(
        &self,
        cursor: Option<&str>,
        page_size: u32,
        search: Option<&str>,
    ) -> Result<Page<CatalogCollection>, ShopifyError> {
        self.collections_page(cursor, page_size, search).await
    }
}

/// Builds [`AdminClient`]s that share one HTTP connection pool.
#[derive(Debug, Clone)]
pub struct ShopifyCatalogProvider {
    client: reqwest::Client,
    api_version: String,
    endpoint_override: Option<String>,
}

impl ShopifyCatalogProvider {
    /// Provider for the given Admin API version.
    #[must_use]
    pub fn new(client: reqwest::Client, api_version: impl Into<String>) -> Self {
        Self {
            client,
            api_version: api_version.into(),
            endpoint_override: None,
        }
    }

    /// Send every query to `endpoint` instead of the shop's own host.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint_override = Some(endpoint.into());
        self
    }
}

impl CatalogProvider for ShopifyCatalogProvider {
    fn catalog_for(&self, shop: &ShopDomain, access_token: &SecretString) -> Arc<dyn Catalog> {
        let client = match &self.endpoint_override {
            Some(endpoint) => AdminClient::with_endpoint(
                self.client.clone(),
                shop,
                endpoint.clone(),
                access_token.clone(),
            ),
            None => AdminClient::new(
                self.client.clone(),
                shop,
                &self.api_version,
                access_token.clone(),
            ),
        };
        Arc::new(client)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_for_shop() {
        let shop = ShopDomain::parse("demo.myshopify.com").unwrap();
        let client = AdminClient::new(
            reqwest::Client::new(),
            &shop,
            "2025-01",
            SecretString::from("shpat_test"),
        );
        assert_eq!(
            client.inner.endpoint,
            "https://demo.myshopify.com/admin/api/2025-01/graphql.json"
        );
    }

    #[test]
    fn test_debug_redacts_token() {
        let shop = ShopDomain::parse("demo.myshopify.com").unwrap();
        let client = AdminClient::new(
            reqwest::Client::new(),
            &shop,
            "2025-01",
            SecretString::from("shpat_very_secret"),
        );
        let debug = format!("{client:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("shpat_very_secret"));
    }
}
