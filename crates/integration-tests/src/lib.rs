//! Integration tests for Commission Manager.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p commission-manager-integration-tests
//! ```
//!
//! Everything runs in process: the router is driven with
//! `tower::ServiceExt::oneshot` against the in-memory store and a fake
//! catalog, and the GraphQL client is pointed at a `wiremock` server.
//!
//! # Test Categories
//!
//! - `commissions_api` - Commission writes, resolution, listing, overview
//! - `catalog_api` - Product, collection and category listings
//! - `auth_api` - Health, OAuth install flow, shop authorization
//! - `webhooks_api` - Privacy webhooks and signature checks
//! - `shopify_client` - Admin GraphQL client against a mock server

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use commission_manager_admin::config::{AppConfig, ShopifyAppConfig, StoreBackend};
use commission_manager_admin::db::{MemoryStore, ShopStore};
use commission_manager_admin::middleware::memory_session_layer;
use commission_manager_admin::services::testing::{FakeCatalog, FakeCatalogProvider};
use commission_manager_admin::shopify::ShopifyOAuth;
use commission_manager_admin::shopify::signature::sign_webhook;
use commission_manager_admin::state::AppState;
use commission_manager_core::ShopDomain;
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

pub use commission_manager_admin::services::testing::{priced, product};

/// Shop installed by [`TestApp::new`].
pub const SHOP: &str = "demo.myshopify.com";

/// App client secret used to sign OAuth callbacks.
pub const API_SECRET: &str = "kX9#mP2$vL7@nQ4!";

/// Webhook signing secret.
pub const WEBHOOK_SECRET: &str = "wH3&jR8*tY5^cF1%";

/// Configuration for an in-memory app.
#[must_use]
pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: None,
        store_backend: StoreBackend::Memory,
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "https://commissions.test".to_string(),
        shopify: ShopifyAppConfig {
            api_version: "2025-01".to_string(),
            api_key: "test-client-id".to_string(),
            api_secret: SecretString::from(API_SECRET),
            webhook_secret: SecretString::from(WEBHOOK_SECRET),
            scopes: "read_products".to_string(),
        },
        bulk_write_concurrency: 4,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
        tls: None,
    }
}

/// The installed test shop.
///
/// # Panics
///
/// If [`SHOP`] stops being a valid domain.
#[must_use]
#[allow(clippy::expect_used)]
pub fn shop() -> ShopDomain {
    ShopDomain::parse(SHOP).expect("SHOP is a valid domain")
}

/// An in-process app with its store and catalog exposed for assertions.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub catalog: Arc<FakeCatalog>,
}

impl TestApp {
    /// App with [`SHOP`] installed.
    ///
    /// # Panics
    ///
    /// Panics if the in-memory store rejects the install.
    pub async fn new(catalog: FakeCatalog) -> Self {
        let app = Self::uninstalled(catalog);
        app.store
            .save_shop_token(&shop(), &SecretString::from("shpat_test"), "read_products")
            .await
            .expect("install test shop");
        app
    }

    /// App with no shop installed.
    #[must_use]
    pub fn uninstalled(catalog: FakeCatalog) -> Self {
        Self::with_oauth(catalog, None)
    }

    /// App whose OAuth client talks to `oauth_base` instead of the shop.
    #[must_use]
    pub fn with_oauth(catalog: FakeCatalog, oauth_base: Option<String>) -> Self {
        let config = test_config();
        let store = Arc::new(MemoryStore::new());
        let catalog = Arc::new(catalog);

        let mut oauth = ShopifyOAuth::new(reqwest::Client::new(), &config.shopify);
        if let Some(base) = oauth_base {
            oauth = oauth.with_base_url(base);
        }

        let session_layer = memory_session_layer(&config);
        let state = AppState::new(
            config,
            store.clone(),
            store.clone(),
            Arc::new(FakeCatalogProvider::new(catalog.clone())),
            oauth,
        );

        Self {
            router: commission_manager_admin::app(state, session_layer),
            store,
            catalog,
        }
    }

    /// Send a request and return the status and JSON body.
    ///
    /// Non-JSON bodies come back as a JSON string; empty bodies as `null`.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let request = builder.body(body).expect("build request");
        self.send(request).await
    }

    /// `GET uri`.
    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    /// `POST uri` with a JSON body.
    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }

    /// `DELETE uri` with a JSON body.
    pub async fn delete(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(body)).await
    }

    /// Post a webhook body signed with `secret`.
    pub async fn webhook(&self, path: &str, body: &Value, secret: &str) -> (StatusCode, Value) {
        let raw = body.to_string();
        let signature = sign_webhook(raw.as_bytes(), &SecretString::from(secret.to_string()));
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .header("X-Shopify-Hmac-Sha256", signature)
            .body(Body::from(raw))
            .expect("build request");
        self.send(request).await
    }

    /// Send a prepared request.
    ///
    /// # Panics
    ///
    /// Panics if the router fails or the body cannot be read.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }
}

/// `path?shop=demo.myshopify.com`, keeping any existing query.
#[must_use]
pub fn with_shop(path: &str) -> String {
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{path}{separator}shop={SHOP}")
}
