//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::{CommissionStore, ShopStore};
use crate::shopify::{CatalogProvider, ShopifyOAuth};

/// Application state shared across all handlers.
///
/// Cheap to clone; everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    shops: Arc<dyn ShopStore>,
    commissions: Arc<dyn CommissionStore>,
    catalogs: Arc<dyn CatalogProvider>,
    oauth: ShopifyOAuth,
}

impl AppState {
    /// Assemble application state.
    ///
    /// `shops` and `commissions` are usually the same store seen through
    /// two traits.
    #[must_use]
    pub fn new(
        config: AppConfig,
        shops: Arc<dyn ShopStore>,
        commissions: Arc<dyn CommissionStore>,
        catalogs: Arc<dyn CatalogProvider>,
        oauth: ShopifyOAuth,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                shops,
                commissions,
                catalogs,
                oauth,
            }),
        }
    }

    /// Application configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Installed shops and their tokens.
    #[must_use]
    pub fn shops(&self) -> &dyn ShopStore {
        self.inner.shops.as_ref()
    }

    /// Commission records.
    #[must_use]
    pub fn commissions(&self) -> &dyn CommissionStore {
        self.inner.commissions.as_ref()
    }

    /// Builds per-shop catalog clients.
    #[must_use]
    pub fn catalogs(&self) -> &dyn CatalogProvider {
        self.inner.catalogs.as_ref()
    }

    /// OAuth client for the install flow.
    #[must_use]
    pub fn oauth(&self) -> &ShopifyOAuth {
        &self.inner.oauth
    }
}
