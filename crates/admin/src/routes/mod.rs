//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                              - Liveness
//! GET    /health/ready                        - Readiness (store reachable)
//!
//! # OAuth install
//! GET    /api/auth?shop=                      - Redirect to Shopify consent
//! GET    /api/auth/callback                   - Verify, exchange code, store token
//!
//! # Commissions (all take ?shop=)
//! POST   /api/commissions                     - Set product commission or bulk apply
//! DELETE /api/commissions                     - Remove a commission
//! GET    /api/commissions/list?page&limit     - Paginated commissions with prices
//! GET    /api/commissions/overview            - Aggregate statistics
//!
//! # Catalog (all take ?shop=)
//! GET    /api/products?after&search           - Products with effective commission
//! GET    /api/collections?after&search        - Collections with standing commission
//! GET    /api/categories?search               - Derived categories
//!
//! # Privacy
//! GET    /api/privacy-policy                  - Data-retention document
//!
//! # Privacy webhooks (HMAC verified)
//! POST   /api/webhooks/customers/data_request
//! POST   /api/webhooks/customers/redact
//! POST   /api/webhooks/shop/redact
//! ```

pub mod auth;
pub mod catalog;
pub mod commissions;
pub mod health;
pub mod privacy;
pub mod webhooks;

use axum::Router;

use crate::state::AppState;

/// Build the complete router (without state or layers).
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(commissions::router())
        .merge(catalog::router())
        .merge(privacy::router())
        .merge(webhooks::router())
}
