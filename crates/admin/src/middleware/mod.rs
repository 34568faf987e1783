//! HTTP middleware and extractors.
//!
//! - `session` - tower-sessions layer holding the OAuth state nonce
//! - `shop` - `AuthorizedShop` extractor for shop-scoped routes

pub mod session;
pub mod shop;

pub use session::{SESSION_COOKIE_NAME, memory_session_layer, postgres_session_layer};
pub use shop::{AuthorizedShop, shop_param};
