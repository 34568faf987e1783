//! Session middleware configuration.
//!
//! Sessions only carry the OAuth `state` nonce between `/api/auth` and the
//! callback, so they are short-lived and `SameSite=Lax` (the callback is a
//! top-level redirect from Shopify).

use sqlx::PgPool;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::AppConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "cm_session";

/// Session expiry: 10 minutes of inactivity.
const SESSION_EXPIRY_SECONDS: i64 = 10 * 60;

/// Session layer backed by the `tower_sessions.session` table.
#[must_use]
pub fn postgres_session_layer(
    pool: &PgPool,
    config: &AppConfig,
) -> SessionManagerLayer<PostgresStore> {
    session_layer(PostgresStore::new(pool.clone()), config)
}

/// Session layer kept in process memory.
#[must_use]
pub fn memory_session_layer(config: &AppConfig) -> SessionManagerLayer<MemoryStore> {
    session_layer(MemoryStore::default(), config)
}

fn session_layer<S: SessionStore>(store: S, config: &AppConfig) -> SessionManagerLayer<S> {
    let is_secure = config.base_url.starts_with("https://");

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
