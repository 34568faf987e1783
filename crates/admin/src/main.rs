//! Commission Manager - embedded Shopify app backend.
//!
//! # Architecture
//!
//! - Axum web framework, JSON API only
//! - Shopify Admin GraphQL API for catalog reads
//! - `PostgreSQL` (or in-process memory) for shops and commissions
//! - tower-sessions for the OAuth `state` nonce

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use commission_manager_admin::config::{AppConfig, StoreBackend};
use commission_manager_admin::db::{self, MemoryStore, PgStore};
use commission_manager_admin::middleware::{memory_session_layer, postgres_session_layer};
use commission_manager_admin::shopify::{ShopifyCatalogProvider, ShopifyOAuth};
use commission_manager_admin::state::AppState;
use commission_manager_admin::telemetry;
use secrecy::ExposeSecret;

/// Timeout applied to every Shopify request.
const SHOPIFY_TIMEOUT: Duration = Duration::from_secs(30);

/// How long in-flight requests may run after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Build state and router for the configured store backend.
async fn build_app(config: &AppConfig) -> Router {
    let http = reqwest::Client::builder()
        .timeout(SHOPIFY_TIMEOUT)
        .build()
        .expect("Failed to build HTTP client");
    let catalogs = Arc::new(ShopifyCatalogProvider::new(
        http.clone(),
        config.shopify.api_version.clone(),
    ));
    let oauth = ShopifyOAuth::new(http, &config.shopify);

    match config.store_backend {
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_ref()
                .expect("DATABASE_URL is required for the postgres store");
            let pool = db::create_pool(database_url)
                .await
                .expect("Failed to create database pool");

            // Migrations are applied by `cm-cli migrate`, never at startup.
            let session_layer = postgres_session_layer(&pool, config);
            let store = Arc::new(PgStore::new(pool));
            let state = AppState::new(config.clone(), store.clone(), store, catalogs, oauth);
            commission_manager_admin::app(state, session_layer)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            let session_layer = memory_session_layer(config);
            let store = Arc::new(MemoryStore::new());
            let state = AppState::new(config.clone(), store.clone(), store, catalogs, oauth);
            commission_manager_admin::app(state, session_layer)
        }
    }
}

/// Serve over TLS when a certificate is configured, plain TCP otherwise.
async fn serve(app: Router, config: &AppConfig) -> std::io::Result<()> {
    let addr = config.socket_addr();

    let Some(tls) = &config.tls else {
        tracing::info!(%addr, "Listening for HTTP");
        let listener = tokio::net::TcpListener::bind(addr).await?;
        return axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await;
    };

    let rustls = RustlsConfig::from_pem(
        tls.cert_pem.as_bytes().to_vec(),
        tls.key_pem.expose_secret().as_bytes().to_vec(),
    )
    .await?;

    let handle = Handle::new();
    tokio::spawn({
        let handle = handle.clone();
        async move {
            shutdown_signal().await;
            handle.graceful_shutdown(Some(DRAIN_TIMEOUT));
        }
    });

    tracing::info!(%addr, "Listening for HTTPS");
    axum_server::bind_rustls(addr, rustls)
        .handle(handle)
        .serve(app.into_make_service())
        .await
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown requested, draining connections");
}

#[tokio::main]
async fn main() {
    // Must precede any TLS use, including reqwest's.
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let config = AppConfig::from_env().expect("Failed to load configuration");

    let _sentry = telemetry::init_sentry(&config);
    telemetry::init_tracing();

    let app = build_app(&config)
        .await
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    serve(app, &config).await.expect("Server error");
}
