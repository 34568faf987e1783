//! Application configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string (not needed with `STORE_BACKEND=memory`)
//! - `APP_BASE_URL` - Public URL of the app, used for the OAuth redirect
//! - `SHOPIFY_API_KEY` - Shopify app client ID
//! - `SHOPIFY_API_SECRET` - Shopify app client secret (high entropy)
//!
//! ## Optional
//! - `APP_HOST` - Bind address (default: 127.0.0.1)
//! - `APP_PORT` - Listen port (default: 3000)
//! - `SHOPIFY_API_VERSION` - API version (default: 2025-01)
//! - `SHOPIFY_SCOPES` - OAuth scopes (default: `read_products`)
//! - `SHOPIFY_WEBHOOK_SECRET` - Webhook signing secret (default: the API secret)
//! - `STORE_BACKEND` - `postgres` or `memory` (default: postgres)
//! - `BULK_WRITE_CONCURRENCY` - Concurrent writes during bulk apply (default: 16)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//!
//! ## Optional (TLS)
//! - `APP_TLS_CERT` - PEM-encoded certificate chain
//! - `APP_TLS_KEY` - PEM-encoded private key

use std::collections::HashMap;
use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_API_VERSION: &str = "2025-01";
const DEFAULT_SCOPES: &str = "read_products";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_BULK_WRITE_CONCURRENCY: usize = 16;

/// Secrets below this many bits of entropy per character are rejected.
const MIN_SECRET_ENTROPY: f64 = 3.3;

/// Fragments that mark a copied-in sample value rather than a real secret.
const PLACEHOLDERS: &[&str] = &[
    "your-",
    "your_",
    "changeme",
    "placeholder",
    "example",
    "secret",
    "replace",
    "xxx",
    "todo",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Which persistence layer backs the commission store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// `PostgreSQL` through sqlx.
    #[default]
    Postgres,
    /// Process-local maps. Data is lost on restart.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("expected 'postgres' or 'memory', got '{other}'")),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `PostgreSQL` connection URL (contains password). `None` for the memory backend.
    pub database_url: Option<SecretString>,
    pub store_backend: StoreBackend,
    /// IP address to bind the server to
    pub host: IpAddr,
    pub port: u16,
    /// Public base URL of the app, without a trailing slash
    pub base_url: String,
    pub shopify: ShopifyAppConfig,
    /// Maximum concurrent commission writes during a bulk apply
    pub bulk_write_concurrency: usize,
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
    /// Serve HTTPS when set
    pub tls: Option<TlsConfig>,
}

/// Shopify app credentials.
#[derive(Clone)]
pub struct ShopifyAppConfig {
    /// Admin API version (e.g., 2025-01)
    pub api_version: String,
    /// OAuth client ID
    pub api_key: String,
    /// OAuth client secret, also used to sign the OAuth callback query
    pub api_secret: SecretString,
    /// Secret used to sign webhook bodies
    pub webhook_secret: SecretString,
    /// Comma separated OAuth scopes
    pub scopes: String,
}

impl std::fmt::Debug for ShopifyAppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyAppConfig")
            .field("api_version", &self.api_version)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .finish()
    }
}

impl ShopifyAppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let api_secret = secret("SHOPIFY_API_SECRET")?;
        let webhook_secret = match optional("SHOPIFY_WEBHOOK_SECRET") {
            Some(value) => checked_secret("SHOPIFY_WEBHOOK_SECRET", value)?,
            None => api_secret.clone(),
        };

        Ok(Self {
            api_version: optional("SHOPIFY_API_VERSION")
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            api_key: required("SHOPIFY_API_KEY")?,
            api_secret,
            webhook_secret,
            scopes: optional("SHOPIFY_SCOPES").unwrap_or_else(|| DEFAULT_SCOPES.to_string()),
        })
    }
}

/// PEM material for HTTPS.
#[derive(Clone)]
pub struct TlsConfig {
    pub cert_pem: String,
    pub key_pem: SecretString,
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("cert_pem", &"[CERTIFICATE]")
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

impl TlsConfig {
    /// Both halves or neither.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        match (optional("APP_TLS_CERT"), optional("APP_TLS_KEY")) {
            (Some(cert_pem), Some(key)) => Ok(Some(Self {
                cert_pem,
                key_pem: SecretString::from(key),
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "APP_TLS_*".to_string(),
                "APP_TLS_CERT and APP_TLS_KEY must be set together".to_string(),
            )),
        }
    }
}

impl AppConfig {
    /// Load configuration from the environment and an optional `.env` file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing, a value does
    /// not parse, or a secret looks like a placeholder or has low entropy.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let store_backend: StoreBackend = parsed("STORE_BACKEND", StoreBackend::default())?;
        let database_url = match store_backend {
            StoreBackend::Postgres => Some(SecretString::from(required("DATABASE_URL")?)),
            StoreBackend::Memory => optional("DATABASE_URL").map(SecretString::from),
        };

        let bulk_write_concurrency = parsed("BULK_WRITE_CONCURRENCY", DEFAULT_BULK_WRITE_CONCURRENCY)?;
        if bulk_write_concurrency == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "BULK_WRITE_CONCURRENCY".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            database_url,
            store_backend,
            host: parsed("APP_HOST", IpAddr::V4(Ipv4Addr::LOCALHOST))?,
            port: parsed("APP_PORT", DEFAULT_PORT)?,
            base_url: required("APP_BASE_URL")?.trim_end_matches('/').to_string(),
            shopify: ShopifyAppConfig::from_env()?,
            bulk_write_concurrency,
            sentry_dsn: optional("SENTRY_DSN"),
            sentry_environment: optional("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parsed("SENTRY_SAMPLE_RATE", 1.0)?,
            sentry_traces_sample_rate: parsed("SENTRY_TRACES_SAMPLE_RATE", 1.0)?,
            tls: TlsConfig::from_env()?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// OAuth redirect URI registered with Shopify.
    #[must_use]
    pub fn oauth_redirect_uri(&self) -> String {
        format!("{}/api/auth/callback", self.base_url)
    }
}

// =============================================================================
// Environment access
// =============================================================================

fn required(key: &str) -> Result<String, ConfigError> {
    optional(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Unset and blank are the same.
fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    optional(key).map_or(Ok(default), |raw| parse_value(key, &raw))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

// =============================================================================
// Secret checks
// =============================================================================

fn secret(key: &str) -> Result<SecretString, ConfigError> {
    checked_secret(key, required(key)?)
}

fn checked_secret(key: &str, value: String) -> Result<SecretString, ConfigError> {
    check_secret(key, &value)?;
    Ok(SecretString::from(value))
}

/// Reject sample values and low-entropy strings.
fn check_secret(key: &str, value: &str) -> Result<(), ConfigError> {
    let lower = value.to_lowercase();
    if let Some(found) = PLACEHOLDERS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            key.to_string(),
            format!("looks like a placeholder (contains '{found}')"),
        ));
    }

    let entropy = entropy_per_char(value);
    if entropy < MIN_SECRET_ENTROPY {
        return Err(ConfigError::InsecureSecret(
            key.to_string(),
            format!("entropy {entropy:.2} bits/char is below {MIN_SECRET_ENTROPY:.1}"),
        ));
    }
    Ok(())
}

/// Shannon entropy of the character distribution, in bits per character.
#[allow(clippy::cast_precision_loss)] // secret lengths are far below 2^52
fn entropy_per_char(value: &str) -> f64 {
    let mut counts: HashMap<char, u32> = HashMap::new();
    for c in value.chars() {
        *counts.entry(c).or_default() += 1;
    }

    let total: u32 = counts.values().sum();
    if total == 0 {
        return 0.0;
    }
    counts
        .values()
        .map(|&n| f64::from(n) / f64::from(total))
        .map(|p| -p * p.log2())
        .sum()
}
