//! CLI subcommands.

pub mod migrate;
pub mod shop;

use commission_manager_admin::db::{PgStore, create_pool};
use secrecy::SecretString;

/// Connect to the database named by `DATABASE_URL`.
async fn connect() -> Result<PgStore, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| CommandError::MissingEnvVar("DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = create_pool(&SecretString::from(database_url)).await?;
    Ok(PgStore::new(pool))
}

/// Errors shared by the database-backed commands.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The shop is not installed or has no token.
    #[error("Shop {0} is not installed")]
    NotInstalled(String),

    /// Store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] commission_manager_admin::db::RepositoryError),

    /// Commission computation failed.
    #[error("{0}")]
    Service(#[from] commission_manager_admin::services::CommissionServiceError),

    /// Output could not be rendered.
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),

    /// HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}
