//! Commission service error types.

use commission_manager_core::{CommissionError, GidError};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::shopify::ShopifyError;

/// Errors that can occur during commission operations.
#[derive(Debug, Error)]
pub enum CommissionServiceError {
    /// The commission payload did not validate.
    #[error("invalid commission: {0}")]
    Invalid(#[from] CommissionError),

    /// A product, collection or record id did not parse.
    #[error("{0}")]
    InvalidId(String),

    /// The catalog could not be read.
    #[error("catalog error: {0}")]
    Catalog(#[from] ShopifyError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<GidError> for CommissionServiceError {
    fn from(err: GidError) -> Self {
        Self::InvalidId(format!("invalid id: {err}"))
    }
}
