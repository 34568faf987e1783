//! Unified error handling for the commission API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use commission_manager_core::ShopDomain;
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::CommissionServiceError;
use crate::shopify::ShopifyError;

/// Application-level error type for the commission API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Shopify API operation failed.
    #[error("Shopify error: {0}")]
    Shopify(#[from] ShopifyError),

    /// The shop has no usable access token; the merchant must (re)install.
    #[error("Shopify authentication required for {shop}")]
    AuthRequired {
        /// Shop that needs to go through OAuth.
        shop: ShopDomain,
    },

    /// A webhook or callback signature did not verify.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Attach the shop to an upstream 401 so the client gets an install link.
    #[must_use]
    pub fn for_shop(self, shop: &ShopDomain) -> Self {
        match self {
            Self::Shopify(ShopifyError::Unauthorized(_)) => Self::AuthRequired { shop: shop.clone() },
            other => other,
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Shopify(ShopifyError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Shopify(ShopifyError::Unauthorized(_))
            | Self::AuthRequired { .. }
            | Self::InvalidSignature => StatusCode::UNAUTHORIZED,
            Self::Shopify(ShopifyError::RateLimited(_)) => StatusCode::TOO_MANY_REQUESTS,
            Self::Shopify(_) => StatusCode::BAD_GATEWAY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<CommissionServiceError> for AppError {
    fn from(err: CommissionServiceError) -> Self {
        match err {
            CommissionServiceError::Invalid(e) => Self::BadRequest(e.to_string()),
            CommissionServiceError::InvalidId(msg) => Self::BadRequest(msg),
            CommissionServiceError::Catalog(e) => Self::Shopify(e),
            CommissionServiceError::Repository(e) => Self::Database(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Commission request error"
            );
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!(error = %self, "Shopify rate limit hit");
        }

        // Don't expose internal error details to clients
        let body = match &self {
            Self::AuthRequired { shop } => json!({
                "error": "Shopify authentication required",
                "authUrl": format!("/api/auth?shop={}", urlencoding::encode(shop.as_str())),
            }),
            Self::Shopify(ShopifyError::Unauthorized(_)) => {
                json!({ "error": "Shopify authentication required" })
            }
            Self::Database(_) | Self::Internal(_) => json!({ "error": "Internal server error" }),
            Self::Shopify(ShopifyError::NotFound(what)) => {
                json!({ "error": format!("Not found: {what}") })
            }
            Self::Shopify(_) => json!({ "error": "External service error" }),
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_failure() {
        assert_eq!(
            AppError::BadRequest("Invalid type: variant".to_string()).to_string(),
            "Bad request: Invalid type: variant"
        );
        assert_eq!(AppError::InvalidSignature.to_string(), "Invalid signature");
    }

    #[test]
    fn test_each_variant_maps_to_its_status() {
        let shop = ShopDomain::parse("demo.myshopify.com").unwrap();
        let cases = [
            (AppError::AuthRequired { shop }, StatusCode::UNAUTHORIZED),
            (AppError::InvalidSignature, StatusCode::UNAUTHORIZED),
            (AppError::BadRequest("amount".into()), StatusCode::BAD_REQUEST),
            (
                AppError::Shopify(ShopifyError::InvalidData("price".into())),
                StatusCode::BAD_GATEWAY,
            ),
            (
                AppError::Shopify(ShopifyError::NotFound("collection".into())),
                StatusCode::NOT_FOUND,
            ),
            (AppError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            let label = err.to_string();
            assert_eq!(err.into_response().status(), expected, "{label}");
        }
    }

    #[tokio::test]
    async fn test_auth_required_body_carries_install_link() {
        use http_body_util::BodyExt;

        let shop = ShopDomain::parse("demo.myshopify.com").unwrap();
        let response = AppError::AuthRequired { shop }.into_response();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["error"], "Shopify authentication required");
        assert_eq!(body["authUrl"], "/api/auth?shop=demo.myshopify.com");
    }

    #[test]
    fn test_for_shop_turns_upstream_401_into_install_hint() {
        let shop = ShopDomain::parse("demo.myshopify.com").unwrap();
        let err = AppError::Shopify(ShopifyError::Unauthorized("expired".to_string())).for_shop(&shop);
        assert!(matches!(err, AppError::AuthRequired { .. }));

        let err = AppError::BadRequest("x".to_string()).for_shop(&shop);
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
