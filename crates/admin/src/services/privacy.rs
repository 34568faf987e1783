//! Mandatory privacy webhooks.
//!
//! The app stores shop credentials and commission rates, never customer
//! personal data. Customer requests are acknowledged with an empty document;
//! shop erasure removes the shop and every commission it owns.
//!
//! Each request leaves one `info` line on the `gdpr_audit` target.

use chrono::{DateTime, Utc};
use commission_manager_core::ShopDomain;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::db::{RepositoryError, ShopStore};

/// Customer reference carried by customer webhooks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookCustomer {
    pub id: Option<serde_json::Value>,
    pub email: Option<String>,
}

/// `customers/data_request` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDataRequest {
    pub shop_id: Option<i64>,
    pub shop_domain: ShopDomain,
    #[serde(default)]
    pub customer: WebhookCustomer,
    #[serde(default)]
    pub orders_requested: Vec<serde_json::Value>,
}

/// `customers/redact` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerRedactRequest {
    pub shop_id: Option<i64>,
    pub shop_domain: ShopDomain,
    #[serde(default)]
    pub customer: WebhookCustomer,
}

/// `shop/redact` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ShopRedactRequest {
    pub shop_id: Option<i64>,
    pub shop_domain: ShopDomain,
}

/// Static description of what the app keeps.
#[derive(Debug, Clone, Serialize)]
pub struct RetentionMetadata {
    pub app_name: &'static str,
    pub data_collection_purpose: &'static str,
    pub retention_period: &'static str,
}

const RETENTION: RetentionMetadata = RetentionMetadata {
    app_name: "Commission Manager",
    data_collection_purpose: "Commission tracking and calculation",
    retention_period: "Data retained as long as the app is installed",
};

/// One category of stored data.
#[derive(Debug, Clone, Serialize)]
pub struct DataCategory {
    pub collected: &'static [&'static str],
    pub purpose: &'static str,
    pub retention: &'static str,
}

/// Customer data statement; the app keeps none.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerDataStatement {
    pub collected: &'static str,
    pub note: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataCollection {
    pub shop_data: DataCategory,
    pub product_data: DataCategory,
    pub customer_data: CustomerDataStatement,
}

/// A privacy webhook the app answers.
#[derive(Debug, Clone, Serialize)]
pub struct PrivacyEndpoint {
    pub topic: &'static str,
    pub endpoint: &'static str,
    pub description: &'static str,
}

/// Public data-retention document served at `/api/privacy-policy`.
#[derive(Debug, Clone, Serialize)]
pub struct PrivacyPolicy {
    pub app_name: &'static str,
    pub version: &'static str,
    pub last_updated: &'static str,
    pub data_collection: DataCollection,
    pub third_parties: &'static str,
    pub privacy_webhooks: &'static [PrivacyEndpoint],
    pub deletion: &'static str,
}

const WEBHOOKS: &[PrivacyEndpoint] = &[
    PrivacyEndpoint {
        topic: "customers/data_request",
        endpoint: "/api/webhooks/customers/data_request",
        description: "Returns an empty document; no customer data is stored",
    },
    PrivacyEndpoint {
        topic: "customers/redact",
        endpoint: "/api/webhooks/customers/redact",
        description: "Acknowledged; there is no customer data to erase",
    },
    PrivacyEndpoint {
        topic: "shop/redact",
        endpoint: "/api/webhooks/shop/redact",
        description: "Deletes the shop and every commission it owns",
    },
];

/// The app's privacy policy.
#[must_use]
pub const fn privacy_policy() -> PrivacyPolicy {
    PrivacyPolicy {
        app_name: RETENTION.app_name,
        version: "1.0",
        last_updated: "2024-09-05",
        data_collection: DataCollection {
            shop_data: DataCategory {
                collected: &["Shop domain", "Offline access token", "Installation timestamp"],
                purpose: "Authenticate with the Shopify Admin API for your store",
                retention: RETENTION.retention_period,
            },
            product_data: DataCategory {
                collected: &[
                    "Product ids, titles and handles",
                    "Collection ids",
                    "Commission rates and types set by the store owner",
                ],
                purpose: RETENTION.data_collection_purpose,
                retention: RETENTION.retention_period,
            },
            customer_data: CustomerDataStatement {
                collected: "None",
                note: "Prices are read live from Shopify; orders and customer details are never stored",
            },
        },
        third_parties: "None; data is only exchanged with Shopify",
        privacy_webhooks: WEBHOOKS,
        deletion: "All shop data is deleted when Shopify sends shop/redact after uninstall",
    }
}

/// Data held about a customer. Always empty.
#[derive(Debug, Clone, Serialize)]
pub struct CollectedData {
    pub product_commissions: Vec<serde_json::Value>,
    pub metadata: RetentionMetadata,
}

/// Response to `customers/data_request`.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerDataReport {
    pub shop_domain: ShopDomain,
    pub customer_id: Option<serde_json::Value>,
    pub data_collected: CollectedData,
    pub timestamp: DateTime<Utc>,
}

/// Response to `customers/redact`.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerRedactReceipt {
    pub message: &'static str,
    pub shop_domain: ShopDomain,
    pub customer_id: Option<serde_json::Value>,
    pub records_redacted: u64,
    pub timestamp: DateTime<Utc>,
}

/// Counts removed by `shop/redact`.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedRecords {
    pub shop: u64,
    pub product_commissions: u64,
    pub collection_commissions: u64,
    pub total: u64,
}

/// Response to `shop/redact`.
#[derive(Debug, Clone, Serialize)]
pub struct ShopRedactReceipt {
    pub message: &'static str,
    pub shop_domain: ShopDomain,
    pub shop_id: Option<i64>,
    pub records_deleted: DeletedRecords,
    pub timestamp: DateTime<Utc>,
}

/// Handles privacy webhooks.
pub struct PrivacyService<'a> {
    shops: &'a dyn ShopStore,
}

impl<'a> PrivacyService<'a> {
    /// Create a privacy service.
    #[must_use]
    pub const fn new(shops: &'a dyn ShopStore) -> Self {
        Self { shops }
    }

    /// Report what is stored about a customer (nothing).
    #[must_use]
    pub fn customer_data_request(request: CustomerDataRequest) -> CustomerDataReport {
        tracing::info!(
            target: "gdpr_audit",
            request = "customers/data_request",
            shop = %request.shop_domain,
            customer_id = ?request.customer.id,
            orders_requested = request.orders_requested.len(),
            "Customer data request processed"
        );

        CustomerDataReport {
            shop_domain: request.shop_domain,
            customer_id: request.customer.id,
            data_collected: CollectedData {
                product_commissions: Vec::new(),
                metadata: RETENTION,
            },
            timestamp: Utc::now(),
        }
    }

    /// Acknowledge a customer erasure. No customer records exist to redact.
    #[must_use]
    pub fn customer_redact(request: CustomerRedactRequest) -> CustomerRedactReceipt {
        tracing::info!(
            target: "gdpr_audit",
            request = "customers/redact",
            shop = %request.shop_domain,
            customer_id = ?request.customer.id,
            records_redacted = 0,
            "Customer data erasure completed"
        );

        CustomerRedactReceipt {
            message: "Customer data erasure completed",
            shop_domain: request.shop_domain,
            customer_id: request.customer.id,
            records_redacted: 0,
            timestamp: Utc::now(),
        }
    }

    /// Erase a shop and all of its commissions.
    ///
    /// An unknown shop is already erased and reported as such.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the delete fails.
    #[instrument(skip(self, request), fields(shop = %request.shop_domain))]
    pub async fn shop_redact(
        &self,
        request: ShopRedactRequest,
    ) -> Result<ShopRedactReceipt, RepositoryError> {
        let erasure = self.shops.delete_shop(&request.shop_domain).await?;

        let records_deleted = DeletedRecords {
            shop: u64::from(erasure.shop_deleted),
            product_commissions: erasure.product_commissions,
            collection_commissions: erasure.collection_commissions,
            total: u64::from(erasure.shop_deleted)
                + erasure.product_commissions
                + erasure.collection_commissions,
        };

        tracing::info!(
            target: "gdpr_audit",
            request = "shop/redact",
            shop = %request.shop_domain,
            shop_id = ?request.shop_id,
            deleted = records_deleted.total,
            "Shop data erasure completed"
        );

        Ok(ShopRedactReceipt {
            message: if erasure.shop_deleted {
                "Shop data erasure completed successfully"
            } else {
                "Shop not found - no data to redact"
            },
            shop_domain: request.shop_domain,
            shop_id: request.shop_id,
            records_deleted,
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use commission_manager_core::{Commission, ProductDetails, ProductGid};
    use rust_decimal::Decimal;
    use secrecy::SecretString;

    use super::*;
    use crate::db::{CommissionStore, MemoryStore, NewProductCommission};

    fn shop() -> ShopDomain {
        ShopDomain::parse("demo.myshopify.com").unwrap()
    }

    #[tokio::test]
    async fn test_shop_redact_erases_commissions() {
        let store = MemoryStore::new();
        store
            .save_shop_token(&shop(), &SecretString::from("shpat_x"), "read_products")
            .await
            .unwrap();
        store
            .upsert_product_commission(
                &shop(),
                &NewProductCommission {
                    product_id: ProductGid::parse("1").unwrap(),
                    commission: Commission::percentage(Decimal::from(10)),
                    details: ProductDetails::unknown(),
                },
            )
            .await
            .unwrap();

        let receipt = PrivacyService::new(&store)
            .shop_redact(ShopRedactRequest {
                shop_id: Some(1),
                shop_domain: shop(),
            })
            .await
            .unwrap();

        assert_eq!(receipt.records_deleted.total, 2);
        assert!(store.list_all_product_commissions(&shop()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shop_redact_unknown_shop_succeeds() {
        let store = MemoryStore::new();
        let receipt = PrivacyService::new(&store)
            .shop_redact(ShopRedactRequest {
                shop_id: None,
                shop_domain: shop(),
            })
            .await
            .unwrap();
        assert_eq!(receipt.records_deleted.total, 0);
        assert_eq!(receipt.message, "Shop not found - no data to redact");
    }

    #[test]
    fn test_customer_data_request_payload() {
        let request: CustomerDataRequest = serde_json::from_value(serde_json::json!({
            "shop_id": 954_889,
            "shop_domain": "demo.myshopify.com",
            "orders_requested": [299_938, 280_263],
            "customer": { "id": 191_167, "email": "john@example.com" }
        }))
        .unwrap();

        let report = PrivacyService::customer_data_request(request);
        let body = serde_json::to_value(&report).unwrap();

        assert_eq!(body["customer_id"], 191_167);
        assert_eq!(body["data_collected"]["product_commissions"], serde_json::json!([]));
        assert!(body.get("customer_email").is_none());
    }

    #[test]
    fn test_privacy_policy_lists_every_webhook() {
        let policy = serde_json::to_value(privacy_policy()).unwrap();

        assert_eq!(policy["app_name"], "Commission Manager");
        assert_eq!(policy["data_collection"]["customer_data"]["collected"], "None");
        let topics: Vec<&str> = policy["privacy_webhooks"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|w| w["topic"].as_str())
            .collect();
        assert_eq!(topics, ["customers/data_request", "customers/redact", "shop/redact"]);
    }
}
