//! Privacy webhook tests.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use commission_manager_admin::db::{CommissionStore, ShopStore};
use commission_manager_admin::services::testing::FakeCatalog;
use commission_manager_integration_tests::{
    SHOP, TestApp, WEBHOOK_SECRET, priced, shop, with_shop,
};
use serde_json::json;

#[tokio::test]
async fn test_webhook_with_bad_signature_is_rejected() {
    let app = TestApp::new(FakeCatalog::default()).await;

    let (status, _) = app
        .webhook(
            "/api/webhooks/shop/redact",
            &json!({ "shop_id": 1, "shop_domain": SHOP }),
            "not-the-secret",
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(app.store.find_shop(&shop()).await.unwrap().is_some());
}

#[tokio::test]
async fn test_shop_redact_erases_shop_and_commissions() {
    let app = TestApp::new(FakeCatalog::new(vec![priced(1, "10"), priced(2, "20")])).await;
    for id in [1, 2] {
        app.post(
            &with_shop("/api/commissions"),
            json!({ "type": "product", "id": id, "commission": 5 }),
        )
        .await;
    }

    let (status, body) = app
        .webhook(
            "/api/webhooks/shop/redact",
            &json!({ "shop_id": 954_889, "shop_domain": SHOP }),
            WEBHOOK_SECRET,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["records_deleted"]["total"], 3);
    assert!(app.store.find_shop(&shop()).await.unwrap().is_none());
    assert!(
        app.store
            .list_all_product_commissions(&shop())
            .await
            .unwrap()
            .is_empty()
    );

    let (status, _) = app.get(&with_shop("/api/commissions/overview")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_customer_data_request_reports_nothing_stored() {
    let app = TestApp::new(FakeCatalog::default()).await;

    let (status, body) = app
        .webhook(
            "/api/webhooks/customers/data_request",
            &json!({
                "shop_id": 954_889,
                "shop_domain": SHOP,
                "orders_requested": [299_938],
                "customer": { "id": 191_167, "email": "john@example.com" }
            }),
            WEBHOOK_SECRET,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["customer_id"], 191_167);
    assert_eq!(body["data_collected"]["product_commissions"], json!([]));
}

#[tokio::test]
async fn test_customer_redact_is_acknowledged() {
    let app = TestApp::new(FakeCatalog::default()).await;

    let (status, body) = app
        .webhook(
            "/api/webhooks/customers/redact",
            &json!({ "shop_domain": SHOP, "customer": { "id": 7 } }),
            WEBHOOK_SECRET,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["records_redacted"], 0);
}

#[tokio::test]
async fn test_signed_garbage_is_a_bad_request() {
    let app = TestApp::new(FakeCatalog::default()).await;

    let (status, _) = app
        .webhook(
            "/api/webhooks/shop/redact",
            &json!({ "shop_id": 1 }),
            WEBHOOK_SECRET,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_privacy_policy_needs_no_shop() {
    let app = TestApp::uninstalled(FakeCatalog::default());

    let (status, body) = app.get("/api/privacy-policy").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data_collection"]["customer_data"]["collected"], "None");
    assert_eq!(body["privacy_webhooks"].as_array().unwrap().len(), 3);
}
