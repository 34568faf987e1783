//! Commission API tests: writes, resolution, listing and the overview.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use commission_manager_admin::services::testing::FakeCatalog;
use commission_manager_integration_tests::{TestApp, priced, product, with_shop};
use serde_json::{Value, json};

fn product_row<'a>(listing: &'a Value, gid: &str) -> &'a Value {
    listing["products"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["id"] == gid)
        .unwrap()
}

// =============================================================================
// Product commissions
// =============================================================================

#[tokio::test]
async fn test_product_commission_round_trip() {
    let app = TestApp::new(FakeCatalog::new(vec![priced(1, "100")])).await;

    let (status, body) = app
        .post(
            &with_shop("/api/commissions"),
            json!({ "type": "product", "id": 1, "commission": 15 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["productId"], "gid://shopify/Product/1");
    assert_eq!(body["productTitle"], "Product 1");

    let (status, listing) = app.get(&with_shop("/api/products")).await;
    assert_eq!(status, StatusCode::OK);

    let row = product_row(&listing, "gid://shopify/Product/1");
    assert_eq!(row["commission"]["commission"], 15.0);
    assert_eq!(row["commission"]["commissionType"], "percentage");
    assert_eq!(row["commission"]["source"], "product");
    assert_eq!(row["link"], "https://demo.myshopify.com/products/p-1");
}

#[tokio::test]
async fn test_second_write_replaces_the_first() {
    let app = TestApp::new(FakeCatalog::new(vec![priced(1, "100")])).await;

    for value in [10, 12] {
        let (status, _) = app
            .post(
                &with_shop("/api/commissions"),
                json!({ "type": "product", "id": "gid://shopify/Product/1", "commission": value }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, list) = app.get(&with_shop("/api/commissions/list")).await;
    assert_eq!(list["pagination"]["totalCount"], 1);
    assert_eq!(list["commissions"][0]["commission"], 12.0);
}

#[tokio::test]
async fn test_fixed_amount_commission_keeps_currency() {
    let app = TestApp::new(FakeCatalog::new(vec![priced(1, "80")])).await;

    let (status, body) = app
        .post(
            &with_shop("/api/commissions"),
            json!({
                "type": "product",
                "id": 1,
                "commission": "7.5",
                "commissionType": "fixed-amount",
                "currency": "KES"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["commissionType"], "fixed-amount");
    assert_eq!(body["commission"], 7.5);
    assert_eq!(body["currency"], "KES");
}

#[tokio::test]
async fn test_invalid_commission_input_is_rejected() {
    let app = TestApp::new(FakeCatalog::new(vec![priced(1, "80")])).await;

    let (status, _) = app
        .post(
            &with_shop("/api/commissions"),
            json!({ "type": "product", "id": 1, "commission": "abc" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            &with_shop("/api/commissions"),
            json!({ "type": "product", "id": 1, "commission": 5, "commissionType": "fixed-amount" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(
            &with_shop("/api/commissions"),
            json!({ "type": "variant", "id": 1, "commission": 5 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Invalid type: variant"));

    let (_, list) = app.get(&with_shop("/api/commissions/list")).await;
    assert_eq!(list["pagination"]["totalCount"], 0);
}

#[tokio::test]
async fn test_malformed_body_is_a_bad_request() {
    let app = TestApp::new(FakeCatalog::new(vec![])).await;

    let (status, _) = app
        .post(&with_shop("/api/commissions"), json!({ "commission": 5 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Resolution
// =============================================================================

#[tokio::test]
async fn test_product_commission_overrides_collection() {
    let catalog =
        FakeCatalog::new(vec![priced(1, "100")]).with_collection(10, "Summer", &[1]);
    let app = TestApp::new(catalog).await;

    app.post(
        &with_shop("/api/commissions"),
        json!({ "type": "collection", "id": 10, "commission": 5, "applyToProducts": false }),
    )
    .await;

    let (_, listing) = app.get(&with_shop("/api/products")).await;
    let row = product_row(&listing, "gid://shopify/Product/1");
    assert_eq!(row["commission"]["source"], "collection");
    assert_eq!(row["commission"]["collectionId"], "gid://shopify/Collection/10");
    assert_eq!(row["commission"]["commission"], 5.0);

    app.post(
        &with_shop("/api/commissions"),
        json!({ "type": "product", "id": 1, "commission": 20 }),
    )
    .await;

    let (_, listing) = app.get(&with_shop("/api/products")).await;
    let row = product_row(&listing, "gid://shopify/Product/1");
    assert_eq!(row["commission"]["source"], "product");
    assert_eq!(row["commission"]["commission"], 20.0);
}

#[tokio::test]
async fn test_latest_collection_commission_wins() {
    let catalog = FakeCatalog::new(vec![priced(1, "100")])
        .with_collection(10, "Summer", &[1])
        .with_collection(11, "Sale", &[1]);
    let app = TestApp::new(catalog).await;

    for (collection, value) in [(10, 5), (11, 8)] {
        let (status, _) = app
            .post(
                &with_shop("/api/commissions"),
                json!({
                    "type": "collection",
                    "id": collection,
                    "commission": value,
                    "applyToProducts": false
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, listing) = app.get(&with_shop("/api/products")).await;
    let row = product_row(&listing, "gid://shopify/Product/1");
    assert_eq!(row["commission"]["collectionId"], "gid://shopify/Collection/11");
    assert_eq!(row["commission"]["commission"], 8.0);
}

#[tokio::test]
async fn test_product_without_commission_resolves_to_null() {
    let app = TestApp::new(FakeCatalog::new(vec![priced(1, "100")])).await;

    let (_, listing) = app.get(&with_shop("/api/products")).await;
    assert!(product_row(&listing, "gid://shopify/Product/1")["commission"].is_null());
}

// =============================================================================
// Bulk apply
// =============================================================================

#[tokio::test]
async fn test_category_bulk_writes_each_member() {
    let catalog = FakeCatalog::new(vec![
        product(1, "Runner", Some("Shoes")),
        product(2, "Trail", Some("Shoes")),
        product(3, "Sandal", Some("Shoes")),
        product(4, "Cap", Some("Hats")),
    ]);
    let app = TestApp::new(catalog).await;

    let (status, body) = app
        .post(
            &with_shop("/api/commissions"),
            json!({ "type": "category", "id": "Shoes", "commission": 10 }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updatedCount"], 3);
    assert_eq!(body["failedCount"], 0);

    let (_, list) = app.get(&with_shop("/api/commissions/list")).await;
    assert_eq!(list["pagination"]["totalCount"], 3);
    let titles: Vec<&str> = list["commissions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["productTitle"].as_str().unwrap())
        .collect();
    assert!(!titles.contains(&"Cap"));
}

#[tokio::test]
async fn test_collection_bulk_writes_product_records() {
    let catalog = FakeCatalog::new(vec![priced(1, "10"), priced(2, "20"), priced(3, "30")])
        .with_collection(10, "Summer", &[1, 2]);
    let app = TestApp::new(catalog).await;

    let (status, body) = app
        .post(
            &with_shop("/api/commissions"),
            json!({ "type": "collection", "id": "gid://shopify/Collection/10", "commission": 5 }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updatedCount"], 2);
    assert_eq!(body["scopeTitle"], "Summer");

    let (_, listing) = app.get(&with_shop("/api/products")).await;
    let row = product_row(&listing, "gid://shopify/Product/2");
    assert_eq!(row["commission"]["source"], "product");
}

#[tokio::test]
async fn test_empty_collection_bulk_updates_nothing() {
    let catalog = FakeCatalog::new(vec![priced(1, "10")]).with_collection(10, "Empty", &[]);
    let app = TestApp::new(catalog).await;

    let (status, body) = app
        .post(
            &with_shop("/api/commissions"),
            json!({ "type": "collection", "id": 10, "commission": 5 }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updatedCount"], 0);
}

#[tokio::test]
async fn test_unknown_collection_is_not_found() {
    let app = TestApp::new(FakeCatalog::new(vec![priced(1, "10")])).await;

    let (status, _) = app
        .post(
            &with_shop("/api/commissions"),
            json!({ "type": "collection", "id": 99, "commission": 5 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Removal
// =============================================================================

#[tokio::test]
async fn test_remove_is_idempotent() {
    let app = TestApp::new(FakeCatalog::new(vec![priced(1, "100")])).await;

    let (status, body) = app
        .delete(
            &with_shop("/api/commissions"),
            json!({ "type": "product", "id": 999 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "removed": false }));
}

#[tokio::test]
async fn test_remove_by_product_gid_and_record_id() {
    let app = TestApp::new(FakeCatalog::new(vec![priced(1, "100"), priced(2, "50")])).await;

    app.post(
        &with_shop("/api/commissions"),
        json!({ "type": "product", "id": 1, "commission": 10 }),
    )
    .await;
    let (_, created) = app
        .post(
            &with_shop("/api/commissions"),
            json!({ "type": "product", "id": 2, "commission": 10 }),
        )
        .await;

    let (_, body) = app
        .delete(
            &with_shop("/api/commissions"),
            json!({ "type": "product", "id": "gid://shopify/Product/1" }),
        )
        .await;
    assert_eq!(body["removed"], true);

    let (_, body) = app
        .delete(
            &with_shop("/api/commissions"),
            json!({ "type": "product", "id": created["id"] }),
        )
        .await;
    assert_eq!(body["removed"], true);

    let (_, list) = app.get(&with_shop("/api/commissions/list")).await;
    assert_eq!(list["pagination"]["totalCount"], 0);
}

#[tokio::test]
async fn test_remove_collection_commission_falls_back_to_none() {
    let catalog = FakeCatalog::new(vec![priced(1, "100")]).with_collection(10, "Summer", &[1]);
    let app = TestApp::new(catalog).await;

    app.post(
        &with_shop("/api/commissions"),
        json!({ "type": "collection", "id": 10, "commission": 5, "applyToProducts": false }),
    )
    .await;
    let (_, body) = app
        .delete(
            &with_shop("/api/commissions"),
            json!({ "type": "collection", "id": 10 }),
        )
        .await;
    assert_eq!(body["removed"], true);

    let (_, listing) = app.get(&with_shop("/api/products")).await;
    assert!(product_row(&listing, "gid://shopify/Product/1")["commission"].is_null());
}

// =============================================================================
// Listing and overview
// =============================================================================

#[tokio::test]
async fn test_list_paginates() {
    let products: Vec<_> = (1..=25).map(|i| priced(i, "40")).collect();
    let app = TestApp::new(FakeCatalog::new(products)).await;

    for i in 1..=25 {
        app.post(
            &with_shop("/api/commissions"),
            json!({ "type": "product", "id": i, "commission": 10 }),
        )
        .await;
    }

    let (status, list) = app
        .get(&with_shop("/api/commissions/list?page=3&limit=10"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["commissions"].as_array().unwrap().len(), 5);
    assert_eq!(list["pagination"]["page"], 3);
    assert_eq!(list["pagination"]["totalPages"], 3);
    assert_eq!(list["pagination"]["totalCount"], 25);
    assert_eq!(list["commissions"][0]["productPrice"], 40.0);
    assert_eq!(list["commissions"][0]["commissionAmount"], 4.0);
}

#[tokio::test]
async fn test_overview_without_commissions() {
    let app = TestApp::new(FakeCatalog::new(vec![priced(1, "100"), priced(2, "50")])).await;

    let (status, stats) = app.get(&with_shop("/api/commissions/overview")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["totalCommissions"], 0);
    assert_eq!(stats["averageCommission"], 0.0);
    assert!(stats["highestCommission"].is_null());
    assert_eq!(stats["totalProducts"], 2);
    assert_eq!(stats["productsWithoutCommissions"], 2);
}

#[tokio::test]
async fn test_overview_counts_written_commissions() {
    let app = TestApp::new(FakeCatalog::new(vec![priced(1, "200"), priced(2, "50")])).await;

    app.post(
        &with_shop("/api/commissions"),
        json!({ "type": "product", "id": 1, "commission": 10 }),
    )
    .await;

    let (_, stats) = app.get(&with_shop("/api/commissions/overview")).await;
    assert_eq!(stats["totalCommissions"], 1);
    assert_eq!(stats["totalPotentialEarnings"], 20.0);
    assert_eq!(stats["productsWithoutCommissions"], 1);
}

#[tokio::test]
async fn test_overview_catalog_outage_is_bad_gateway() {
    let app = TestApp::new(FakeCatalog::new(vec![]).failing()).await;

    let (status, body) = app.get(&with_shop("/api/commissions/overview")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "External service error");
}

#[tokio::test]
async fn test_remove_with_string_id_targets_the_product() {
    let app = TestApp::new(FakeCatalog::new(vec![priced(1, "10"), priced(2, "20")])).await;
    // Product 2 is written first, so it holds record id 1.
    for product in [2, 1] {
        app.post(
            &with_shop("/api/commissions"),
            json!({ "type": "product", "id": product, "commission": 5 }),
        )
        .await;
    }

    let (status, body) = app
        .delete(
            &with_shop("/api/commissions"),
            json!({ "type": "product", "id": "1" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], true);

    let (_, listing) = app.get(&with_shop("/api/products")).await;
    assert!(product_row(&listing, "gid://shopify/Product/1")["commission"].is_null());
    assert_eq!(
        product_row(&listing, "gid://shopify/Product/2")["commission"]["commission"],
        5.0
    );
}
