//! Admin GraphQL client against a mock Shopify.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::str::FromStr;

use commission_manager_admin::db::MemoryStore;
use commission_manager_admin::services::{BulkApplier, BulkScope, StatsAggregator};
use commission_manager_admin::shopify::{
    AdminClient, Catalog, CatalogProvider, ShopifyCatalogProvider, ShopifyError,
};
use commission_manager_core::{CollectionGid, Commission, ProductGid};
use commission_manager_integration_tests::shop;
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GRAPHQL_PATH: &str = "/admin/api/2025-01/graphql.json";

fn client(server: &MockServer) -> AdminClient {
    AdminClient::with_endpoint(
        reqwest::Client::new(),
        &shop(),
        format!("{}{GRAPHQL_PATH}", server.uri()),
        SecretString::from("shpat_test"),
    )
}

fn product_node(id: u32, title: &str, collections: &[u32]) -> Value {
    json!({
        "id": format!("gid://shopify/Product/{id}"),
        "title": title,
        "handle": title.to_lowercase().replace(' ', "-"),
        "productType": "Shoes",
        "status": "ACTIVE",
        "featuredImage": null,
        "priceRangeV2": {
            "minVariantPrice": { "amount": "49.90", "currencyCode": "KES" }
        },
        "collections": {
            "nodes": collections
                .iter()
                .map(|c| json!({ "id": format!("gid://shopify/Collection/{c}") }))
                .collect::<Vec<_>>()
        }
    })
}

async fn respond(server: &MockServer, operation: &str, body: Value) {
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_partial_json(json!({ "operationName": operation })))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// `query` documents of every request the mock server saw.
async fn sent_queries(server: &MockServer) -> Vec<(String, Value)> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|request| {
            let body: Value = request.body_json().unwrap();
            (body["query"].as_str().unwrap().to_string(), body["variables"].clone())
        })
        .collect()
}

#[tokio::test]
async fn test_products_page_is_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(header("X-Shopify-Access-Token", "shpat_test"))
        .and(body_partial_json(json!({ "operationName": "CommissionProducts" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "products": {
                    "nodes": [product_node(1, "Blue Shoe", &[7])],
                    "pageInfo": { "hasNextPage": true, "endCursor": "abc" }
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client(&server)
        .list_products_page(None, 50, None)
        .await
        .unwrap();

    assert!(page.has_more);
    assert_eq!(page.next_cursor.as_deref(), Some("abc"));

    let product = &page.items[0];
    assert_eq!(product.id, ProductGid::parse("1").unwrap());
    assert_eq!(product.handle, "blue-shoe");
    assert_eq!(product.product_type.as_deref(), Some("Shoes"));
    assert_eq!(product.price, Some(Decimal::from_str("49.90").unwrap()));
    assert_eq!(product.collection_ids, vec![CollectionGid::parse("7").unwrap()]);
}

#[tokio::test]
async fn test_products_by_ids_skips_missing_nodes() {
    let server = MockServer::start().await;
    respond(
        &server,
        "CommissionProductsByIds",
        json!({ "data": { "nodes": [product_node(1, "Blue Shoe", &[]), null] } }),
    )
    .await;

    let ids = [ProductGid::parse("1").unwrap(), ProductGid::parse("2").unwrap()];
    let products = client(&server).get_products_by_ids(&ids).await.unwrap();

    assert_eq!(products.len(), 1);
    assert_eq!(products[0].title, "Blue Shoe");
}

#[tokio::test]
async fn test_missing_product_is_none() {
    let server = MockServer::start().await;
    respond(&server, "CommissionProduct", json!({ "data": { "product": null } })).await;

    let product = client(&server)
        .get_product(&ProductGid::parse("404").unwrap())
        .await
        .unwrap();
    assert!(product.is_none());
}

#[tokio::test]
async fn test_collection_members_are_parsed() {
    let server = MockServer::start().await;
    respond(
        &server,
        "CommissionCollectionProducts",
        json!({
            "data": {
                "collection": {
                    "title": "Summer",
                    "products": { "nodes": [product_node(1, "Blue Shoe", &[9])] }
                }
            }
        }),
    )
    .await;

    let members = client(&server)
        .list_collection_products(&CollectionGid::parse("9").unwrap(), 250)
        .await
        .unwrap();

    assert_eq!(members.title, "Summer");
    assert_eq!(members.products.len(), 1);
}

#[tokio::test]
async fn test_overview_scan_sends_price_only_pages() {
    let server = MockServer::start().await;
    respond(
        &server,
        "CommissionProductPrices",
        json!({
            "data": {
                "products": {
                    "nodes": [
                        {
                            "id": "gid://shopify/Product/1",
                            "priceRangeV2": {
                                "minVariantPrice": { "amount": "20.00", "currencyCode": "USD" }
                            }
                        },
                        { "id": "gid://shopify/Product/2", "priceRangeV2": null }
                    ],
                    "pageInfo": { "hasNextPage": false, "endCursor": null }
                }
            }
        }),
    )
    .await;

    let store = MemoryStore::new();
    let catalog = client(&server);
    let stats = StatsAggregator::new(&store, &catalog)
        .compute_overview(&shop())
        .await
        .unwrap();
    assert_eq!(stats.total_products, 2);

    let sent = sent_queries(&server).await;
    assert_eq!(sent.len(), 1);
    let (query, variables) = &sent[0];
    assert_eq!(variables["first"], 250);
    assert!(!query.contains("collections("), "{query}");
    assert!(!query.contains("featuredImage"), "{query}");
}

#[tokio::test]
async fn test_collection_scope_reads_identity_fields_only() {
    let server = MockServer::start().await;
    respond(
        &server,
        "CommissionCollectionProducts",
        json!({
            "data": {
                "collection": {
                    "title": "Summer",
                    "products": {
                        "nodes": [
                            { "id": "gid://shopify/Product/1", "title": "Blue Shoe", "handle": "blue-shoe" },
                            { "id": "gid://shopify/Product/2", "title": "Red Hat", "handle": "red-hat" }
                        ]
                    }
                }
            }
        }),
    )
    .await;

    let store = MemoryStore::new();
    let catalog = client(&server);
    let outcome = BulkApplier::new(&store, &catalog, 2)
        .apply_to_scope(
            &shop(),
            &BulkScope::Collection(CollectionGid::parse("9").unwrap()),
            &Commission::percentage(Decimal::from(5)),
        )
        .await
        .unwrap();
    assert_eq!(outcome.updated_count, 2);

    let sent = sent_queries(&server).await;
    let (query, variables) = &sent[0];
    assert_eq!(variables["first"], 100);
    assert!(!query.contains("collections("), "{query}");
    assert!(!query.contains("priceRangeV2"), "{query}");
}

#[tokio::test]
async fn test_unknown_collection_is_not_found() {
    let server = MockServer::start().await;
    respond(
        &server,
        "CommissionCollectionProducts",
        json!({ "data": { "collection": null } }),
    )
    .await;

    let result = client(&server)
        .list_collection_products(&CollectionGid::parse("9").unwrap(), 250)
        .await;
    assert!(matches!(result, Err(ShopifyError::NotFound(_))));
}

#[tokio::test]
async fn test_collections_page_is_parsed() {
    let server = MockServer::start().await;
    respond(
        &server,
        "CommissionCollections",
        json!({
            "data": {
                "collections": {
                    "nodes": [{
                        "id": "gid://shopify/Collection/9",
                        "title": "Summer",
                        "handle": "summer",
                        "productsCount": { "count": 12 },
                        "image": null
                    }],
                    "pageInfo": { "hasNextPage": false, "endCursor": null }
                }
            }
        }),
    )
    .await;

    let page = client(&server)
        .list_collections_page(None, 50, Some("sum"))
        .await
        .unwrap();

    assert!(!page.has_more);
    assert_eq!(page.items[0].products_count, 12);
}

#[tokio::test]
async fn test_rate_limit_carries_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "2"))
        .mount(&server)
        .await;

    let result = client(&server).list_products_page(None, 50, None).await;
    assert!(matches!(result, Err(ShopifyError::RateLimited(2))));
}

#[tokio::test]
async fn test_revoked_token_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client(&server).list_products_page(None, 50, None).await;
    assert!(matches!(result, Err(ShopifyError::Unauthorized(_))));
}

#[tokio::test]
async fn test_graphql_errors_are_surfaced() {
    let server = MockServer::start().await;
    respond(
        &server,
        "CommissionProducts",
        json!({ "errors": [{ "message": "Throttled", "path": ["products"] }] }),
    )
    .await;

    let result = client(&server).list_products_page(None, 50, None).await;
    match result {
        Err(ShopifyError::GraphQL(errors)) => assert_eq!(errors[0].message, "Throttled"),
        other => panic!("expected GraphQL error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_provider_points_clients_at_endpoint() {
    let server = MockServer::start().await;
    respond(
        &server,
        "CommissionProduct",
        json!({ "data": { "product": product_node(3, "Red Hat", &[]) } }),
    )
    .await;

    let provider = ShopifyCatalogProvider::new(reqwest::Client::new(), "2025-01")
        .with_endpoint(format!("{}{GRAPHQL_PATH}", server.uri()));
    let catalog = provider.catalog_for(&shop(), &SecretString::from("shpat_test"));

    let product = catalog
        .get_product(&ProductGid::parse("3").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(product.title, "Red Hat");
}
