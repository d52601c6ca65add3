//! End-to-end tests for the product routes.

use axum::http::StatusCode;
use serde_json::{json, Value};

mod common;

fn content_type(res: &reqwest::Response) -> Option<&str> {
    res.headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
}

#[tokio::test]
async fn goodbye_is_plain() {
    let server = common::start_service(&common::test_config()).await;

    let res = common::client()
        .get(common::url(&server, "/goodbye"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_ne!(content_type(&res), Some("application/json"));
    assert_eq!(res.text().await.unwrap(), "Goodbye");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn list_returns_seeded_products_as_json() {
    let server = common::start_service(&common::test_config()).await;

    let res = common::client()
        .get(common::url(&server, "/"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(content_type(&res), Some("application/json"));

    let products: Vec<Value> = res.json().await.unwrap();
    let names: Vec<_> = products.iter().map(|p| p["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["Latte", "Espresso"]);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn put_with_non_uuid_id_is_not_found() {
    let server = common::start_service(&common::test_config()).await;

    let res = common::client()
        .put(common::url(&server, "/not-a-uuid"))
        .json(&json!({ "name": "Mocha", "price": 3.1, "sku": "abc-def-ghi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn post_rejects_malformed_json_before_creating() {
    let server = common::start_service(&common::test_config()).await;
    let client = common::client();

    let res = client
        .post(common::url(&server, "/"))
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(content_type(&res), Some("application/json"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "payload validation failed");

    let products: Vec<Value> = client
        .get(common::url(&server, "/"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(products.len(), 2);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn post_rejects_rule_violations() {
    let server = common::start_service(&common::test_config()).await;

    let res = common::client()
        .post(common::url(&server, "/"))
        .json(&json!({ "name": "", "price": -1.0, "sku": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["errors"].as_array().unwrap().len(), 3);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn create_update_and_fetch() {
    let server = common::start_service(&common::test_config()).await;
    let client = common::client();

    let res = client
        .post(common::url(&server, "/"))
        .json(&json!({ "name": "Mocha", "price": 3.1, "sku": "moc-cha-one" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(content_type(&res), Some("application/json"));
    let created: Value = res.json().await.unwrap();
    let id = created["id"].as_str().unwrap().to_string();

    let res = client
        .put(common::url(&server, &format!("/{id}")))
        .json(&json!({ "name": "Mocha", "price": 3.5, "sku": "moc-cha-one" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let fetched: Value = client
        .get(common::url(&server, &format!("/{id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["price"], 3.5);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn update_of_unknown_product_is_not_found() {
    let server = common::start_service(&common::test_config()).await;

    let res = common::client()
        .put(common::url(&server, "/5b0e4b7c-2c41-4f52-9a57-1bb2f0c1d2e3"))
        .json(&json!({ "name": "Mocha", "price": 3.1, "sku": "abc-def-ghi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let server = common::start_service(&common::test_config()).await;

    let res = common::client()
        .delete(common::url(&server, "/"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.text().await.unwrap(), "404 page not found\n");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn method_not_allowed_when_enabled() {
    let mut config = common::test_config();
    config.routing.method_not_allowed = true;
    let server = common::start_service(&config).await;

    let res = common::client()
        .delete(common::url(&server, "/"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    let allow = res.headers().get(reqwest::header::ALLOW).unwrap().to_str().unwrap();
    assert!(allow.contains("GET") && allow.contains("POST"));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn request_id_is_generated_and_propagated() {
    let server = common::start_service(&common::test_config()).await;
    let client = common::client();

    let res = client
        .get(common::url(&server, "/goodbye"))
        .send()
        .await
        .unwrap();
    let generated = res.headers().get("x-request-id").unwrap().to_str().unwrap();
    assert_eq!(generated.len(), 36);

    let res = client
        .get(common::url(&server, "/goodbye"))
        .header("x-request-id", "trace-me")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers().get("x-request-id").unwrap(), "trace-me");

    server.shutdown().await.unwrap();
}
