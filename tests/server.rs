//! HTTP surface: routing, error envelope, CORS.
//!
//! None of these requests reach a provider, so the engine runs with the
//! default configuration.

use serde_json::{json, Value};
use std::sync::Arc;

use trace_osint::config::Config;
use trace_osint::search::SearchEngine;
use trace_osint::server::router;

async fn spawn() -> String {
    let engine = Arc::new(SearchEngine::from_config(&Config::default()).unwrap());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(engine)).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_health() {
    let base = spawn().await;
    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_providers_lists_every_probe() {
    let base = spawn().await;
    let body: Value = reqwest::get(format!("{}/providers", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let providers = body["providers"].as_array().unwrap();
    assert_eq!(providers.len(), 23);
    assert_eq!(providers[0]["name"], "GitHub");
    assert_eq!(providers[0]["kind"], "username");
    assert_eq!(providers[0]["credential"], "not required");
}

#[tokio::test]
async fn test_unknown_kind_is_not_found() {
    let base = spawn().await;
    let response = reqwest::Client::new()
        .post(format!("{}/search/fax", base))
        .json(&json!({ "query": "123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_empty_query_is_bad_request() {
    let base = spawn().await;
    let response = reqwest::Client::new()
        .post(format!("{}/search/username", base))
        .json(&json!({ "query": "  @ " }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
    assert!(!body["error"]["message"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_non_image_data_uri_is_bad_request() {
    let base = spawn().await;
    let response = reqwest::Client::new()
        .post(format!("{}/search/image", base))
        .json(&json!({ "image": "data:text/plain;base64,aGVsbG8=", "filename": "a.txt" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_invalid_email_is_a_report_not_an_error() {
    let base = spawn().await;
    let response = reqwest::Client::new()
        .post(format!("{}/search/email", base))
        .json(&json!({ "query": "not-an-email" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["searchType"], "email");
    assert_eq!(body["valid"], false);
    assert_eq!(body["error"], "Invalid email format");
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let base = spawn().await;
    let response = reqwest::Client::new()
        .get(format!("{}/health", base))
        .header("Origin", "http://example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}
