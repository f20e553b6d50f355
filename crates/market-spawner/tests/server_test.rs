// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tests for the HTTP surface.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use common::TestContext;
use market_spawner::notifier::MockNotifier;
use market_spawner::provisioner::MockProvisioner;
use market_spawner::runtime::SpawnerRuntime;
use market_spawner::server::router;

async fn send(ctx: &TestContext, request: Request<Body>) -> (StatusCode, Value) {
    let response = router(ctx.handler_state()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn spawn_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/sales/spawn")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

// ============================================================================
// POST /sales/spawn
// ============================================================================

#[tokio::test]
async fn test_spawn_returns_instance_descriptor() {
    let ctx = TestContext::new();
    ctx.provisioner
        .assign_address("market-flash-sale-1", "flash1.example-platform.net")
        .await;

    let (status, body) = send(&ctx, spawn_request(json!({"saleId": "Flash Sale #1"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["saleId"], "Flash Sale #1");
    assert_eq!(body["appName"], "market-flash-sale-1");
    assert_eq!(body["url"], "wss://flash1.example-platform.net");
    assert_eq!(body["grpcUrl"], "flash1.example-platform.net:50051");
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_spawn_with_failed_handshake_still_succeeds() {
    let ctx = TestContext::with(MockProvisioner::new(), MockNotifier::unreachable());

    let (status, body) = send(&ctx, spawn_request(json!({"saleId": "flash"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn test_spawn_without_sale_id_is_bad_request() {
    let ctx = TestContext::new();

    let (status, body) = send(&ctx, spawn_request(json!({}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("saleId"));
    assert_eq!(ctx.provisioner.create_calls(), 0);
}

#[tokio::test]
async fn test_spawn_with_null_sale_id_is_bad_request() {
    let ctx = TestContext::new();

    let (status, body) = send(&ctx, spawn_request(json!({"saleId": null}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("saleId"));
    assert_eq!(ctx.provisioner.create_calls(), 0);
}

#[tokio::test]
async fn test_spawn_with_non_string_sale_id_is_bad_request() {
    let ctx = TestContext::new();

    let (status, body) = send(&ctx, spawn_request(json!({"saleId": 5}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("saleId"));
    assert_eq!(ctx.provisioner.create_calls(), 0);
}

#[tokio::test]
async fn test_spawn_with_malformed_body_is_bad_request() {
    let ctx = TestContext::new();
    let request = Request::builder()
        .method("POST")
        .uri("/sales/spawn")
        .header("content-type", "application/json")
        .body(Body::from("{\"saleId\":"))
        .unwrap();

    let (status, body) = send(&ctx, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_spawn_platform_rejection_is_bad_gateway_with_details() {
    let ctx = TestContext::with(MockProvisioner::failing(), MockNotifier::new());

    let (status, body) = send(&ctx, spawn_request(json!({"saleId": "flash"}))).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(
        body["details"]
            .as_str()
            .unwrap()
            .contains("ContainerAppOperationError")
    );
}

#[tokio::test]
async fn test_spawn_name_collision_is_conflict() {
    let ctx = TestContext::new();
    send(&ctx, spawn_request(json!({"saleId": "flash-sale"}))).await;

    let (status, _) = send(&ctx, spawn_request(json!({"saleId": "Flash Sale"}))).await;

    assert_eq!(status, StatusCode::CONFLICT);
}

// ============================================================================
// GET /sales
// ============================================================================

#[tokio::test]
async fn test_list_after_spawn() {
    let ctx = TestContext::new();
    send(&ctx, spawn_request(json!({"saleId": "flash-sale-1"}))).await;

    let (status, body) = send(&ctx, get("/sales")).await;

    assert_eq!(status, StatusCode::OK);
    let sales = body.as_array().unwrap();
    assert_eq!(sales.len(), 1);
    assert_eq!(sales[0]["id"], "flash-sale-1");
    assert_eq!(sales[0]["name"], "market-flash-sale-1");
    assert_eq!(sales[0]["version"], "v20260213-111039");
    assert_eq!(sales[0]["status"], "ready");
}

#[tokio::test]
async fn test_list_is_empty_initially() {
    let ctx = TestContext::new();

    let (status, body) = send(&ctx, get("/sales")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

// ============================================================================
// DELETE /sales/{id}
// ============================================================================

#[tokio::test]
async fn test_delete_existing_sale() {
    let ctx = TestContext::new();
    send(&ctx, spawn_request(json!({"saleId": "flash-sale-1"}))).await;

    let (status, body) = send(&ctx, delete("/sales/flash-sale-1")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Sale deleted"}));

    let (_, listed) = send(&ctx, get("/sales")).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn test_delete_unknown_sale_is_not_found_and_registry_unchanged() {
    let ctx = TestContext::new();
    send(&ctx, spawn_request(json!({"saleId": "other"}))).await;

    let (status, body) = send(&ctx, delete("/sales/flash-sale-1")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("market-flash-sale-1"));
    assert_eq!(ctx.registry.len().await, 1);
}

// ============================================================================
// GET /health
// ============================================================================

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::new();

    let (status, body) = send(&ctx, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["healthy"], true);
    assert_eq!(body["instances"], 0);
    assert_eq!(body["provisioner"], "mock");
    assert!(body["uptimeMs"].is_number());
}

// ============================================================================
// Startup
// ============================================================================

#[tokio::test]
async fn test_unreachable_platform_at_startup_still_serves_empty_list() {
    let runtime = SpawnerRuntime::builder()
        .provisioner(Arc::new(MockProvisioner::unreachable()))
        .notifier(Arc::new(MockNotifier::new()))
        .template(common::test_template())
        .bind_addr("127.0.0.1:0".parse().unwrap())
        .build()
        .unwrap()
        .start()
        .await
        .unwrap();

    let response = router(runtime.state().clone())
        .oneshot(get("/sales"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"[]");

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_startup_reconciliation_populates_list() {
    let provisioner = Arc::new(MockProvisioner::new());
    provisioner
        .insert_workload("market-flash", Some("flash.example.net"), common::TEST_IMAGE)
        .await;

    let runtime = SpawnerRuntime::builder()
        .provisioner(provisioner)
        .notifier(Arc::new(MockNotifier::new()))
        .bind_addr("127.0.0.1:0".parse().unwrap())
        .build()
        .unwrap()
        .start()
        .await
        .unwrap();

    let sales = runtime.orchestrator().list().await;
    assert_eq!(sales.len(), 1);
    assert_eq!(sales[0].logical_id, "flash");
    assert_eq!(sales[0].public_url.as_deref(), Some("wss://flash.example.net"));

    runtime.shutdown().await.unwrap();
}
