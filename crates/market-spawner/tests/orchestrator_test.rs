// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tests for the lifecycle orchestrator against mock collaborators.

mod common;

use std::sync::Arc;

use common::{TEST_IMAGE, TestContext};
use market_spawner::Error;
use market_spawner::notifier::MockNotifier;
use market_spawner::provisioner::{MockProvisioner, ProvisioningError};
use market_spawner::registry::Readiness;

// ============================================================================
// Spawn
// ============================================================================

#[tokio::test]
async fn test_spawn_flash_sale_scenario() {
    let ctx = TestContext::new();
    ctx.provisioner
        .assign_address("market-flash-sale-1", "flash1.example-platform.net")
        .await;

    let outcome = ctx.orchestrator.spawn("Flash Sale #1").await.unwrap();

    assert_eq!(outcome.sale_id, "Flash Sale #1");
    assert_eq!(outcome.app_name, "market-flash-sale-1");
    assert_eq!(outcome.url, "wss://flash1.example-platform.net");
    assert_eq!(outcome.grpc_url, "flash1.example-platform.net:50051");
    assert_eq!(outcome.readiness, Readiness::Ready);
    assert_eq!(outcome.message, "ok");

    let calls = ctx.notifier.calls().await;
    assert_eq!(
        calls,
        vec![(
            "flash1.example-platform.net".to_string(),
            "Flash Sale #1".to_string()
        )]
    );
}

#[tokio::test]
async fn test_spawn_then_list_contains_logical_id() {
    let ctx = TestContext::new();

    ctx.orchestrator.spawn("flash-sale-1").await.unwrap();

    let listed = ctx.orchestrator.list().await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].logical_id, "flash-sale-1");
    assert_eq!(listed[0].image_version, "v20260213-111039");
}

#[tokio::test]
async fn test_spawn_passes_sale_id_to_instance_env() {
    let ctx = TestContext::new();

    ctx.orchestrator.spawn("Summer Drop").await.unwrap();

    let env = ctx
        .provisioner
        .workload_env("market-summer-drop")
        .await
        .unwrap();
    let sale_id = env.iter().find(|v| v.name == "SALE_ID").unwrap();
    assert_eq!(sale_id.value.as_deref(), Some("Summer Drop"));
}

#[tokio::test]
async fn test_spawn_without_address_leaves_registry_unchanged() {
    let ctx = TestContext::with(MockProvisioner::without_address(), MockNotifier::new());

    let err = ctx.orchestrator.spawn("flash").await.unwrap_err();

    assert!(matches!(
        err,
        Error::Provisioning(ProvisioningError::MissingAddress(ref name)) if name == "market-flash"
    ));
    assert_eq!(ctx.registry.len().await, 0);
    assert!(ctx.notifier.calls().await.is_empty());
}

#[tokio::test]
async fn test_spawn_rejected_by_platform_propagates_payload() {
    let ctx = TestContext::with(MockProvisioner::failing(), MockNotifier::new());

    let err = ctx.orchestrator.spawn("flash").await.unwrap_err();

    match err {
        Error::Provisioning(e) => {
            assert!(e.payload().unwrap().contains("ContainerAppOperationError"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(ctx.registry.len().await, 0);
}

#[tokio::test]
async fn test_handshake_timeout_is_degraded_not_error() {
    let ctx = TestContext::with(MockProvisioner::new(), MockNotifier::timing_out());

    let outcome = ctx.orchestrator.spawn("flash").await.unwrap();

    assert_eq!(outcome.readiness, Readiness::Degraded);
    assert!(outcome.message.contains("timed out"));
    let entry = ctx.registry.get("flash").await.unwrap();
    assert_eq!(entry.readiness, Readiness::Degraded);
    assert!(ctx.provisioner.contains("market-flash").await);
}

#[tokio::test]
async fn test_handshake_declined_is_degraded_not_error() {
    let ctx = TestContext::with(
        MockProvisioner::new(),
        MockNotifier::declining("sale already running"),
    );

    let outcome = ctx.orchestrator.spawn("flash").await.unwrap();

    assert_eq!(outcome.readiness, Readiness::Degraded);
    assert_eq!(outcome.message, "sale already running");
    assert_eq!(ctx.registry.len().await, 1);
}

#[tokio::test]
async fn test_unreachable_engine_is_degraded() {
    let ctx = TestContext::with(MockProvisioner::new(), MockNotifier::unreachable());

    let outcome = ctx.orchestrator.spawn("flash").await.unwrap();
    assert_eq!(outcome.readiness, Readiness::Degraded);
}

#[tokio::test]
async fn test_respawn_same_sale_updates_in_place() {
    let ctx = TestContext::new();

    ctx.orchestrator.spawn("flash").await.unwrap();
    ctx.orchestrator.spawn("flash").await.unwrap();

    assert_eq!(ctx.provisioner.create_calls(), 2);
    assert_eq!(ctx.registry.len().await, 1);
}

// ============================================================================
// Collisions and concurrency
// ============================================================================

#[tokio::test]
async fn test_name_collision_fails_before_provisioning() {
    let ctx = TestContext::new();
    ctx.orchestrator.spawn("flash-sale").await.unwrap();

    let err = ctx.orchestrator.spawn("FLASH sale").await.unwrap_err();

    match err {
        Error::NameCollision {
            sale_id,
            canonical_name,
            existing_sale_id,
        } => {
            assert_eq!(sale_id, "FLASH sale");
            assert_eq!(canonical_name, "market-flash-sale");
            assert_eq!(existing_sale_id, "flash-sale");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(ctx.provisioner.create_calls(), 1);
}

#[tokio::test]
async fn test_reconciled_alias_is_not_a_collision() {
    let ctx = TestContext::new();
    ctx.provisioner
        .insert_workload("market-flash-sale", Some("f.example.net"), TEST_IMAGE)
        .await;
    ctx.orchestrator.reconcile().await.unwrap();

    let outcome = ctx.orchestrator.spawn("Flash Sale").await.unwrap();

    assert_eq!(outcome.app_name, "market-flash-sale");
    let listed = ctx.orchestrator.list().await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].logical_id, "Flash Sale");
}

#[tokio::test]
async fn test_concurrent_duplicate_spawn_is_rejected() {
    let mut provisioner = MockProvisioner::new();
    provisioner.operation_delay_ms = 200;
    let ctx = TestContext::with(provisioner, MockNotifier::new());

    let first = {
        let orchestrator = ctx.orchestrator.clone();
        tokio::spawn(async move { orchestrator.spawn("flash").await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let second = ctx.orchestrator.spawn("flash").await;
    assert!(matches!(second, Err(Error::OperationInProgress(ref name)) if name == "market-flash"));

    first.await.unwrap().unwrap();
    assert_eq!(ctx.provisioner.create_calls(), 1);

    // Released once the first spawn finished.
    ctx.orchestrator.spawn("flash").await.unwrap();
}

#[tokio::test]
async fn test_different_sales_proceed_concurrently() {
    let mut provisioner = MockProvisioner::new();
    provisioner.operation_delay_ms = 50;
    let ctx = TestContext::with(provisioner, MockNotifier::new());

    let (a, b) = tokio::join!(
        ctx.orchestrator.spawn("sale-a"),
        ctx.orchestrator.spawn("sale-b")
    );
    a.unwrap();
    b.unwrap();

    assert_eq!(ctx.registry.len().await, 2);
}

// ============================================================================
// Kill
// ============================================================================

#[tokio::test]
async fn test_kill_then_list_excludes_sale() {
    let ctx = TestContext::new();
    ctx.orchestrator.spawn("flash-sale-1").await.unwrap();

    ctx.orchestrator.kill("flash-sale-1").await.unwrap();

    assert!(ctx.orchestrator.list().await.is_empty());
    assert!(!ctx.provisioner.contains("market-flash-sale-1").await);
    assert_eq!(ctx.provisioner.delete_calls(), 1);
}

#[tokio::test]
async fn test_kill_uses_same_derivation_as_spawn() {
    let ctx = TestContext::new();
    ctx.orchestrator.spawn("Flash Sale #1").await.unwrap();

    ctx.orchestrator.kill("Flash Sale #1").await.unwrap();

    assert!(ctx.provisioner.workload_names().await.is_empty());
}

#[tokio::test]
async fn test_kill_missing_workload_fails_and_keeps_registry() {
    let ctx = TestContext::new();
    ctx.orchestrator.spawn("other").await.unwrap();

    let err = ctx.orchestrator.kill("flash-sale-1").await.unwrap_err();

    assert!(matches!(
        err,
        Error::Provisioning(ProvisioningError::NotFound(_))
    ));
    assert_eq!(ctx.provisioner.delete_calls(), 1);
    assert_eq!(ctx.registry.len().await, 1);
}

#[tokio::test]
async fn test_kill_failure_keeps_registry_entry() {
    let ctx = TestContext::new();
    ctx.orchestrator.spawn("flash").await.unwrap();

    // Same registry, platform no longer reachable.
    let unreachable = Arc::new(MockProvisioner::unreachable());
    let orchestrator = market_spawner::Orchestrator::new(
        unreachable.clone(),
        ctx.notifier.clone(),
        ctx.registry.clone(),
        common::test_template(),
    );

    assert!(orchestrator.kill("flash").await.is_err());
    assert_eq!(unreachable.delete_calls(), 1);
    assert!(ctx.registry.get("flash").await.is_some());
}

// ============================================================================
// Reconciliation
// ============================================================================

#[tokio::test]
async fn test_reconcile_follows_every_page() {
    let ctx = TestContext::new();
    for i in 0..5 {
        ctx.provisioner
            .insert_workload(&format!("market-sale-{i}"), Some("h.example.net"), TEST_IMAGE)
            .await;
    }
    ctx.provisioner
        .insert_workload("unrelated-app", Some("u.example.net"), "nginx:1")
        .await;

    let count = ctx.orchestrator.reconcile().await.unwrap();

    assert_eq!(count, 5);
    let listed = ctx.orchestrator.list().await;
    assert!(listed.iter().all(|s| s.readiness == Readiness::Unknown));
    assert_eq!(listed[0].logical_id, "sale-0");
    assert_eq!(listed[0].public_url.as_deref(), Some("wss://h.example.net"));
    assert_eq!(listed[0].image_version, "v20260213-111039");
}

#[tokio::test]
async fn test_reconcile_failure_leaves_registry_alone() {
    let ctx = TestContext::with(MockProvisioner::unreachable(), MockNotifier::new());

    assert!(ctx.orchestrator.reconcile().await.is_err());
    assert!(ctx.orchestrator.list().await.is_empty());
}
