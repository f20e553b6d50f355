// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Spawner request handlers.
//!
//! Transport-independent: the HTTP layer in [`crate::server`] only decodes
//! requests and encodes these results.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::error::Result;
use crate::orchestrator::{Orchestrator, SpawnOutcome};
use crate::registry::{Readiness, SaleInstance};

/// Shared state for spawner handlers.
pub struct SpawnerHandlerState {
    /// Lifecycle orchestrator.
    pub orchestrator: Arc<Orchestrator>,
    /// When the server started (for uptime calculation).
    pub start_time: std::time::Instant,
    /// Server version string.
    pub version: String,
}

impl SpawnerHandlerState {
    /// Create handler state around an orchestrator.
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            start_time: std::time::Instant::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Get the server uptime in milliseconds.
    pub fn uptime_ms(&self) -> i64 {
        self.start_time.elapsed().as_millis() as i64
    }
}

// ============================================================================
// Health Check
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResponse {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
    /// Server uptime in milliseconds.
    pub uptime_ms: i64,
    /// Instances currently registered.
    pub instances: usize,
    /// Provisioning backend in use.
    pub provisioner: &'static str,
}

/// Handle health check request.
pub async fn handle_health_check(state: &SpawnerHandlerState) -> HealthCheckResponse {
    HealthCheckResponse {
        healthy: true,
        version: state.version.clone(),
        uptime_ms: state.uptime_ms(),
        instances: state.orchestrator.registry().len().await,
        provisioner: state.orchestrator.provisioner_type(),
    }
}

// ============================================================================
// List Sales
// ============================================================================

/// One entry of the sales listing.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SaleSummary {
    /// Sale ID
    pub id: String,
    /// Canonical instance name
    pub name: String,
    /// Client URL, if known
    pub url: Option<String>,
    /// Deployed image tag
    pub version: String,
    /// Handshake outcome
    pub status: Readiness,
}

impl From<SaleInstance> for SaleSummary {
    fn from(instance: SaleInstance) -> Self {
        Self {
            id: instance.logical_id,
            name: instance.canonical_name,
            url: instance.public_url,
            version: instance.image_version,
            status: instance.readiness,
        }
    }
}

/// Handle list sales request.
pub async fn handle_list_sales(state: &SpawnerHandlerState) -> Vec<SaleSummary> {
    state
        .orchestrator
        .list()
        .await
        .into_iter()
        .map(SaleSummary::from)
        .collect()
}

// ============================================================================
// Spawn Sale
// ============================================================================

/// Request to spawn a sale instance.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnSaleRequest {
    /// Sale ID; missing or `null` is treated as empty.
    #[serde(default)]
    pub sale_id: Option<String>,
}

/// Handle spawn sale request.
pub async fn handle_spawn_sale(
    state: &SpawnerHandlerState,
    request: SpawnSaleRequest,
) -> Result<SpawnOutcome> {
    let sale_id = request.sale_id.unwrap_or_default();
    info!(sale_id = %sale_id, "Spawn sale request received");
    state.orchestrator.spawn(&sale_id).await
}

// ============================================================================
// Delete Sale
// ============================================================================

/// Response to a confirmed deletion.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteSaleResponse {
    /// Human-readable confirmation
    pub message: String,
}

/// Handle delete sale request.
pub async fn handle_delete_sale(
    state: &SpawnerHandlerState,
    sale_id: &str,
) -> Result<DeleteSaleResponse> {
    info!(sale_id = %sale_id, "Delete sale request received");
    state.orchestrator.kill(sale_id).await?;
    Ok(DeleteSaleResponse {
        message: "Sale deleted".to_string(),
    })
}
