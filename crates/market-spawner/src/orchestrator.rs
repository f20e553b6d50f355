// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Lifecycle orchestration.
//!
//! Turns "start sale X" into a provisioned, reachable, engine-acknowledged
//! instance, and "stop sale X" into a confirmed deletion.
//!
//! Provisioning failures are fatal and leave the registry untouched. A failed
//! readiness handshake is not: the instance already runs and is billed, so it
//! is registered as [`Readiness::Degraded`] and returned to the caller.
//! Nothing here retries on its own.

use chrono::Utc;
use dashmap::DashSet;
use futures::TryStreamExt;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::naming::{self, NAMESPACE_PREFIX};
use crate::notifier::ReadinessNotifier;
use crate::provisioner::{
    DeploymentTemplate, ManagedWorkload, ProvisionRequest, Provisioner, ProvisioningError,
};
use crate::registry::{InstanceRegistry, Readiness, SaleInstance};

/// Phases of a spawn, reported in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnPhase {
    /// Computing the canonical name.
    Deriving,
    /// Waiting on the platform.
    Provisioning,
    /// Handshaking with the engine.
    Notifying,
    /// Engine acknowledged.
    Ready,
    /// Platform rejected or failed the deployment.
    ProvisionFailed,
    /// Deployed, but the handshake failed.
    Degraded,
}

impl std::fmt::Display for SpawnPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SpawnPhase::Deriving => "deriving",
            SpawnPhase::Provisioning => "provisioning",
            SpawnPhase::Notifying => "notifying",
            SpawnPhase::Ready => "ready",
            SpawnPhase::ProvisionFailed => "provision_failed",
            SpawnPhase::Degraded => "degraded",
        };
        f.write_str(label)
    }
}

/// Result of a successful spawn, degraded or not.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnOutcome {
    /// Caller-supplied sale ID
    pub sale_id: String,
    /// Canonical instance name
    pub app_name: String,
    /// Client URL, `wss://<fqdn>`
    pub url: String,
    /// Control channel address, `<fqdn>:<port>`
    pub grpc_url: String,
    /// Handshake outcome
    #[serde(rename = "status")]
    pub readiness: Readiness,
    /// Engine message, or the handshake failure
    pub message: String,
}

/// Startup reconciliation could not list the platform.
#[derive(Debug, thiserror::Error)]
#[error("Reconciliation failed: {0}")]
pub struct ReconciliationError(#[from] pub ProvisioningError);

/// Marks a canonical name busy until dropped.
struct InFlightGuard<'a> {
    in_flight: &'a DashSet<String>,
    canonical_name: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.remove(&self.canonical_name);
    }
}

/// Drives spawn, kill and reconciliation against the platform.
pub struct Orchestrator {
    provisioner: Arc<dyn Provisioner>,
    notifier: Arc<dyn ReadinessNotifier>,
    registry: Arc<InstanceRegistry>,
    template: DeploymentTemplate,
    in_flight: DashSet<String>,
}

impl Orchestrator {
    /// Create an orchestrator over the given collaborators.
    pub fn new(
        provisioner: Arc<dyn Provisioner>,
        notifier: Arc<dyn ReadinessNotifier>,
        registry: Arc<InstanceRegistry>,
        template: DeploymentTemplate,
    ) -> Self {
        Self {
            provisioner,
            notifier,
            registry,
            template,
            in_flight: DashSet::new(),
        }
    }

    /// The registry this orchestrator maintains.
    pub fn registry(&self) -> &Arc<InstanceRegistry> {
        &self.registry
    }

    /// Backend identifier of the provisioner.
    pub fn provisioner_type(&self) -> &'static str {
        self.provisioner.provisioner_type()
    }

    fn claim(&self, canonical_name: &str) -> Result<InFlightGuard<'_>> {
        if !self.in_flight.insert(canonical_name.to_string()) {
            return Err(Error::OperationInProgress(canonical_name.to_string()));
        }
        Ok(InFlightGuard {
            in_flight: &self.in_flight,
            canonical_name: canonical_name.to_string(),
        })
    }

    fn control_url(&self, fqdn: &str) -> String {
        format!("{}:{}", fqdn, self.template.control_port)
    }

    /// Provision an instance for `sale_id` and hand it its sale.
    pub async fn spawn(&self, sale_id: &str) -> Result<SpawnOutcome> {
        if sale_id.trim().is_empty() {
            return Err(Error::InvalidRequest("saleId is required".to_string()));
        }

        let canonical_name = naming::derive_name(sale_id);
        info!(
            sale_id = %sale_id,
            canonical_name = %canonical_name,
            phase = %SpawnPhase::Deriving,
            "Spawn requested"
        );

        if let Some(existing) = self.registry.find_by_name(&canonical_name).await
            && existing.logical_id != sale_id
            && !existing.is_reconciled()
        {
            warn!(
                sale_id = %sale_id,
                canonical_name = %canonical_name,
                existing_sale_id = %existing.logical_id,
                "Canonical name already owned by another sale"
            );
            return Err(Error::NameCollision {
                sale_id: sale_id.to_string(),
                canonical_name,
                existing_sale_id: existing.logical_id,
            });
        }

        let _guard = self.claim(&canonical_name)?;

        let request = ProvisionRequest::for_sale(&self.template, sale_id, &canonical_name);
        debug!(canonical_name = %canonical_name, phase = %SpawnPhase::Provisioning, "Submitting deployment");

        let result = match self.provisioner.create_or_update(&request).await {
            Ok(result) => result,
            Err(e) => {
                error!(
                    canonical_name = %canonical_name,
                    phase = %SpawnPhase::ProvisionFailed,
                    error = %e,
                    payload = e.payload().unwrap_or_default(),
                    "Deployment failed"
                );
                return Err(e.into());
            }
        };

        let Some(fqdn) = result.address().map(str::to_string) else {
            error!(
                canonical_name = %canonical_name,
                phase = %SpawnPhase::ProvisionFailed,
                "Deployment finished without an address"
            );
            return Err(ProvisioningError::MissingAddress(canonical_name).into());
        };

        let url = format!("wss://{}", fqdn);
        let grpc_url = self.control_url(&fqdn);
        info!(canonical_name = %canonical_name, address = %grpc_url, phase = %SpawnPhase::Notifying, "Instance deployed");

        let (readiness, message) = match self.notifier.notify(&fqdn, sale_id).await {
            Ok(ack) if ack.success => {
                info!(
                    sale_id = %sale_id,
                    address = %grpc_url,
                    phase = %SpawnPhase::Ready,
                    engine_message = %ack.message,
                    "Engine acknowledged sale"
                );
                (Readiness::Ready, ack.message)
            }
            Ok(ack) => {
                warn!(
                    sale_id = %sale_id,
                    address = %grpc_url,
                    phase = %SpawnPhase::Degraded,
                    engine_message = %ack.message,
                    "Engine declined sale (instance still running)"
                );
                (Readiness::Degraded, ack.message)
            }
            Err(e) => {
                error!(
                    sale_id = %sale_id,
                    address = %grpc_url,
                    phase = %SpawnPhase::Degraded,
                    error = %e,
                    "Readiness handshake failed (instance still running)"
                );
                (Readiness::Degraded, e.to_string())
            }
        };

        let image = result.image.as_deref().unwrap_or(&request.image);
        self.registry
            .confirm_created(SaleInstance {
                logical_id: sale_id.to_string(),
                canonical_name: canonical_name.clone(),
                public_url: Some(url.clone()),
                control_url: Some(grpc_url.clone()),
                image_version: naming::image_version(image),
                readiness,
                registered_at: Utc::now(),
            })
            .await;

        Ok(SpawnOutcome {
            sale_id: sale_id.to_string(),
            app_name: canonical_name,
            url,
            grpc_url,
            readiness,
            message,
        })
    }

    /// Delete the instance for `sale_id`.
    ///
    /// The registry entry goes away only once the platform confirms removal.
    pub async fn kill(&self, sale_id: &str) -> Result<()> {
        if sale_id.trim().is_empty() {
            return Err(Error::InvalidRequest("sale id is required".to_string()));
        }

        let canonical_name = naming::derive_name(sale_id);
        let _guard = self.claim(&canonical_name)?;
        info!(sale_id = %sale_id, canonical_name = %canonical_name, "Delete requested");

        match self.provisioner.delete(&canonical_name).await {
            Ok(()) => {
                let removed = self.registry.confirm_deleted(&canonical_name).await;
                info!(canonical_name = %canonical_name, removed, "Instance deleted");
                Ok(())
            }
            Err(e) => {
                error!(
                    canonical_name = %canonical_name,
                    error = %e,
                    payload = e.payload().unwrap_or_default(),
                    "Delete failed"
                );
                Err(e.into())
            }
        }
    }

    /// Rebuild the registry from what the platform currently runs.
    ///
    /// Returns the number of instances found. On error the registry is left
    /// as it was.
    pub async fn reconcile(&self) -> std::result::Result<usize, ReconciliationError> {
        let mut workloads = self.provisioner.list(NAMESPACE_PREFIX);
        let mut instances = Vec::new();

        while let Some(workload) = workloads.try_next().await? {
            if let Some(instance) = self.reconciled_instance(workload) {
                instances.push(instance);
            }
        }

        let count = instances.len();
        self.registry.replace_all(instances).await;
        info!(count, "Registry synchronised with platform");
        Ok(count)
    }

    fn reconciled_instance(&self, workload: ManagedWorkload) -> Option<SaleInstance> {
        let logical_id = naming::logical_id_from_name(&workload.canonical_name)?.to_string();
        Some(SaleInstance {
            logical_id,
            public_url: workload.fqdn.as_ref().map(|fqdn| format!("wss://{}", fqdn)),
            control_url: workload.fqdn.as_deref().map(|fqdn| self.control_url(fqdn)),
            canonical_name: workload.canonical_name,
            image_version: workload.image_version,
            readiness: Readiness::Unknown,
            registered_at: Utc::now(),
        })
    }

    /// Snapshot of the registered instances.
    pub async fn list(&self) -> Vec<SaleInstance> {
        self.registry.list().await
    }
}
