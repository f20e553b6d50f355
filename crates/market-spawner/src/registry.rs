// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Instance Registry
//!
//! In-memory cache of the sale instances this controller believes are live.
//! The cloud platform stays the source of truth; the registry is rebuilt from
//! it at startup and otherwise only changes after a confirmed create or a
//! confirmed delete.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::naming;

/// Outcome of the readiness handshake for an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    /// The engine acknowledged its sale.
    Ready,
    /// Provisioned and billable, but the handshake failed or was declined.
    Degraded,
    /// Discovered on the platform; never handshaken by this process.
    Unknown,
}

impl Readiness {
    /// Lower-case label used on the wire and in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Readiness::Ready => "ready",
            Readiness::Degraded => "degraded",
            Readiness::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Readiness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One live sale instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleInstance {
    /// Caller-supplied sale ID
    pub logical_id: String,
    /// Platform name derived from the sale ID
    pub canonical_name: String,
    /// Client URL (`wss://<fqdn>`), absent when the platform reports no address
    pub public_url: Option<String>,
    /// Control channel address (`<fqdn>:<port>`)
    pub control_url: Option<String>,
    /// Tag of the deployed image
    pub image_version: String,
    /// Handshake outcome
    pub readiness: Readiness,
    /// When this process registered the instance
    pub registered_at: DateTime<Utc>,
}

impl SaleInstance {
    /// Whether this entry came from startup reconciliation rather than a spawn.
    ///
    /// Reconciled entries carry the prefix-stripped name as their logical ID.
    pub fn is_reconciled(&self) -> bool {
        naming::logical_id_from_name(&self.canonical_name) == Some(self.logical_id.as_str())
            && self.readiness == Readiness::Unknown
    }
}

/// Registry of live sale instances keyed by logical ID.
#[derive(Debug, Default)]
pub struct InstanceRegistry {
    instances: RwLock<HashMap<String, SaleInstance>>,
}

impl InstanceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole content, as done by startup reconciliation.
    pub async fn replace_all(&self, instances: Vec<SaleInstance>) {
        let fresh: HashMap<String, SaleInstance> = instances
            .into_iter()
            .map(|instance| (instance.logical_id.clone(), instance))
            .collect();
        *self.instances.write().await = fresh;
    }

    /// Record a confirmed creation.
    ///
    /// Drops any other entry for the same canonical name first, so an
    /// instance known under its reconciled alias is not listed twice.
    pub async fn confirm_created(&self, instance: SaleInstance) {
        let mut instances = self.instances.write().await;
        instances.retain(|_, existing| existing.canonical_name != instance.canonical_name);
        instances.insert(instance.logical_id.clone(), instance);
    }

    /// Record a confirmed deletion. Returns how many entries were removed.
    pub async fn confirm_deleted(&self, canonical_name: &str) -> usize {
        let mut instances = self.instances.write().await;
        let before = instances.len();
        instances.retain(|_, existing| existing.canonical_name != canonical_name);
        before - instances.len()
    }

    /// Snapshot of every instance, ordered by canonical name.
    pub async fn list(&self) -> Vec<SaleInstance> {
        let mut all: Vec<SaleInstance> = self.instances.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.canonical_name.cmp(&b.canonical_name));
        all
    }

    /// Look up by logical ID.
    pub async fn get(&self, logical_id: &str) -> Option<SaleInstance> {
        self.instances.read().await.get(logical_id).cloned()
    }

    /// Look up by canonical name.
    pub async fn find_by_name(&self, canonical_name: &str) -> Option<SaleInstance> {
        self.instances
            .read()
            .await
            .values()
            .find(|instance| instance.canonical_name == canonical_name)
            .cloned()
    }

    /// Number of registered instances.
    pub async fn len(&self) -> usize {
        self.instances.read().await.len()
    }
}
