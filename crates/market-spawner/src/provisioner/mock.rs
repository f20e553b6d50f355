// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mock provisioner for testing.
//!
//! Keeps the "platform" state in memory so tests can drive the orchestrator
//! without a cloud account.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

use super::traits::*;
use crate::naming;

/// Workload held by the mock platform.
#[derive(Debug, Clone)]
struct MockWorkload {
    fqdn: Option<String>,
    image: String,
    env: Vec<EnvVar>,
}

/// Mock provisioner for testing.
pub struct MockProvisioner {
    workloads: Arc<Mutex<BTreeMap<String, MockWorkload>>>,
    addresses: Mutex<HashMap<String, String>>,
    create_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    /// Domain suffix for generated FQDNs
    pub fqdn_suffix: String,
    /// Optional delay to simulate platform latency (in milliseconds)
    pub operation_delay_ms: u64,
    /// If true, create-or-update is rejected by the platform
    pub fail_by_default: bool,
    /// If true, provisioning succeeds but no FQDN is assigned
    pub withhold_address: bool,
    /// If true, every call fails as if the platform could not be reached
    pub unreachable: bool,
    /// Workloads per listing page
    pub page_size: usize,
}

impl Default for MockProvisioner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvisioner {
    /// Create a new mock provisioner.
    pub fn new() -> Self {
        Self {
            workloads: Arc::new(Mutex::new(BTreeMap::new())),
            addresses: Mutex::new(HashMap::new()),
            create_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            fqdn_suffix: "example-platform.net".to_string(),
            operation_delay_ms: 0,
            fail_by_default: false,
            withhold_address: false,
            unreachable: false,
            page_size: 2,
        }
    }

    /// Create a mock provisioner that rejects every create-or-update.
    pub fn failing() -> Self {
        Self {
            fail_by_default: true,
            ..Self::new()
        }
    }

    /// Create a mock provisioner that never assigns an address.
    pub fn without_address() -> Self {
        Self {
            withhold_address: true,
            ..Self::new()
        }
    }

    /// Create a mock provisioner whose platform cannot be reached.
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::new()
        }
    }

    /// Pin the FQDN assigned to `canonical_name` on its next creation.
    pub async fn assign_address(&self, canonical_name: &str, fqdn: &str) {
        self.addresses
            .lock()
            .await
            .insert(canonical_name.to_string(), fqdn.to_string());
    }

    /// Place a workload on the platform directly, bypassing the provisioner.
    pub async fn insert_workload(&self, canonical_name: &str, fqdn: Option<&str>, image: &str) {
        self.workloads.lock().await.insert(
            canonical_name.to_string(),
            MockWorkload {
                fqdn: fqdn.map(str::to_string),
                image: image.to_string(),
                env: Vec::new(),
            },
        );
    }

    /// Whether the platform currently holds `canonical_name`.
    pub async fn contains(&self, canonical_name: &str) -> bool {
        self.workloads.lock().await.contains_key(canonical_name)
    }

    /// Names of every workload on the platform.
    pub async fn workload_names(&self) -> Vec<String> {
        self.workloads.lock().await.keys().cloned().collect()
    }

    /// Environment bindings the workload was last deployed with.
    pub async fn workload_env(&self, canonical_name: &str) -> Option<Vec<EnvVar>> {
        self.workloads
            .lock()
            .await
            .get(canonical_name)
            .map(|w| w.env.clone())
    }

    /// Number of create-or-update calls received.
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of delete calls received.
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        if self.operation_delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.operation_delay_ms)).await;
        }
    }

    fn check_reachable(&self) -> Result<()> {
        if self.unreachable {
            return Err(ProvisioningError::Other(
                "management endpoint unreachable".to_string(),
            ));
        }
        Ok(())
    }

    /// One page of workloads strictly after `after`, in name order.
    async fn page(&self, prefix: &str, after: Option<&str>) -> Vec<ManagedWorkload> {
        let workloads = self.workloads.lock().await;
        let lower = match after {
            Some(name) => Bound::Excluded(name.to_string()),
            None => Bound::Unbounded,
        };
        workloads
            .range((lower, Bound::Unbounded))
            .filter(|(name, _)| name.starts_with(prefix))
            .take(self.page_size.max(1))
            .map(|(name, w)| ManagedWorkload {
                canonical_name: name.clone(),
                fqdn: w.fqdn.clone(),
                image_version: naming::image_version(&w.image),
            })
            .collect()
    }
}

#[async_trait]
impl Provisioner for MockProvisioner {
    fn provisioner_type(&self) -> &'static str {
        "mock"
    }

    fn list<'a>(&'a self, prefix: &'a str) -> WorkloadStream<'a> {
        Box::pin(async_stream::try_stream! {
            self.check_reachable()?;
            self.simulate_latency().await;
            let mut after: Option<String> = None;
            loop {
                let page = self.page(prefix, after.as_deref()).await;
                let Some(last) = page.last() else { break };
                after = Some(last.canonical_name.clone());
                for workload in page {
                    yield workload;
                }
            }
        })
    }

    async fn create_or_update(&self, request: &ProvisionRequest) -> Result<ProvisionResult> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        self.simulate_latency().await;

        if self.fail_by_default {
            let payload = serde_json::json!({
                "error": {
                    "code": "ContainerAppOperationError",
                    "message": format!("Mock rejection of {}", request.canonical_name),
                }
            })
            .to_string();
            return Err(ProvisioningError::Rejected {
                operation: "create_or_update",
                status: 400,
                code: "ContainerAppOperationError".to_string(),
                message: format!("Mock rejection of {}", request.canonical_name),
                payload,
            });
        }

        let fqdn = if self.withhold_address {
            None
        } else {
            let pinned = self.addresses.lock().await.get(&request.canonical_name).cloned();
            Some(pinned.unwrap_or_else(|| {
                format!("{}.{}", request.canonical_name, self.fqdn_suffix)
            }))
        };

        self.workloads.lock().await.insert(
            request.canonical_name.clone(),
            MockWorkload {
                fqdn: fqdn.clone(),
                image: request.image.clone(),
                env: request.env.clone(),
            },
        );

        Ok(ProvisionResult {
            canonical_name: request.canonical_name.clone(),
            fqdn,
            image: Some(request.image.clone()),
            provisioning_state: Some("Succeeded".to_string()),
        })
    }

    async fn delete(&self, canonical_name: &str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        self.simulate_latency().await;

        match self.workloads.lock().await.remove(canonical_name) {
            Some(_) => Ok(()),
            None => Err(ProvisioningError::NotFound(canonical_name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    fn request(name: &str) -> ProvisionRequest {
        let template = DeploymentTemplate {
            image: "acr.azurecr.io/engine:v7".to_string(),
            ..Default::default()
        };
        ProvisionRequest::for_sale(&template, name, &naming::derive_name(name))
    }

    #[tokio::test]
    async fn test_create_assigns_address() {
        let provisioner = MockProvisioner::new();
        let result = provisioner.create_or_update(&request("a")).await.unwrap();

        assert_eq!(result.address(), Some("market-a.example-platform.net"));
        assert!(provisioner.contains("market-a").await);
        assert_eq!(provisioner.create_calls(), 1);
    }

    #[tokio::test]
    async fn test_pinned_address() {
        let provisioner = MockProvisioner::new();
        provisioner
            .assign_address("market-a", "flash1.example-platform.net")
            .await;

        let result = provisioner.create_or_update(&request("a")).await.unwrap();
        assert_eq!(result.address(), Some("flash1.example-platform.net"));
    }

    #[tokio::test]
    async fn test_failing_create_carries_payload() {
        let provisioner = MockProvisioner::failing();
        let err = provisioner.create_or_update(&request("a")).await.unwrap_err();

        assert!(err.payload().unwrap().contains("ContainerAppOperationError"));
        assert!(!provisioner.contains("market-a").await);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let provisioner = MockProvisioner::new();
        let err = provisioner.delete("market-ghost").await.unwrap_err();
        assert!(matches!(err, ProvisioningError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_pages_through_prefix() {
        let provisioner = MockProvisioner::new();
        for name in ["market-a", "market-b", "market-c", "other-app"] {
            provisioner
                .insert_workload(name, Some("x.net"), "engine:v1")
                .await;
        }

        let listed: Vec<ManagedWorkload> = provisioner.list("market-").try_collect().await.unwrap();
        let names: Vec<&str> = listed.iter().map(|w| w.canonical_name.as_str()).collect();

        assert_eq!(names, vec!["market-a", "market-b", "market-c"]);
        assert!(listed.iter().all(|w| w.image_version == "v1"));
    }

    #[tokio::test]
    async fn test_unreachable_list_yields_error() {
        let provisioner = MockProvisioner::unreachable();
        let result: Result<Vec<ManagedWorkload>> = provisioner.list("market-").try_collect().await;
        assert!(result.is_err());
    }
}
