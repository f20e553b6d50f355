// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Embeddable runtime for market-spawner.
//!
//! [`SpawnerRuntime`] wires the provisioner, notifier, registry and HTTP
//! server together so the spawner can run inside an existing tokio
//! application as well as from the standalone binary.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use market_spawner::notifier::GrpcNotifier;
//! use market_spawner::provisioner::AzureContainerApps;
//! use market_spawner::runtime::SpawnerRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = market_spawner::Config::from_env()?;
//!
//!     let runtime = SpawnerRuntime::builder()
//!         .provisioner(Arc::new(AzureContainerApps::new(&config.azure)?))
//!         .notifier(Arc::new(GrpcNotifier::new(config.handshake_timeout)))
//!         .template(config.deployment)
//!         .bind_addr(config.http_addr)
//!         .build()?
//!         .start()
//!         .await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     runtime.shutdown().await
//! }
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::handlers::SpawnerHandlerState;
use crate::notifier::ReadinessNotifier;
use crate::orchestrator::Orchestrator;
use crate::provisioner::{DeploymentTemplate, Provisioner};
use crate::registry::InstanceRegistry;
use crate::server::run_http_server;

/// Default upper bound on startup reconciliation.
pub const DEFAULT_RECONCILE_TIMEOUT: Duration = Duration::from_secs(30);

/// Builder for creating a [`SpawnerRuntime`].
pub struct SpawnerRuntimeBuilder {
    provisioner: Option<Arc<dyn Provisioner>>,
    notifier: Option<Arc<dyn ReadinessNotifier>>,
    template: DeploymentTemplate,
    bind_addr: SocketAddr,
    reconcile_on_start: bool,
    reconcile_timeout: Duration,
}

impl Default for SpawnerRuntimeBuilder {
    fn default() -> Self {
        Self {
            provisioner: None,
            notifier: None,
            template: DeploymentTemplate::default(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            reconcile_on_start: true,
            reconcile_timeout: DEFAULT_RECONCILE_TIMEOUT,
        }
    }
}

impl SpawnerRuntimeBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the provisioning backend (required).
    pub fn provisioner(mut self, provisioner: Arc<dyn Provisioner>) -> Self {
        self.provisioner = Some(provisioner);
        self
    }

    /// Set the readiness notifier (required).
    pub fn notifier(mut self, notifier: Arc<dyn ReadinessNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Set the deployment template for new instances.
    pub fn template(mut self, template: DeploymentTemplate) -> Self {
        self.template = template;
        self
    }

    /// Set the bind address for the HTTP server.
    ///
    /// Default: `0.0.0.0:3000`
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Whether to rebuild the registry from the platform on start.
    ///
    /// Default: `true`
    pub fn reconcile_on_start(mut self, enabled: bool) -> Self {
        self.reconcile_on_start = enabled;
        self
    }

    /// Give up on startup reconciliation after `timeout` and start empty.
    ///
    /// Default: 30 seconds
    pub fn reconcile_timeout(mut self, timeout: Duration) -> Self {
        self.reconcile_timeout = timeout;
        self
    }

    /// Build the runtime configuration.
    ///
    /// Returns an error if required fields are missing.
    pub fn build(self) -> Result<SpawnerRuntimeConfig> {
        let provisioner = self
            .provisioner
            .ok_or_else(|| anyhow::anyhow!("provisioner is required"))?;
        let notifier = self
            .notifier
            .ok_or_else(|| anyhow::anyhow!("notifier is required"))?;

        Ok(SpawnerRuntimeConfig {
            provisioner,
            notifier,
            template: self.template,
            bind_addr: self.bind_addr,
            reconcile_on_start: self.reconcile_on_start,
            reconcile_timeout: self.reconcile_timeout,
        })
    }
}

/// Configuration for a [`SpawnerRuntime`].
pub struct SpawnerRuntimeConfig {
    provisioner: Arc<dyn Provisioner>,
    notifier: Arc<dyn ReadinessNotifier>,
    template: DeploymentTemplate,
    bind_addr: SocketAddr,
    reconcile_on_start: bool,
    reconcile_timeout: Duration,
}

impl SpawnerRuntimeConfig {
    /// Reconcile with the platform, then start serving HTTP.
    ///
    /// A failed or timed-out reconciliation is logged and the registry starts empty.
    pub async fn start(self) -> Result<SpawnerRuntime> {
        let registry = Arc::new(InstanceRegistry::new());
        let orchestrator = Arc::new(Orchestrator::new(
            self.provisioner,
            self.notifier,
            registry,
            self.template,
        ));

        if self.reconcile_on_start {
            info!("Synchronising registry with platform");
            match tokio::time::timeout(self.reconcile_timeout, orchestrator.reconcile()).await {
                Ok(Ok(count)) => info!(count, "Startup reconciliation complete"),
                Ok(Err(e)) => warn!(
                    error = %e,
                    "Startup reconciliation failed, starting with an empty registry"
                ),
                Err(_) => warn!(
                    timeout_ms = self.reconcile_timeout.as_millis() as u64,
                    "Startup reconciliation timed out, starting with an empty registry"
                ),
            }
        }

        let state = Arc::new(SpawnerHandlerState::new(orchestrator.clone()));

        let listener = tokio::net::TcpListener::bind(self.bind_addr).await?;
        let local_addr = listener.local_addr()?;

        let (server_shutdown_tx, mut server_shutdown_rx) = watch::channel(false);
        let shutdown = async move {
            let _ = server_shutdown_rx.wait_for(|stop| *stop).await;
        };
        let server_handle = tokio::spawn(run_http_server(listener, state.clone(), shutdown));

        info!(
            bind_addr = %local_addr,
            provisioner = orchestrator.provisioner_type(),
            "SpawnerRuntime started"
        );

        Ok(SpawnerRuntime {
            server_handle,
            server_shutdown_tx,
            state,
            local_addr,
        })
    }
}

/// A running spawner that can be embedded in an application.
///
/// Call [`shutdown`](Self::shutdown) for graceful termination.
pub struct SpawnerRuntime {
    server_handle: JoinHandle<std::io::Result<()>>,
    server_shutdown_tx: watch::Sender<bool>,
    state: Arc<SpawnerHandlerState>,
    local_addr: SocketAddr,
}

impl SpawnerRuntime {
    /// Create a new builder for configuring the runtime.
    pub fn builder() -> SpawnerRuntimeBuilder {
        SpawnerRuntimeBuilder::new()
    }

    /// Address the HTTP server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The orchestrator behind the HTTP API.
    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.state.orchestrator
    }

    /// Get a reference to the shared handler state.
    pub fn state(&self) -> &Arc<SpawnerHandlerState> {
        &self.state
    }

    /// Stop accepting requests and wait for in-flight ones to finish.
    pub async fn shutdown(self) -> Result<()> {
        info!("SpawnerRuntime shutting down...");
        let _ = self.server_shutdown_tx.send(true);

        match self.server_handle.await {
            Ok(Ok(())) => {
                info!("SpawnerRuntime shutdown complete");
                Ok(())
            }
            Ok(Err(e)) => {
                error!("SpawnerRuntime server error during shutdown: {}", e);
                Err(e.into())
            }
            Err(e) => {
                error!("SpawnerRuntime server task panicked: {}", e);
                Err(anyhow::anyhow!("server task panicked: {}", e))
            }
        }
    }

    /// Check if the runtime is still running.
    pub fn is_running(&self) -> bool {
        !self.server_handle.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::MockNotifier;
    use crate::provisioner::MockProvisioner;

    #[test]
    fn test_builder_default_values() {
        let builder = SpawnerRuntimeBuilder::default();

        assert!(builder.provisioner.is_none());
        assert!(builder.notifier.is_none());
        assert_eq!(
            builder.bind_addr,
            "0.0.0.0:3000".parse::<SocketAddr>().unwrap()
        );
        assert!(builder.reconcile_on_start);
        assert_eq!(builder.reconcile_timeout, DEFAULT_RECONCILE_TIMEOUT);
        assert_eq!(builder.template.control_port, 50051);
    }

    #[test]
    fn test_build_requires_provisioner() {
        let result = SpawnerRuntimeBuilder::new()
            .notifier(Arc::new(MockNotifier::new()))
            .build();

        let err = result.err().unwrap();
        assert!(err.to_string().contains("provisioner is required"));
    }

    #[test]
    fn test_build_requires_notifier() {
        let result = SpawnerRuntimeBuilder::new()
            .provisioner(Arc::new(MockProvisioner::new()))
            .build();

        let err = result.err().unwrap();
        assert!(err.to_string().contains("notifier is required"));
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let runtime = SpawnerRuntime::builder()
            .provisioner(Arc::new(MockProvisioner::new()))
            .notifier(Arc::new(MockNotifier::new()))
            .bind_addr("127.0.0.1:0".parse().unwrap())
            .build()
            .unwrap()
            .start()
            .await
            .unwrap();

        assert!(runtime.is_running());
        assert_ne!(runtime.local_addr().port(), 0);

        runtime.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_reconciliation_starts_empty() {
        let runtime = SpawnerRuntime::builder()
            .provisioner(Arc::new(MockProvisioner::unreachable()))
            .notifier(Arc::new(MockNotifier::new()))
            .bind_addr("127.0.0.1:0".parse().unwrap())
            .build()
            .unwrap()
            .start()
            .await
            .unwrap();

        assert!(runtime.orchestrator().list().await.is_empty());
        runtime.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_hanging_reconciliation_times_out_and_starts_empty() {
        let mut provisioner = MockProvisioner::new();
        provisioner.operation_delay_ms = 60_000;
        provisioner
            .insert_workload("market-flash", Some("f.example.net"), "engine:v1")
            .await;

        let start = SpawnerRuntime::builder()
            .provisioner(Arc::new(provisioner))
            .notifier(Arc::new(MockNotifier::new()))
            .bind_addr("127.0.0.1:0".parse().unwrap())
            .reconcile_timeout(Duration::from_millis(50))
            .build()
            .unwrap()
            .start();
        let runtime = tokio::time::timeout(Duration::from_secs(5), start)
            .await
            .expect("start must not wait for the platform")
            .unwrap();

        assert!(runtime.is_running());
        assert!(runtime.orchestrator().list().await.is_empty());
        runtime.shutdown().await.unwrap();
    }
}
