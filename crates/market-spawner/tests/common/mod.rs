// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for market-spawner tests.
//!
//! Provides TestContext wiring an orchestrator to mock collaborators.

#![allow(dead_code)]

use std::sync::Arc;

use market_spawner::handlers::SpawnerHandlerState;
use market_spawner::notifier::MockNotifier;
use market_spawner::orchestrator::Orchestrator;
use market_spawner::provisioner::{DeploymentTemplate, MockProvisioner, RegistryCredentials};
use market_spawner::registry::InstanceRegistry;

/// Image every test deployment uses.
pub const TEST_IMAGE: &str = "acrmarket.azurecr.io/engine:v20260213-111039";

/// Deployment template pointing at fake resources.
pub fn test_template() -> DeploymentTemplate {
    DeploymentTemplate {
        environment_id: "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.App/managedEnvironments/env"
            .to_string(),
        image: TEST_IMAGE.to_string(),
        registry: RegistryCredentials {
            server: "acrmarket.azurecr.io".to_string(),
            username: Some("acrmarket".to_string()),
            password: "registry-secret".to_string(),
        },
        ..Default::default()
    }
}

/// Orchestrator plus handles on its mocks.
pub struct TestContext {
    pub provisioner: Arc<MockProvisioner>,
    pub notifier: Arc<MockNotifier>,
    pub registry: Arc<InstanceRegistry>,
    pub orchestrator: Arc<Orchestrator>,
}

impl TestContext {
    /// Context with an accepting platform and accepting engines.
    pub fn new() -> Self {
        Self::with(MockProvisioner::new(), MockNotifier::new())
    }

    /// Context with the given mocks.
    pub fn with(provisioner: MockProvisioner, notifier: MockNotifier) -> Self {
        let provisioner = Arc::new(provisioner);
        let notifier = Arc::new(notifier);
        let registry = Arc::new(InstanceRegistry::new());
        let orchestrator = Arc::new(Orchestrator::new(
            provisioner.clone(),
            notifier.clone(),
            registry.clone(),
            test_template(),
        ));

        Self {
            provisioner,
            notifier,
            registry,
            orchestrator,
        }
    }

    /// Handler state for HTTP tests.
    pub fn handler_state(&self) -> Arc<SpawnerHandlerState> {
        Arc::new(SpawnerHandlerState::new(self.orchestrator.clone()))
    }
}
