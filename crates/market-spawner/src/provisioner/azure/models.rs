// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Azure Resource Manager documents for `Microsoft.App/containerApps`.
//!
//! Only the fields this crate reads or writes are modelled; unknown fields in
//! platform responses are ignored.

use serde::{Deserialize, Serialize};

use super::super::traits::{ManagedWorkload, ProvisionRequest, ProvisionResult};
use crate::naming;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerApp {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ContainerAppProperties>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerAppProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub managed_environment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Configuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<Template>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingress: Option<Ingress>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<Secret>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub registries: Vec<RegistryCredentials>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_port_mappings: Vec<PortMapping>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    pub external: bool,
    pub target_port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exposed_port: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Secret {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryCredentials {
    pub server: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_secret_ref: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub containers: Vec<Container>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Container {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ContainerResources>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvironmentVar>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerResources {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentVar {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// One page of a collection listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerAppCollection {
    #[serde(default)]
    pub value: Vec<ContainerApp>,
    #[serde(default)]
    pub next_link: Option<String>,
}

/// Body served at an `Azure-AsyncOperation` URL.
#[derive(Debug, Deserialize)]
pub struct AsyncOperationStatus {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ArmErrorResponse {
    pub error: ArmErrorDetail,
}

#[derive(Debug, Default, Deserialize)]
pub struct ArmErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl From<&ProvisionRequest> for ContainerApp {
    fn from(request: &ProvisionRequest) -> Self {
        let registry = &request.registry;

        ContainerApp {
            location: Some(request.location.clone()),
            properties: Some(ContainerAppProperties {
                managed_environment_id: Some(request.environment_id.clone()),
                configuration: Some(Configuration {
                    ingress: Some(Ingress {
                        external: Some(true),
                        target_port: Some(request.ingress.public_port),
                        transport: Some(request.ingress.transport.clone()),
                        additional_port_mappings: vec![PortMapping {
                            external: false,
                            target_port: request.ingress.control_port,
                            exposed_port: Some(request.ingress.control_port),
                        }],
                        ..Default::default()
                    }),
                    secrets: vec![Secret {
                        name: ProvisionRequest::REGISTRY_SECRET_NAME.to_string(),
                        value: Some(registry.password.clone()),
                    }],
                    registries: vec![RegistryCredentials {
                        server: registry.server.clone(),
                        username: registry.username.clone(),
                        password_secret_ref: Some(ProvisionRequest::REGISTRY_SECRET_NAME.to_string()),
                    }],
                }),
                template: Some(Template {
                    containers: vec![Container {
                        name: Some(request.container_name.clone()),
                        image: Some(request.image.clone()),
                        resources: Some(ContainerResources {
                            cpu: Some(request.resources.cpu),
                            memory: Some(request.resources.memory.clone()),
                        }),
                        env: request
                            .env
                            .iter()
                            .map(|var| EnvironmentVar {
                                name: var.name.clone(),
                                value: var.value.clone(),
                            })
                            .collect(),
                    }],
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

impl ContainerApp {
    pub fn provisioning_state(&self) -> Option<&str> {
        self.properties.as_ref()?.provisioning_state.as_deref()
    }

    pub fn fqdn(&self) -> Option<&str> {
        self.properties
            .as_ref()?
            .configuration
            .as_ref()?
            .ingress
            .as_ref()?
            .fqdn
            .as_deref()
    }

    /// Image of the first container.
    pub fn image(&self) -> Option<&str> {
        self.properties
            .as_ref()?
            .template
            .as_ref()?
            .containers
            .first()?
            .image
            .as_deref()
    }

    pub fn into_result(self, canonical_name: &str) -> ProvisionResult {
        ProvisionResult {
            canonical_name: canonical_name.to_string(),
            fqdn: self.fqdn().map(str::to_string),
            image: self.image().map(str::to_string),
            provisioning_state: self.provisioning_state().map(str::to_string),
        }
    }

    /// Summary of this app when its name falls under `prefix`.
    pub fn to_workload(&self, prefix: &str) -> Option<ManagedWorkload> {
        let name = self.name.as_deref()?;
        if !name.starts_with(prefix) {
            return None;
        }
        Some(ManagedWorkload {
            canonical_name: name.to_string(),
            fqdn: self.fqdn().filter(|f| !f.is_empty()).map(str::to_string),
            image_version: naming::image_version(self.image().unwrap_or_default()),
        })
    }
}
