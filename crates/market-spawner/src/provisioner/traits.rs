// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Provisioner trait definitions.
//!
//! Defines the abstract interface to the cloud container platform and the
//! typed request/result shapes exchanged with it.

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::config::DEFAULT_LOCATION;

/// Errors from provisioning operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProvisioningError {
    /// The platform refused the request (validation, quota, authorization...).
    #[error("{operation} rejected by platform (HTTP {status}): {code}: {message}")]
    Rejected {
        /// Operation that was attempted.
        operation: &'static str,
        /// HTTP status returned by the management API.
        status: u16,
        /// Platform error code.
        code: String,
        /// Platform error message.
        message: String,
        /// Raw response body, kept verbatim for operators.
        payload: String,
    },

    /// The long-running operation reached a terminal error state.
    #[error("{operation} ended in state {state}: {payload}")]
    OperationFailed {
        /// Operation that was attempted.
        operation: &'static str,
        /// Terminal state reported by the platform.
        state: String,
        /// Raw status document, kept verbatim for operators.
        payload: String,
    },

    /// The target instance does not exist on the platform.
    #[error("Instance not found: {0}")]
    NotFound(String),

    /// Provisioning finished but the platform assigned no network address.
    #[error("No address assigned to instance: {0}")]
    MissingAddress(String),

    /// Credentials could not be obtained or were refused.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// HTTP transport to the management API failed.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A platform document could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error.
    #[error("Other: {0}")]
    Other(String),
}

impl ProvisioningError {
    /// Raw diagnostic payload returned by the platform, when there is one.
    pub fn payload(&self) -> Option<&str> {
        match self {
            ProvisioningError::Rejected { payload, .. }
            | ProvisioningError::OperationFailed { payload, .. } => Some(payload),
            _ => None,
        }
    }
}

/// Result type for provisioning operations.
pub type Result<T> = std::result::Result<T, ProvisioningError>;

/// Private registry the engine image is pulled from.
#[derive(Clone, Default)]
pub struct RegistryCredentials {
    /// Registry host, e.g. `acrmarket.azurecr.io`
    pub server: String,
    /// Registry user
    pub username: Option<String>,
    /// Registry password, stored on the platform as a secret
    pub password: String,
}

impl std::fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Downstream services every engine connects to.
///
/// Values are forwarded as-is; unset ones are left out of the deployment.
#[derive(Clone, Default)]
pub struct ServiceEndpoints {
    /// LiveKit server URL
    pub livekit_url: Option<String>,
    /// LiveKit API key
    pub livekit_api_key: Option<String>,
    /// LiveKit API secret
    pub livekit_api_secret: Option<String>,
    /// Valkey host (platform-internal FQDN)
    pub valkey_host: Option<String>,
    /// Valkey port
    pub valkey_port: Option<String>,
    /// Valkey password
    pub valkey_password: Option<String>,
}

impl std::fmt::Debug for ServiceEndpoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceEndpoints")
            .field("livekit_url", &self.livekit_url)
            .field("valkey_host", &self.valkey_host)
            .field("valkey_port", &self.valkey_port)
            .finish_non_exhaustive()
    }
}

/// Process-wide description of what a sale instance looks like.
///
/// Combined with a sale ID by [`ProvisionRequest::for_sale`].
#[derive(Debug, Clone)]
pub struct DeploymentTemplate {
    /// Azure region
    pub location: String,
    /// Managed environment resource ID
    pub environment_id: String,
    /// Engine image reference
    pub image: String,
    /// Registry the image is pulled from
    pub registry: RegistryCredentials,
    /// Downstream services passed to the engine
    pub services: ServiceEndpoints,
    /// Externally reachable client port (WebSocket traffic)
    pub public_port: u16,
    /// Internal-only control channel port
    pub control_port: u16,
    /// Fractional vCPU quota
    pub cpu: f64,
    /// Memory quota with binary unit, e.g. `0.5Gi`
    pub memory: String,
    /// Container name inside the app
    pub container_name: String,
}

impl Default for DeploymentTemplate {
    fn default() -> Self {
        Self {
            location: DEFAULT_LOCATION.to_string(),
            environment_id: String::new(),
            image: String::new(),
            registry: RegistryCredentials::default(),
            services: ServiceEndpoints::default(),
            public_port: 3000,
            control_port: market_protocol::CONTROL_PORT,
            cpu: 0.25,
            memory: "0.5Gi".to_string(),
            container_name: "engine".to_string(),
        }
    }
}

/// Ingress shape: one public port plus one internal port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressSpec {
    /// Port clients reach through the public FQDN
    pub public_port: u16,
    /// Port reachable only from inside the platform network
    pub control_port: u16,
    /// Ingress transport (`auto` handles WebSocket upgrades)
    pub transport: String,
}

/// Resource quota for the engine container.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceLimits {
    /// Fractional vCPU
    pub cpu: f64,
    /// Memory with binary unit
    pub memory: String,
}

/// One environment variable binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVar {
    /// Variable name
    pub name: String,
    /// Value; `None` when the controller has nothing to pass
    pub value: Option<String>,
}

impl EnvVar {
    fn new(name: &str, value: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            value: value.map(str::to_string),
        }
    }
}

/// Declarative desired state of one sale instance.
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    /// Canonical instance name
    pub canonical_name: String,
    /// Azure region
    pub location: String,
    /// Managed environment resource ID
    pub environment_id: String,
    /// Engine image reference
    pub image: String,
    /// Container name inside the app
    pub container_name: String,
    /// Ingress ports
    pub ingress: IngressSpec,
    /// Resource quota
    pub resources: ResourceLimits,
    /// Registry pull credentials
    pub registry: RegistryCredentials,
    /// Environment bindings
    pub env: Vec<EnvVar>,
}

impl ProvisionRequest {
    /// Name of the platform secret holding the registry password.
    pub const REGISTRY_SECRET_NAME: &'static str = "registry-password";

    /// Build the request for one sale from the process-wide template.
    pub fn for_sale(template: &DeploymentTemplate, sale_id: &str, canonical_name: &str) -> Self {
        let services = &template.services;
        let public_port = template.public_port.to_string();

        let env = vec![
            EnvVar::new("PORT", Some(&public_port)),
            EnvVar::new("SALE_ID", Some(sale_id)),
            EnvVar::new("LIVEKIT_URL", services.livekit_url.as_deref()),
            EnvVar::new("LIVEKIT_API_KEY", services.livekit_api_key.as_deref()),
            EnvVar::new("LIVEKIT_API_SECRET", services.livekit_api_secret.as_deref()),
            EnvVar::new("VALKEY_HOST", services.valkey_host.as_deref()),
            EnvVar::new("VALKEY_PORT", services.valkey_port.as_deref()),
            EnvVar::new("VALKEY_PASSWORD", services.valkey_password.as_deref()),
        ];

        Self {
            canonical_name: canonical_name.to_string(),
            location: template.location.clone(),
            environment_id: template.environment_id.clone(),
            image: template.image.clone(),
            container_name: template.container_name.clone(),
            ingress: IngressSpec {
                public_port: template.public_port,
                control_port: template.control_port,
                transport: "auto".to_string(),
            },
            resources: ResourceLimits {
                cpu: template.cpu,
                memory: template.memory.clone(),
            },
            registry: template.registry.clone(),
            env,
        }
    }

    /// Value bound to an environment variable, if any.
    pub fn env_value(&self, name: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|var| var.name == name)
            .and_then(|var| var.value.as_deref())
    }
}

/// What the platform reports after a create-or-update completed.
#[derive(Debug, Clone, Default)]
pub struct ProvisionResult {
    /// Canonical instance name
    pub canonical_name: String,
    /// Assigned fully-qualified domain name
    pub fqdn: Option<String>,
    /// Image actually deployed
    pub image: Option<String>,
    /// Final provisioning state
    pub provisioning_state: Option<String>,
}

impl ProvisionResult {
    /// The assigned address, treating an empty FQDN as absent.
    pub fn address(&self) -> Option<&str> {
        self.fqdn.as_deref().filter(|fqdn| !fqdn.is_empty())
    }
}

/// A workload found on the platform by [`Provisioner::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedWorkload {
    /// Canonical instance name
    pub canonical_name: String,
    /// Assigned FQDN, if the platform reports one
    pub fqdn: Option<String>,
    /// Tag of the deployed image, `unknown` if none
    pub image_version: String,
}

/// Lazy, single-pass sequence of managed workloads.
///
/// Pages are fetched on demand while the stream is polled.
pub type WorkloadStream<'a> = BoxStream<'a, Result<ManagedWorkload>>;

/// Trait for cloud provisioning backends.
///
/// Every operation is state-changing (or billed) on the real platform and
/// blocks until the platform reports a terminal outcome. Provisioners never
/// retry on their own.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Backend identifier (e.g. "azure-container-apps", "mock")
    fn provisioner_type(&self) -> &'static str;

    /// Enumerate workloads whose name starts with `prefix`.
    fn list<'a>(&'a self, prefix: &'a str) -> WorkloadStream<'a>;

    /// Submit the desired state and wait for the operation to finish.
    async fn create_or_update(&self, request: &ProvisionRequest) -> Result<ProvisionResult>;

    /// Delete an instance and wait until the platform confirms removal.
    ///
    /// Deleting an instance that does not exist is
    /// [`ProvisioningError::NotFound`], not success.
    async fn delete(&self, canonical_name: &str) -> Result<()>;
}
