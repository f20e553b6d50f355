// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for market-spawner.

use std::net::SocketAddr;
use std::time::Duration;

use secrecy::SecretString;

use crate::provisioner::{DeploymentTemplate, RegistryCredentials, ServiceEndpoints};

/// Default Azure region for new sale instances.
pub const DEFAULT_LOCATION: &str = "francecentral";
/// Default Azure Resource Manager endpoint.
pub const DEFAULT_MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";
/// Default Microsoft Entra authority host.
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Spawner configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP API listen address
    pub http_addr: SocketAddr,
    /// Azure management API access
    pub azure: AzureConfig,
    /// Shape of every sale instance this process deploys
    pub deployment: DeploymentTemplate,
    /// Upper bound on the readiness handshake with a new instance
    pub handshake_timeout: Duration,
}

/// Azure Resource Manager access settings.
#[derive(Debug, Clone)]
pub struct AzureConfig {
    /// Subscription holding the resource group
    pub subscription_id: String,
    /// Resource group all sale instances live in
    pub resource_group: String,
    /// ARM base URL (overridable for sovereign clouds and tests)
    pub management_endpoint: String,
    /// Entra ID authority host used for token requests
    pub authority_host: String,
    /// How to obtain bearer tokens
    pub credential: CredentialConfig,
    /// Polling interval for long-running operations when the platform sends no `Retry-After`
    pub poll_interval: Duration,
}

/// Source of ARM bearer tokens.
#[derive(Debug, Clone)]
pub enum CredentialConfig {
    /// Pre-issued bearer token (e.g. `az account get-access-token`).
    AccessToken(SecretString),
    /// Service principal client-credentials flow.
    ClientSecret {
        /// Directory (tenant) ID
        tenant_id: String,
        /// Application (client) ID
        client_id: String,
        /// Client secret
        client_secret: SecretString,
    },
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::MissingEnvVar(key));

        let port: u16 = parse_or(&get, "MARKET_HTTP_PORT", 3000)?;
        let http_addr = SocketAddr::from(([0, 0, 0, 0], port));

        let handshake_timeout =
            Duration::from_secs(parse_or(&get, "MARKET_HANDSHAKE_TIMEOUT_SECS", 10)?);
        let poll_interval = Duration::from_millis(parse_or(&get, "MARKET_POLL_INTERVAL_MS", 5000)?);

        let credential = if let Some(token) = get("AZURE_ACCESS_TOKEN") {
            CredentialConfig::AccessToken(SecretString::from(token))
        } else {
            match (
                get("AZURE_TENANT_ID"),
                get("AZURE_CLIENT_ID"),
                get("AZURE_CLIENT_SECRET"),
            ) {
                (Some(tenant_id), Some(client_id), Some(client_secret)) => {
                    CredentialConfig::ClientSecret {
                        tenant_id,
                        client_id,
                        client_secret: SecretString::from(client_secret),
                    }
                }
                _ => {
                    return Err(ConfigError::MissingEnvVar(
                        "AZURE_ACCESS_TOKEN or AZURE_TENANT_ID/AZURE_CLIENT_ID/AZURE_CLIENT_SECRET",
                    ));
                }
            }
        };

        let azure = AzureConfig {
            subscription_id: required("AZURE_SUBSCRIPTION_ID")?,
            resource_group: required("AZURE_RESOURCE_GROUP")?,
            management_endpoint: get("AZURE_MANAGEMENT_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_MANAGEMENT_ENDPOINT.to_string()),
            authority_host: get("AZURE_AUTHORITY_HOST")
                .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string()),
            credential,
            poll_interval,
        };

        let deployment = DeploymentTemplate {
            location: get("AZURE_LOCATION").unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
            environment_id: required("AZURE_CONTAINER_ENV_ID")?,
            image: required("ENGINE_IMAGE")?,
            registry: RegistryCredentials {
                server: required("AZURE_REGISTRY_URL")?,
                username: get("REGISTRY_USERNAME"),
                password: get("REGISTRY_PASSWORD").unwrap_or_default(),
            },
            services: ServiceEndpoints {
                livekit_url: get("LIVEKIT_URL"),
                livekit_api_key: get("LIVEKIT_API_KEY"),
                livekit_api_secret: get("LIVEKIT_API_SECRET"),
                valkey_host: get("VALKEY_HOST"),
                valkey_port: get("VALKEY_PORT"),
                valkey_password: get("VALKEY_PASSWORD"),
            },
            ..DeploymentTemplate::default()
        };

        Ok(Self {
            http_addr,
            azure,
            deployment,
            handshake_timeout,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key,
            value: raw.clone(),
        }),
        None => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),
    /// A variable is set but cannot be parsed.
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Variable name
        key: &'static str,
        /// Raw value
        value: String,
    },
}
