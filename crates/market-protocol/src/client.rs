// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! gRPC client for the sale engine control channel.

use std::time::Duration;

use thiserror::Error;
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, instrument};

use crate::CONTROL_PORT;
use crate::sale_proto::sale_engine_service_client::SaleEngineServiceClient;
use crate::sale_proto::{StartSaleRequest, StartSaleResponse};

/// Errors that can occur on the control channel
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid endpoint {uri}: {source}")]
    InvalidEndpoint {
        uri: String,
        #[source]
        source: tonic::transport::Error,
    },

    #[error("connect error: {0}")]
    Connect(#[source] tonic::transport::Error),

    #[error("rpc failed: {0}")]
    Status(#[from] tonic::Status),
}

/// Configuration for a single control-channel connection
#[derive(Debug, Clone)]
pub struct SaleEngineClientConfig {
    /// Host name or IP of the engine (the instance's assigned FQDN)
    pub host: String,
    /// Control port on the engine
    pub port: u16,
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Per-RPC timeout in milliseconds
    pub rpc_timeout_ms: u64,
}

impl Default for SaleEngineClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: CONTROL_PORT,
            connect_timeout_ms: 5_000,
            rpc_timeout_ms: 10_000,
        }
    }
}

impl SaleEngineClientConfig {
    /// Configuration targeting `host` on the standard control port.
    pub fn for_host(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    /// `host:port` as advertised to operators.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Plaintext HTTP/2 URI the channel connects to.
    ///
    /// The control port is only reachable from inside the platform network,
    /// engines serve it without TLS.
    pub fn uri(&self) -> String {
        format!("http://{}", self.authority())
    }

    fn endpoint(&self) -> Result<Endpoint, ClientError> {
        let uri = self.uri();
        let endpoint = Endpoint::from_shared(uri.clone())
            .map_err(|source| ClientError::InvalidEndpoint { uri, source })?
            .connect_timeout(Duration::from_millis(self.connect_timeout_ms))
            .timeout(Duration::from_millis(self.rpc_timeout_ms));
        Ok(endpoint)
    }
}

/// Connection to one engine's `sale.SaleEngineService`.
///
/// Wraps the generated client. Dropping it closes the connection.
pub struct SaleEngineClient {
    inner: SaleEngineServiceClient<Channel>,
    authority: String,
}

impl SaleEngineClient {
    /// Connect eagerly to the engine described by `config`.
    #[instrument(skip(config), fields(engine = %config.authority()))]
    pub async fn connect(config: &SaleEngineClientConfig) -> Result<Self, ClientError> {
        let channel = config
            .endpoint()?
            .connect()
            .await
            .map_err(ClientError::Connect)?;

        debug!("control channel connected");

        Ok(Self::new(channel, config.authority()))
    }

    /// Wrap an already established channel.
    pub fn new(channel: Channel, authority: impl Into<String>) -> Self {
        Self {
            inner: SaleEngineServiceClient::new(channel),
            authority: authority.into(),
        }
    }

    /// `host:port` this client talks to.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Call `StartSale` and wait for the engine's answer.
    #[instrument(skip(self), fields(engine = %self.authority))]
    pub async fn start_sale(&mut self, sale_id: &str) -> Result<StartSaleResponse, ClientError> {
        let request = StartSaleRequest {
            sale_id: sale_id.to_string(),
        };

        let response = self.inner.start_sale(request).await?;
        debug!(success = response.get_ref().success, "engine answered StartSale");
        Ok(response.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SaleEngineClientConfig::default();

        assert_eq!(config.port, 50051);
        assert_eq!(config.connect_timeout_ms, 5_000);
        assert_eq!(config.rpc_timeout_ms, 10_000);
    }

    #[test]
    fn test_for_host_uses_control_port() {
        let config = SaleEngineClientConfig::for_host("flash1.example-platform.net");

        assert_eq!(config.authority(), "flash1.example-platform.net:50051");
        assert_eq!(config.uri(), "http://flash1.example-platform.net:50051");
    }

    #[test]
    fn test_invalid_host_is_rejected() {
        let config = SaleEngineClientConfig::for_host("not a host");

        let err = config.endpoint().unwrap_err();
        assert!(matches!(err, ClientError::InvalidEndpoint { .. }));
        assert!(err.to_string().contains("not a host"));
    }
}
