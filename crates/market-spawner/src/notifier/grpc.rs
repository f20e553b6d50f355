// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! gRPC readiness notifier over the engine's internal control port.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use market_protocol::{CONTROL_PORT, SaleEngineClient, SaleEngineClientConfig};

use super::traits::*;

/// Default upper bound on one handshake, connection included.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Calls `StartSale` on `address:control_port`.
#[derive(Debug, Clone)]
pub struct GrpcNotifier {
    timeout: Duration,
    control_port: u16,
}

impl Default for GrpcNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_HANDSHAKE_TIMEOUT)
    }
}

impl GrpcNotifier {
    /// Create a notifier whose handshakes give up after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            control_port: CONTROL_PORT,
        }
    }

    /// Use a control port other than the default.
    pub fn with_control_port(mut self, port: u16) -> Self {
        self.control_port = port;
        self
    }

    /// Handshake deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn client_config(&self, address: &str) -> SaleEngineClientConfig {
        let millis = self.timeout.as_millis() as u64;
        SaleEngineClientConfig {
            port: self.control_port,
            connect_timeout_ms: millis,
            rpc_timeout_ms: millis,
            ..SaleEngineClientConfig::for_host(address)
        }
    }
}

#[async_trait]
impl ReadinessNotifier for GrpcNotifier {
    async fn notify(&self, address: &str, sale_id: &str) -> Result<HandshakeAck, HandshakeError> {
        let config = self.client_config(address);
        debug!(target_addr = %config.authority(), sale_id, "Starting readiness handshake");

        let exchange = async {
            let mut client = SaleEngineClient::connect(&config).await?;
            let response = client.start_sale(sale_id).await?;
            Ok::<_, HandshakeError>(HandshakeAck::from(response))
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(HandshakeError::Timeout(self.timeout)),
        }
    }
}
