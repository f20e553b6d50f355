// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Readiness notifier trait definitions.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use market_protocol::{ClientError, StartSaleResponse};

/// Errors from the readiness handshake.
///
/// None of these undo provisioning; the orchestrator only records them.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum HandshakeError {
    /// The instance address cannot be turned into an endpoint.
    #[error("Invalid engine address: {0}")]
    InvalidAddress(String),

    /// The engine could not be reached on its control port.
    #[error("Engine unreachable: {0}")]
    Unreachable(String),

    /// The engine did not answer within the deadline.
    #[error("Handshake timed out after {0:?}")]
    Timeout(Duration),

    /// The engine answered with a transport-level error status.
    #[error("Engine returned an error: {0}")]
    Rpc(String),
}

impl From<ClientError> for HandshakeError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::InvalidEndpoint { .. } => HandshakeError::InvalidAddress(err.to_string()),
            ClientError::Connect(_) => HandshakeError::Unreachable(err.to_string()),
            ClientError::Status(status) => HandshakeError::Rpc(format!(
                "{:?}: {}",
                status.code(),
                status.message()
            )),
        }
    }
}

/// Engine's answer to "a sale is yours".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeAck {
    /// Whether the engine accepted the sale
    pub success: bool,
    /// Free-form message from the engine
    pub message: String,
}

impl From<StartSaleResponse> for HandshakeAck {
    fn from(response: StartSaleResponse) -> Self {
        Self {
            success: response.success,
            message: response.message,
        }
    }
}

/// Tells a freshly provisioned engine which sale it serves.
#[async_trait]
pub trait ReadinessNotifier: Send + Sync {
    /// Send the sale ID to the engine at `address` and wait for its answer.
    ///
    /// Implementations bound the whole exchange by a finite timeout.
    async fn notify(&self, address: &str, sale_id: &str) -> Result<HandshakeAck, HandshakeError>;
}
