// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mock notifier for testing.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::traits::*;

/// What the mock engine does when notified.
#[derive(Debug, Clone)]
enum Behavior {
    Acknowledge(String),
    Decline(String),
    Fail(HandshakeError),
}

/// Records handshakes instead of sending them.
pub struct MockNotifier {
    behavior: Behavior,
    calls: Mutex<Vec<(String, String)>>,
    /// Optional delay before answering (in milliseconds)
    pub delay_ms: u64,
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl MockNotifier {
    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: Mutex::new(Vec::new()),
            delay_ms: 0,
        }
    }

    /// Create a notifier whose engines always accept with `"ok"`.
    pub fn new() -> Self {
        Self::acknowledging("ok")
    }

    /// Create a notifier whose engines accept with `message`.
    pub fn acknowledging(message: &str) -> Self {
        Self::with_behavior(Behavior::Acknowledge(message.to_string()))
    }

    /// Create a notifier whose engines answer `success = false`.
    pub fn declining(message: &str) -> Self {
        Self::with_behavior(Behavior::Decline(message.to_string()))
    }

    /// Create a notifier whose engines cannot be reached.
    pub fn unreachable() -> Self {
        Self::with_behavior(Behavior::Fail(HandshakeError::Unreachable(
            "connection refused".to_string(),
        )))
    }

    /// Create a notifier whose handshakes hit the deadline.
    pub fn timing_out() -> Self {
        Self::with_behavior(Behavior::Fail(HandshakeError::Timeout(
            super::grpc::DEFAULT_HANDSHAKE_TIMEOUT,
        )))
    }

    /// `(address, sale_id)` of every handshake attempted so far.
    pub async fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl ReadinessNotifier for MockNotifier {
    async fn notify(&self, address: &str, sale_id: &str) -> Result<HandshakeAck, HandshakeError> {
        self.calls
            .lock()
            .await
            .push((address.to_string(), sale_id.to_string()));

        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }

        match &self.behavior {
            Behavior::Acknowledge(message) => Ok(HandshakeAck {
                success: true,
                message: message.clone(),
            }),
            Behavior::Decline(message) => Ok(HandshakeAck {
                success: false,
                message: message.clone(),
            }),
            Behavior::Fail(err) => Err(err.clone()),
        }
    }
}
