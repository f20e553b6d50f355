// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Notifier module - readiness handshake with sale engines.

pub mod grpc;
pub mod mock;
mod traits;

pub use grpc::GrpcNotifier;
pub use mock::MockNotifier;
pub use traits::*;
