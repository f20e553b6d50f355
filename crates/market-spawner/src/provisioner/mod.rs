// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Provisioner module - cloud container platform backends.

pub mod azure;
pub mod mock;
mod traits;

pub use azure::AzureContainerApps;
pub use mock::MockProvisioner;
pub use traits::*;
