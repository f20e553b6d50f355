// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Azure Container Apps provisioner.
//!
//! Talks to the Azure Resource Manager REST API directly: `PUT` / `DELETE`
//! on `Microsoft.App/containerApps/{name}`, long-running operations polled
//! through `Azure-AsyncOperation` or `Location`, listings followed through
//! `nextLink`.

mod client;
mod credential;
mod models;

pub use client::{API_VERSION, AzureContainerApps};
pub use credential::{AzureCredential, MANAGEMENT_SCOPE};
