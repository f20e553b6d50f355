// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for market-spawner.

use thiserror::Error;

/// Spawner errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration loading failed.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// The cloud platform rejected or failed a create/delete operation.
    #[error("Provisioning error: {0}")]
    Provisioning(#[from] crate::provisioner::ProvisioningError),

    /// Two logical sale IDs normalize to the same canonical instance name.
    #[error(
        "Name collision: sale '{sale_id}' maps to '{canonical_name}', already used by sale '{existing_sale_id}'"
    )]
    NameCollision {
        /// Sale ID of the rejected request.
        sale_id: String,
        /// Canonical name both IDs derive to.
        canonical_name: String,
        /// Sale ID that currently owns the name.
        existing_sale_id: String,
    },

    /// Another spawn or delete for the same instance is still running.
    #[error("Operation already in progress for instance: {0}")]
    OperationInProgress(String),

    /// Request validation failed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type using spawner Error.
pub type Result<T> = std::result::Result<T, Error>;
