// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Market Spawner - Sale Instance Lifecycle Server
//!
//! An HTTP server responsible for:
//! - Provisioning one Azure container app per sale
//! - Handing the sale to the engine over gRPC
//! - Tracking and deleting live instances

use std::sync::Arc;
use tracing::{info, warn};

use market_spawner::config::Config;
use market_spawner::notifier::GrpcNotifier;
use market_spawner::provisioner::{AzureContainerApps, Provisioner};
use market_spawner::runtime::SpawnerRuntime;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "market_spawner=info,tower_http=info".into()),
        )
        .init();

    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file loaded: {}", e);
    }

    let config = Config::from_env()?;

    info!(
        http_addr = %config.http_addr,
        resource_group = %config.azure.resource_group,
        location = %config.deployment.location,
        image = %config.deployment.image,
        "Starting Market Spawner"
    );

    let provisioner = Arc::new(AzureContainerApps::new(&config.azure)?);
    info!(
        provisioner_type = provisioner.provisioner_type(),
        "Provisioner initialized"
    );

    let notifier = Arc::new(GrpcNotifier::new(config.handshake_timeout));

    let runtime = SpawnerRuntime::builder()
        .provisioner(provisioner)
        .notifier(notifier)
        .template(config.deployment)
        .bind_addr(config.http_addr)
        .build()?
        .start()
        .await?;

    info!(addr = %runtime.local_addr(), "Spawner server ready");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    runtime.shutdown().await?;

    info!("Market Spawner shut down");

    Ok(())
}
