// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Market Protocol - control channel between the spawner and sale engines
//!
//! Every sale engine container exposes a gRPC service on an internal-only
//! port. The spawner calls it exactly once after provisioning to hand the
//! engine its sale and to learn whether the engine is actually live.
//!
//! ```text
//! ┌──────────────────┐   StartSale{saleId}   ┌──────────────────────────┐
//! │  market-spawner  │ ────────────────────► │  sale engine (container) │
//! │                  │ ◄──────────────────── │  <fqdn>:50051 (internal) │
//! └──────────────────┘  {success, message}   └──────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use market_protocol::{SaleEngineClient, SaleEngineClientConfig};
//!
//! let config = SaleEngineClientConfig::for_host("flash1.example-platform.net");
//! let mut client = SaleEngineClient::connect(&config).await?;
//! let ack = client.start_sale("Flash Sale #1").await?;
//! assert!(ack.success);
//! ```

pub mod client;

// Generated protobuf types, client and server for the `sale` package
pub mod sale_proto {
    include!(concat!(env!("OUT_DIR"), "/sale.rs"));
}

pub use client::{ClientError, SaleEngineClient, SaleEngineClientConfig};
pub use sale_proto::sale_engine_service_client::SaleEngineServiceClient;
pub use sale_proto::sale_engine_service_server::{SaleEngineService, SaleEngineServiceServer};
pub use sale_proto::{StartSaleRequest, StartSaleResponse};

/// Internal port every sale engine serves its control channel on.
pub const CONTROL_PORT: u16 = 50051;

/// Fully-qualified gRPC service name.
pub const SERVICE_NAME: &str = "sale.SaleEngineService";
