// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Market Spawner - Sale Instance Lifecycle Control
//!
//! This crate provisions, tracks and tears down one container app per live
//! sale on Azure Container Apps, and hands each new instance its sale over
//! the engine's internal gRPC control channel before declaring it ready.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Back office / operators                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//!                                    │ HTTP (port 3000)
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    market-spawner (This Crate)                          │
//! │  ┌─────────────┐  ┌──────────────┐  ┌─────────────┐  ┌─────────────┐    │
//! │  │   Naming    │  │ Orchestrator │  │  Instance   │  │  Readiness  │    │
//! │  │             │  │              │  │  Registry   │  │  Notifier   │    │
//! │  └─────────────┘  └──────────────┘  └─────────────┘  └─────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//!           │ ARM REST (PUT / DELETE / list)           │ gRPC StartSale
//!           ▼                                          ▼
//! ┌───────────────────────────┐          ┌──────────────────────────────────┐
//! │  Azure Container Apps     │ ───────► │  Sale engine  market-<sale-id>   │
//! │  (Resource Manager)       │  deploy  │  :3000 public, :50051 internal   │
//! └───────────────────────────┘          └──────────────────────────────────┘
//! ```
//!
//! # Spawn Lifecycle
//!
//! ```text
//!   Deriving ──► Provisioning ──► Notifying ──► Ready
//!                     │               │
//!                     ▼               ▼
//!              ProvisionFailed     Degraded (instance kept, still registered)
//! ```
//!
//! # HTTP API
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/sales` | Registered instances |
//! | `POST` | `/sales/spawn` | Provision and hand off a sale (`{"saleId": ...}`) |
//! | `DELETE` | `/sales/{id}` | Delete the instance for a sale |
//! | `GET` | `/health` | Liveness, version, uptime |
//!
//! # Configuration
//!
//! Loaded from environment variables (a `.env` file is honoured by the
//! binary); see [`config::Config::from_env`].
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `AZURE_SUBSCRIPTION_ID` | Yes | - | Subscription holding the resource group |
//! | `AZURE_RESOURCE_GROUP` | Yes | - | Resource group for sale instances |
//! | `AZURE_CONTAINER_ENV_ID` | Yes | - | Managed environment resource ID |
//! | `AZURE_REGISTRY_URL` | Yes | - | Container registry host |
//! | `ENGINE_IMAGE` | Yes | - | Engine image reference |
//! | `AZURE_ACCESS_TOKEN` | Yes* | - | Static bearer token |
//! | `AZURE_TENANT_ID` / `AZURE_CLIENT_ID` / `AZURE_CLIENT_SECRET` | Yes* | - | Service principal |
//! | `AZURE_LOCATION` | No | `francecentral` | Region |
//! | `MARKET_HTTP_PORT` | No | `3000` | HTTP port |
//! | `MARKET_HANDSHAKE_TIMEOUT_SECS` | No | `10` | Readiness handshake bound |
//!
//! \* one of the two credential forms.
//!
//! # Modules
//!
//! - [`config`]: Configuration from environment variables
//! - [`error`]: Error types
//! - [`naming`]: Sale ID to instance name derivation
//! - [`provisioner`]: Cloud platform backends (Azure, mock)
//! - [`notifier`]: Readiness handshake (gRPC, mock)
//! - [`registry`]: In-memory instance registry
//! - [`orchestrator`]: Spawn / kill / reconcile
//! - [`handlers`]: Transport-independent request handlers
//! - [`server`]: HTTP server
//! - [`runtime`]: Embeddable runtime

#![deny(missing_docs)]

/// Configuration loaded from environment variables.
pub mod config;

/// Error types for spawner operations.
pub mod error;

/// Spawner request handlers.
pub mod handlers;

/// Sale ID to instance name derivation.
pub mod naming;

/// Readiness handshake with sale engines.
pub mod notifier;

/// Spawn, kill and reconciliation.
pub mod orchestrator;

/// Cloud container platform backends.
pub mod provisioner;

/// In-memory registry of live instances.
pub mod registry;

/// Embeddable runtime.
pub mod runtime;

/// HTTP server.
pub mod server;

pub use config::Config;
pub use error::{Error, Result};
pub use orchestrator::{Orchestrator, SpawnOutcome};
pub use registry::{InstanceRegistry, Readiness, SaleInstance};
pub use runtime::SpawnerRuntime;
