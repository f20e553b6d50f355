// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Spawner HTTP server.
//!
//! Routes:
//!
//! | Method | Path | Handler |
//! |---|---|---|
//! | `GET` | `/sales` | [`handle_list_sales`] |
//! | `POST` | `/sales/spawn` | [`handle_spawn_sale`] |
//! | `DELETE` | `/sales/{id}` | [`handle_delete_sale`] |
//! | `GET` | `/health` | [`handle_health_check`] |

use std::future::Future;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::Error;
use crate::handlers::{
    DeleteSaleResponse, HealthCheckResponse, SaleSummary, SpawnSaleRequest, SpawnerHandlerState,
    handle_delete_sale, handle_health_check, handle_list_sales, handle_spawn_sale,
};
use crate::orchestrator::SpawnOutcome;
use crate::provisioner::ProvisioningError;

/// Error returned by HTTP handlers.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Provisioning(ProvisioningError::NotFound(_)) => StatusCode::NOT_FOUND,
            Error::Provisioning(_) => StatusCode::BAD_GATEWAY,
            Error::NameCollision { .. } | Error::OperationInProgress(_) => StatusCode::CONFLICT,
            Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let details = match &self.0 {
            Error::Provisioning(e) => e.payload().map(str::to_string),
            _ => None,
        };

        let body = match details {
            Some(details) => json!({ "error": self.0.to_string(), "details": details }),
            None => json!({ "error": self.0.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

async fn health(State(state): State<Arc<SpawnerHandlerState>>) -> Json<HealthCheckResponse> {
    Json(handle_health_check(&state).await)
}

async fn list_sales(State(state): State<Arc<SpawnerHandlerState>>) -> Json<Vec<SaleSummary>> {
    Json(handle_list_sales(&state).await)
}

async fn spawn_sale(
    State(state): State<Arc<SpawnerHandlerState>>,
    request: Result<Json<SpawnSaleRequest>, JsonRejection>,
) -> Result<Json<SpawnOutcome>, ApiError> {
    let Json(request) =
        request.map_err(|rejection| ApiError(Error::InvalidRequest(rejection.body_text())))?;
    Ok(Json(handle_spawn_sale(&state, request).await?))
}

async fn delete_sale(
    State(state): State<Arc<SpawnerHandlerState>>,
    Path(sale_id): Path<String>,
) -> Result<Json<DeleteSaleResponse>, ApiError> {
    Ok(Json(handle_delete_sale(&state, &sale_id).await?))
}

/// Build the HTTP router.
pub fn router(state: Arc<SpawnerHandlerState>) -> Router {
    Router::new()
        .route("/sales", get(list_sales))
        .route("/sales/spawn", post(spawn_sale))
        .route("/sales/{id}", delete(delete_sale))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the HTTP API on `listener` until `shutdown` resolves.
pub async fn run_http_server<F>(
    listener: tokio::net::TcpListener,
    state: Arc<SpawnerHandlerState>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "Spawner HTTP server starting");
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
