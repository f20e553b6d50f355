// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! ARM REST client for container apps.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{RequestBuilder, Response, StatusCode};
use secrecy::ExposeSecret;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::credential::AzureCredential;
use super::models::{ArmErrorResponse, AsyncOperationStatus, ContainerApp, ContainerAppCollection};
use crate::config::AzureConfig;
use crate::provisioner::traits::*;

/// `Microsoft.App` API version used for every request.
pub const API_VERSION: &str = "2024-03-01";

/// Per-request timeout towards the management API.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Where a long-running operation reports its progress.
#[derive(Debug, Clone)]
enum PollTarget {
    /// Status document with a `status` field.
    AsyncOperation(String),
    /// 202 while pending, 2xx once done.
    Location(String),
}

impl PollTarget {
    fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        header("azure-asyncoperation")
            .map(PollTarget::AsyncOperation)
            .or_else(|| header("location").map(PollTarget::Location))
    }

    fn url(&self) -> &str {
        match self {
            PollTarget::AsyncOperation(url) | PollTarget::Location(url) => url,
        }
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn is_terminal_failure(state: &str) -> bool {
    matches!(state, "Failed" | "Canceled" | "Cancelled")
}

/// Turn a non-success response into [`ProvisioningError::Rejected`].
async fn rejected(operation: &'static str, response: Response) -> ProvisioningError {
    let status = response.status().as_u16();
    let payload = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ArmErrorResponse>(&payload)
        .map(|body| body.error)
        .unwrap_or_default();

    ProvisioningError::Rejected {
        operation,
        status,
        code: detail.code,
        message: detail.message,
        payload,
    }
}

/// Azure Container Apps backend.
pub struct AzureContainerApps {
    http: reqwest::Client,
    credential: AzureCredential,
    collection_url: String,
    poll_interval: Duration,
}

impl AzureContainerApps {
    /// Create a client for the resource group named in `config`.
    pub fn new(config: &AzureConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let collection_url = format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.App/containerApps",
            config.management_endpoint.trim_end_matches('/'),
            config.subscription_id,
            config.resource_group,
        );

        Ok(Self {
            credential: AzureCredential::new(
                config.credential.clone(),
                &config.authority_host,
                http.clone(),
            ),
            http,
            collection_url,
            poll_interval: config.poll_interval,
        })
    }

    fn app_url(&self, name: &str) -> String {
        format!("{}/{}?api-version={}", self.collection_url, name, API_VERSION)
    }

    fn list_url(&self) -> String {
        format!("{}?api-version={}", self.collection_url, API_VERSION)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let token = self.credential.token().await?;
        Ok(builder.bearer_auth(token.expose_secret()).send().await?)
    }

    async fn get_app(&self, name: &str) -> Result<ContainerApp> {
        let response = self.send(self.http.get(self.app_url(name))).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(ProvisioningError::NotFound(name.to_string())),
            status if status.is_success() => Ok(response.json().await?),
            _ => Err(rejected("get", response).await),
        }
    }

    async fn fetch_page(&self, url: &str) -> Result<ContainerAppCollection> {
        let response = self.send(self.http.get(url)).await?;
        if !response.status().is_success() {
            return Err(rejected("list", response).await);
        }
        Ok(response.json().await?)
    }

    /// Poll a long-running operation until the platform reports a terminal state.
    async fn await_operation(
        &self,
        operation: &'static str,
        mut target: PollTarget,
        mut delay: Duration,
    ) -> Result<()> {
        loop {
            tokio::time::sleep(delay).await;

            let response = self.send(self.http.get(target.url())).await?;
            let status = response.status();
            delay = retry_after(response.headers()).unwrap_or(self.poll_interval);

            match target {
                PollTarget::AsyncOperation(_) => {
                    if !status.is_success() {
                        return Err(rejected(operation, response).await);
                    }
                    let payload = response.text().await?;
                    let op: AsyncOperationStatus = serde_json::from_str(&payload)?;
                    if op.status == "Succeeded" {
                        return Ok(());
                    }
                    if is_terminal_failure(&op.status) {
                        return Err(ProvisioningError::OperationFailed {
                            operation,
                            state: op.status,
                            payload,
                        });
                    }
                    debug!(operation, status = %op.status, "Operation still running");
                }
                PollTarget::Location(_) => {
                    if status == StatusCode::ACCEPTED {
                        if let Some(next) = PollTarget::from_headers(response.headers()) {
                            target = next;
                        }
                        debug!(operation, "Operation still running");
                        continue;
                    }
                    if status.is_success() {
                        return Ok(());
                    }
                    return Err(rejected(operation, response).await);
                }
            }
        }
    }

    /// Read the app back until the platform no longer knows it.
    async fn await_removed(&self, name: &str) -> Result<()> {
        loop {
            match self.get_app(name).await {
                Err(ProvisioningError::NotFound(_)) => return Ok(()),
                Err(err) => return Err(err),
                Ok(app) => {
                    debug!(app = name, state = ?app.provisioning_state(), "Waiting for removal");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    /// Read the app back until its provisioning state settles.
    async fn await_provisioned(&self, name: &str) -> Result<ContainerApp> {
        loop {
            let app = self.get_app(name).await?;
            match app.provisioning_state() {
                None | Some("Succeeded") => return Ok(app),
                Some(state) if is_terminal_failure(state) => {
                    return Err(ProvisioningError::OperationFailed {
                        operation: "create_or_update",
                        state: state.to_string(),
                        payload: serde_json::to_string(&app)?,
                    });
                }
                Some(state) => {
                    debug!(app = name, state, "Waiting for provisioning to settle");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }
}

#[async_trait]
impl Provisioner for AzureContainerApps {
    fn provisioner_type(&self) -> &'static str {
        "azure-container-apps"
    }

    fn list<'a>(&'a self, prefix: &'a str) -> WorkloadStream<'a> {
        Box::pin(async_stream::try_stream! {
            let mut next = Some(self.list_url());
            while let Some(url) = next.take() {
                let page = self.fetch_page(&url).await?;
                debug!(count = page.value.len(), "Fetched container app page");

                for app in &page.value {
                    if let Some(workload) = app.to_workload(prefix) {
                        yield workload;
                    }
                }
                next = page.next_link.filter(|link| !link.is_empty());
            }
        })
    }

    async fn create_or_update(&self, request: &ProvisionRequest) -> Result<ProvisionResult> {
        let name = request.canonical_name.as_str();
        let body = ContainerApp::from(request);

        let response = self
            .send(self.http.put(self.app_url(name)).json(&body))
            .await?;
        if !response.status().is_success() {
            return Err(rejected("create_or_update", response).await);
        }

        if let Some(target) = PollTarget::from_headers(response.headers()) {
            let delay = retry_after(response.headers()).unwrap_or(self.poll_interval);
            info!(app = name, "Waiting for container app deployment");
            self.await_operation("create_or_update", target, delay).await?;
        }

        let app = self.await_provisioned(name).await?;
        Ok(app.into_result(name))
    }

    async fn delete(&self, canonical_name: &str) -> Result<()> {
        let response = self
            .send(self.http.delete(self.app_url(canonical_name)))
            .await?;

        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => {
                Err(ProvisioningError::NotFound(canonical_name.to_string()))
            }
            status if status.is_success() => {
                if let Some(target) = PollTarget::from_headers(response.headers()) {
                    let delay = retry_after(response.headers()).unwrap_or(self.poll_interval);
                    self.await_operation("delete", target, delay).await
                } else if status == StatusCode::ACCEPTED {
                    warn!(canonical_name, "Delete accepted without a status URL, polling the app");
                    self.await_removed(canonical_name).await
                } else {
                    Ok(())
                }
            }
            _ => Err(rejected("delete", response).await),
        }
    }
}
