// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Bearer tokens for Azure Resource Manager.
//!
//! Service principal tokens are fetched with the client-credentials grant and
//! kept fresh by a background [`TokenWatcher`], started on first use.

use std::time::Duration;

use aliri_clock::DurationSecs;
use aliri_tokens::backoff::ErrorBackoffConfig;
use aliri_tokens::jitter::RandomEarlyJitter;
use aliri_tokens::sources::AsyncTokenSource;
use aliri_tokens::{
    AccessToken, IdToken, TokenLifetimeConfig, TokenStatus, TokenWatcher, TokenWithLifetime,
};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::debug;
use zeroize::Zeroizing;

use super::super::traits::{ProvisioningError, Result};
use crate::config::CredentialConfig;

/// OAuth scope for the management plane.
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

/// Tokens go stale this long before they expire.
const EXPIRY_MARGIN: u64 = 120;

/// Upper bound on the random early refresh.
const JITTER_MAX: DurationSecs = DurationSecs(30);

/// First retry delay after a failed refresh.
const MIN_RETRY: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
    #[serde(default)]
    token_type: Option<String>,
}

/// Client-credentials exchange against the Entra ID token endpoint.
#[derive(Clone)]
struct ClientSecretSource {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: SecretString,
}

#[async_trait]
impl AsyncTokenSource for ClientSecretSource {
    type Error = ProvisioningError;

    async fn request_token(&mut self) -> Result<TokenWithLifetime> {
        debug!(client_id = %self.client_id, "Requesting management token");

        let secret = Zeroizing::new(self.client_secret.expose_secret().to_owned());
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", secret.as_str()),
                ("scope", MANAGEMENT_SCOPE),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ProvisioningError::Authentication(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = serde_json::from_str(&body)?;
        if let Some(kind) = &token.token_type
            && !kind.eq_ignore_ascii_case("bearer")
        {
            return Err(ProvisioningError::Authentication(format!(
                "unsupported token type {kind}"
            )));
        }

        let (freshness, min_stale) = refresh_params(token.expires_in);
        Ok(TokenLifetimeConfig::new(freshness, min_stale).create_token(
            &AccessToken::new(token.access_token),
            None::<&IdToken>,
            DurationSecs(token.expires_in),
        ))
    }
}

/// Fraction of the lifetime a token stays fresh, and the minimum stale window.
///
/// Stale [`EXPIRY_MARGIN`] seconds before expiry, or at half-life for tokens
/// shorter than the margin.
fn refresh_params(lifetime_secs: u64) -> (f64, DurationSecs) {
    if lifetime_secs == 0 {
        return (0.0, DurationSecs(0));
    }
    let fresh_for = if EXPIRY_MARGIN < lifetime_secs {
        lifetime_secs - EXPIRY_MARGIN
    } else {
        lifetime_secs / 2
    };
    (
        fresh_for as f64 / lifetime_secs as f64,
        DurationSecs(lifetime_secs - fresh_for),
    )
}

enum Supply {
    Static(SecretString),
    ClientSecret {
        source: ClientSecretSource,
        watcher: OnceCell<TokenWatcher>,
    },
}

/// Hands out bearer tokens for management API calls.
pub struct AzureCredential {
    supply: Supply,
}

impl AzureCredential {
    /// Create a token supplier for `config`.
    pub fn new(config: CredentialConfig, authority_host: &str, http: reqwest::Client) -> Self {
        let supply = match config {
            CredentialConfig::AccessToken(token) => Supply::Static(token),
            CredentialConfig::ClientSecret {
                tenant_id,
                client_id,
                client_secret,
            } => Supply::ClientSecret {
                source: ClientSecretSource {
                    http,
                    token_url: format!(
                        "{}/{}/oauth2/v2.0/token",
                        authority_host.trim_end_matches('/'),
                        tenant_id
                    ),
                    client_id,
                    client_secret,
                },
                watcher: OnceCell::new(),
            },
        };
        Self { supply }
    }

    /// Current bearer token.
    ///
    /// The first call for a service principal fetches a token and starts the
    /// background refresh; later calls read the cached value.
    pub async fn token(&self) -> Result<SecretString> {
        let (source, watcher) = match &self.supply {
            Supply::Static(token) => return Ok(token.clone()),
            Supply::ClientSecret { source, watcher } => (source, watcher),
        };

        let watcher = watcher
            .get_or_try_init(|| {
                let backoff = ErrorBackoffConfig::new(MIN_RETRY, MIN_RETRY * 30, 2);
                TokenWatcher::spawn_from_token_source(
                    source.clone(),
                    RandomEarlyJitter::new(JITTER_MAX),
                    backoff,
                )
            })
            .await?;

        let current = watcher.token();
        if matches!(current.token_status(), TokenStatus::Expired) {
            return Err(ProvisioningError::Authentication(
                "token expired, refresh pending".to_string(),
            ));
        }
        Ok(SecretString::from(current.access_token().as_str().to_owned()))
    }
}
