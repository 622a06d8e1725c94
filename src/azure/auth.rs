//! Azure Authentication
//!
//! Acquires ARM access tokens from a static token (`AZURE_ACCESS_TOKEN`)
//! or the Azure CLI, and caches them until shortly before expiry.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Resource the ARM tokens are issued for
pub const MANAGEMENT_RESOURCE: &str = "https://management.azure.com/";

/// Environment variable holding a pre-acquired bearer token
pub const ACCESS_TOKEN_ENV: &str = "AZURE_ACCESS_TOKEN";

/// Token expiry buffer - refresh tokens this much before they actually expire
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Default token TTL if we can't determine expiry (conservative: 30 minutes)
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

/// A bearer token and, when known, its expiry
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Something that can mint ARM access tokens
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch_token(&self) -> Result<AccessToken>;
}

/// Token handed in from outside (env var, tests)
pub struct StaticTokenSource(String);

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn fetch_token(&self) -> Result<AccessToken> {
        Ok(AccessToken {
            token: self.0.clone(),
            expires_at: None,
        })
    }
}

/// Tokens from `az account get-access-token`
pub struct AzureCliTokenSource {
    resource: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
    /// Unix timestamp, present on newer CLI versions
    #[serde(default, rename = "expires_on")]
    expires_on: Option<i64>,
    /// Local time `YYYY-MM-DD HH:MM:SS.ffffff`, present on all versions
    #[serde(default, rename = "expiresOn")]
    expires_on_local: Option<String>,
}

impl AzureCliTokenSource {
    pub fn new(resource: &str) -> Self {
        Self {
            resource: resource.to_string(),
        }
    }
}

#[async_trait]
impl TokenSource for AzureCliTokenSource {
    async fn fetch_token(&self) -> Result<AccessToken> {
        let output = tokio::process::Command::new("az")
            .args([
                "account",
                "get-access-token",
                "--resource",
                &self.resource,
                "--output",
                "json",
            ])
            .output()
            .await
            .context("Failed to run the Azure CLI. Is 'az' installed and on PATH?")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow::anyhow!(
                "Azure CLI could not issue a token (run 'az login'): {}",
                stderr.trim()
            ));
        }

        parse_cli_token(&output.stdout)
    }
}

fn parse_cli_token(stdout: &[u8]) -> Result<AccessToken> {
    let token: CliToken =
        serde_json::from_slice(stdout).context("Failed to parse Azure CLI token output")?;

    let expires_at = token
        .expires_on
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
        .or_else(|| {
            token
                .expires_on_local
                .as_deref()
                .and_then(|s| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok())
                .and_then(|naive| naive.and_local_timezone(chrono::Local).single())
                .map(|local| local.with_timezone(&Utc))
        });

    Ok(AccessToken {
        token: token.access_token,
        expires_at,
    })
}

/// Azure credentials holder with token caching
#[derive(Clone)]
pub struct AzureCredentials {
    source: Arc<dyn TokenSource>,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// When this token expires (with buffer applied)
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

impl AzureCredentials {
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self {
            source,
            token_cache: Arc::new(RwLock::new(None)),
        }
    }

    /// `AZURE_ACCESS_TOKEN` if set, otherwise the Azure CLI
    pub fn from_environment() -> Self {
        match std::env::var(ACCESS_TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => {
                tracing::info!("Using access token from {}", ACCESS_TOKEN_ENV);
                Self::new(Arc::new(StaticTokenSource::new(token.trim())))
            }
            _ => {
                tracing::info!("Using Azure CLI credentials");
                Self::new(Arc::new(AzureCliTokenSource::new(MANAGEMENT_RESOURCE)))
            }
        }
    }

    /// Get an access token for API calls
    pub async fn get_token(&self) -> Result<String> {
        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        let token = self
            .source
            .fetch_token()
            .await
            .context("Failed to get access token")?;

        let ttl = token
            .expires_at
            .map(|at| at - Utc::now())
            .and_then(|remaining| remaining.to_std().ok())
            .unwrap_or(DEFAULT_TOKEN_TTL);
        let expires_at = Instant::now() + ttl.saturating_sub(TOKEN_EXPIRY_BUFFER);

        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: token.token.clone(),
                expires_at,
            });
        }

        tracing::debug!(
            "New token cached, expires in ~{} minutes",
            ttl.saturating_sub(TOKEN_EXPIRY_BUFFER).as_secs() / 60
        );

        Ok(token.token)
    }

    /// Force refresh the token
    pub async fn refresh_token(&self) -> Result<String> {
        {
            let mut cache = self.token_cache.write().await;
            *cache = None;
        }
        self.get_token().await
    }
}
