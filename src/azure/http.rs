//! HTTP utilities for ARM REST API calls

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, LOCATION, RETRY_AFTER};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

const AZURE_ASYNC_OPERATION: &str = "azure-asyncoperation";

/// Sanitize response body for logging
/// Truncates long responses and strips non-printable characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = (0..=MAX_LOG_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Error returned by ARM, `{"error": {"code": .., "message": ..}}`
#[derive(Debug, Clone, Error)]
#[error("{code} ({status}): {message}")]
pub struct ArmError {
    pub status: u16,
    pub code: String,
    pub message: String,
}

impl ArmError {
    fn from_body(status: StatusCode, body: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let error = parsed.as_ref().and_then(|v| v.get("error"));
        let field = |name: &str| {
            error
                .and_then(|e| e.get(name))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };

        Self {
            status: status.as_u16(),
            code: field("code").unwrap_or_else(|| {
                status.canonical_reason().unwrap_or("HttpError").replace(' ', "")
            }),
            message: field("message").unwrap_or_else(|| "API request failed".to_string()),
        }
    }
}

/// Successful ARM response plus the headers that drive long-running operations
#[derive(Debug, Clone)]
pub struct ArmResponse {
    pub status: StatusCode,
    pub body: Value,
    pub async_operation: Option<String>,
    pub location: Option<String>,
    pub retry_after: Option<Duration>,
}

impl ArmResponse {
    fn new(status: StatusCode, headers: &HeaderMap, body: &str) -> Result<Self> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        let body = if body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(body).context("Failed to parse response JSON")?
        };

        Ok(Self {
            status,
            body,
            async_operation: header(AZURE_ASYNC_OPERATION),
            location: header(LOCATION.as_str()),
            retry_after: header(RETRY_AFTER.as_str())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs),
        })
    }

    /// Whether the provider is still working on the request
    pub fn is_long_running(&self) -> bool {
        self.status == StatusCode::ACCEPTED
            || (self.status == StatusCode::CREATED && self.async_operation.is_some())
            || (self.status == StatusCode::OK && self.async_operation.is_some())
    }
}

/// HTTP client wrapper for ARM API calls
#[derive(Clone)]
pub struct AzureHttpClient {
    client: Client,
}

impl AzureHttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("aznuke/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Send a request. Non-success statuses become an [`ArmError`].
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        token: &str,
        body: Option<&Value>,
    ) -> Result<ArmResponse> {
        tracing::debug!("{} {}", method, url);

        let mut request = self.client.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.context("Failed to send request")?;

        let status = response.status();
        let headers = response.headers().clone();
        let text = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&text));
            return Err(ArmError::from_body(status, &text).into());
        }

        ArmResponse::new(status, &headers, &text)
    }
}

impl Default for AzureHttpClient {
    fn default() -> Self {
        Self::new().expect("Failed to create default HTTP client")
    }
}

/// Whether an error chain carries an ARM error with the given status
pub fn has_status(error: &anyhow::Error, status: u16) -> bool {
    error
        .downcast_ref::<ArmError>()
        .is_some_and(|e| e.status == status)
}

/// Format a top-level ARM error for display
pub fn format_azure_error(error: &anyhow::Error) -> String {
    if let Some(arm) = error.downcast_ref::<ArmError>() {
        let hint = match arm.status {
            401 => "Authentication failed. Run 'az login' or set AZURE_ACCESS_TOKEN.",
            403 => "Permission denied. Check your Azure role assignments.",
            404 => "Resource not found.",
            409 => "Resource conflict. The resource may be in use or locked.",
            429 => "Rate limit exceeded. Please try again later.",
            500 | 502 | 503 => "Azure service temporarily unavailable. Please try again.",
            _ => return arm.to_string(),
        };
        return format!("{} ({})", hint, arm.message);
    }

    let error_str = format!("{:#}", error);
    let sanitized = error_str
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(160)
        .collect::<String>();

    if sanitized.len() < error_str.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}
