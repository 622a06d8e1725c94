//! Azure Client
//!
//! Main client for interacting with Azure Resource Manager, combining
//! authentication, HTTP functionality and long-running operation polling.

use super::auth::AzureCredentials;
use super::http::{has_status, ArmError, ArmResponse, AzureHttpClient};
use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Public cloud management endpoint
pub const DEFAULT_MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";

/// Default delay between long-running operation polls when ARM sends no
/// `Retry-After`
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Main Azure client, scoped to one subscription
#[derive(Clone)]
pub struct AzureClient {
    pub credentials: AzureCredentials,
    pub http: AzureHttpClient,
    pub subscription_id: String,
    base_url: String,
    poll_interval: Duration,
}

impl AzureClient {
    pub fn new(
        credentials: AzureCredentials,
        http: AzureHttpClient,
        base_url: &str,
        subscription_id: &str,
    ) -> Self {
        Self {
            credentials,
            http,
            subscription_id: subscription_id.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    // =========================================================================
    // URL helpers
    // =========================================================================

    /// Build an ARM URL for `path` (starting with `/`) at `api_version`
    pub fn arm_url(&self, path: &str, api_version: &str) -> Result<String> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .with_context(|| format!("Invalid ARM path: {}", path))?;
        url.query_pairs_mut().append_pair("api-version", api_version);
        Ok(url.to_string())
    }

    /// `/subscriptions/{id}`
    pub fn subscription_path(&self) -> String {
        format!("/subscriptions/{}", urlencoding::encode(&self.subscription_id))
    }

    /// `/subscriptions/{id}/resourceGroups/{rg}/providers/{namespace}`
    pub fn provider_path(&self, resource_group: &str, namespace: &str) -> String {
        format!(
            "{}/resourceGroups/{}/providers/{}",
            self.subscription_path(),
            urlencoding::encode(resource_group),
            namespace
        )
    }

    // =========================================================================
    // Requests
    // =========================================================================

    /// Send a request, refreshing the token once if ARM rejects it with 401
    pub async fn send(&self, method: Method, url: &str, body: Option<&Value>) -> Result<ArmResponse> {
        let token = self.credentials.get_token().await?;
        match self.http.send(method.clone(), url, &token, body).await {
            Err(e) if has_status(&e, 401) => {
                tracing::debug!("Token rejected, refreshing and retrying once");
                let token = self.credentials.refresh_token().await?;
                self.http.send(method, url, &token, body).await
            }
            other => other,
        }
    }

    pub async fn get(&self, url: &str) -> Result<Value> {
        Ok(self.send(Method::GET, url, None).await?.body)
    }

    /// PUT a resource body and wait until ARM reports the update finished
    pub async fn put_and_wait(&self, url: &str, body: &Value) -> Result<Value> {
        let response = self.send(Method::PUT, url, Some(body)).await?;
        self.wait_for_completion(response).await
    }

    /// DELETE a resource and wait until ARM reports it gone
    pub async fn delete_and_wait(&self, url: &str) -> Result<()> {
        let response = self.send(Method::DELETE, url, None).await?;
        self.wait_for_completion(response).await?;
        Ok(())
    }

    /// GET every page of a list endpoint, following `nextLink`
    pub async fn get_all_pages(&self, url: &str) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        let mut next = Some(url.to_string());

        while let Some(page_url) = next {
            let page = self.get(&page_url).await?;
            if let Some(values) = page.get("value").and_then(|v| v.as_array()) {
                items.extend(values.iter().cloned());
            }
            next = page
                .get("nextLink")
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string);
        }

        Ok(items)
    }

    // =========================================================================
    // Long-running operations
    // =========================================================================

    /// Block until a long-running operation reaches a terminal state.
    /// There is no client-side timeout: the provider decides when it is done.
    pub async fn wait_for_completion(&self, response: ArmResponse) -> Result<Value> {
        if !response.is_long_running() {
            return Ok(response.body);
        }

        let mut delay = response.retry_after.unwrap_or(self.poll_interval);
        let mut polls = 0u32;

        if let Some(operation_url) = response.async_operation.as_deref() {
            loop {
                tokio::time::sleep(delay).await;
                polls += 1;

                let status = self.send(Method::GET, operation_url, None).await?;
                let state = status
                    .body
                    .get("status")
                    .and_then(|v| v.as_str())
                    .unwrap_or("InProgress");
                tracing::debug!("Operation poll #{}: {}", polls, state);

                if state.eq_ignore_ascii_case("Succeeded") {
                    return Ok(response.body);
                }
                if state.eq_ignore_ascii_case("Failed") || state.eq_ignore_ascii_case("Canceled") {
                    return Err(operation_error(&status.body, state).into());
                }
                delay = status.retry_after.unwrap_or(self.poll_interval);
            }
        }

        if let Some(location) = response.location.as_deref() {
            loop {
                tokio::time::sleep(delay).await;
                polls += 1;

                let status = self.send(Method::GET, location, None).await?;
                tracing::debug!("Location poll #{}: {}", polls, status.status);
                if status.status != StatusCode::ACCEPTED {
                    return Ok(status.body);
                }
                delay = status.retry_after.unwrap_or(self.poll_interval);
            }
        }

        // Accepted without anything to poll: nothing more to wait on
        Ok(response.body)
    }
}

fn operation_error(body: &Value, state: &str) -> ArmError {
    let field = |name: &str| {
        body.get("error")
            .and_then(|e| e.get(name))
            .and_then(|v| v.as_str())
            .map(str::to_string)
    };
    ArmError {
        status: StatusCode::OK.as_u16(),
        code: field("code").unwrap_or_else(|| format!("Operation{}", state)),
        message: field("message").unwrap_or_else(|| format!("Long-running operation {}", state)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::azure::auth::StaticTokenSource;
    use serde_json::json;
    use std::sync::Arc;

    fn client() -> AzureClient {
        let creds = AzureCredentials::new(Arc::new(StaticTokenSource::new("t")));
        AzureClient::new(creds, AzureHttpClient::default(), "https://management.azure.com/", "sub 1")
    }

    #[test]
    fn test_arm_url() {
        let c = client();
        assert_eq!(
            c.arm_url("/subscriptions", "2022-12-01").unwrap(),
            "https://management.azure.com/subscriptions?api-version=2022-12-01"
        );
    }

    #[test]
    fn test_paths_encode_names() {
        let c = client();
        assert_eq!(c.subscription_path(), "/subscriptions/sub%201");
        assert_eq!(
            c.provider_path("my rg", "Microsoft.Network"),
            "/subscriptions/sub%201/resourceGroups/my%20rg/providers/Microsoft.Network"
        );
    }

    #[test]
    fn test_operation_error_message() {
        let err = operation_error(
            &json!({"status": "Failed", "error": {"code": "InUse", "message": "NIC is in use"}}),
            "Failed",
        );
        assert_eq!(err.code, "InUse");
        assert_eq!(err.message, "NIC is in use");

        let err = operation_error(&json!({"status": "Canceled"}), "Canceled");
        assert_eq!(err.code, "OperationCanceled");
    }
}
