//! Provider operations used by the deletion engine
//!
//! The engine talks to Azure through these traits so that pre-processing and
//! deletion can run against ARM or against in-memory fakes. Every mutating
//! call blocks until the provider's long-running operation completes.

use super::auth::AzureCredentials;
use super::client::{AzureClient, DEFAULT_MANAGEMENT_ENDPOINT, DEFAULT_POLL_INTERVAL};
use super::http::AzureHttpClient;
use crate::resource::id::ParsedResourceId;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Generic resource operations (`Microsoft.Resources`)
#[async_trait]
pub trait ResourceOps: Send + Sync {
    /// Delete a resource by its decomposed coordinates
    async fn delete_by_id(&self, id: &ParsedResourceId, api_version: &str) -> Result<()>;
}

/// Network operations (`Microsoft.Network`)
#[async_trait]
pub trait NetworkOps: Send + Sync {
    async fn get_public_ip(&self, resource_group: &str, name: &str) -> Result<Value>;
    async fn get_network_interface(&self, resource_group: &str, name: &str) -> Result<Value>;
    async fn list_network_interfaces(&self, resource_group: &str) -> Result<Vec<Value>>;
    async fn update_network_interface(&self, resource_group: &str, name: &str, nic: &Value) -> Result<()>;
    async fn delete_network_interface(&self, resource_group: &str, name: &str) -> Result<()>;
    async fn list_subnets(&self, resource_group: &str, vnet: &str) -> Result<Vec<Value>>;
    async fn update_subnet(&self, resource_group: &str, vnet: &str, name: &str, subnet: &Value) -> Result<()>;
    async fn get_virtual_network(&self, resource_group: &str, name: &str) -> Result<Value>;
    async fn update_virtual_network(&self, resource_group: &str, name: &str, vnet: &Value) -> Result<()>;
}

/// Compute operations (`Microsoft.Compute`)
#[async_trait]
pub trait ComputeOps: Send + Sync {
    async fn get_virtual_machine(&self, resource_group: &str, name: &str) -> Result<Value>;
    async fn update_virtual_machine(&self, resource_group: &str, name: &str, vm: &Value) -> Result<()>;
}

/// Builds per-subscription clients. Holds the credential handle so the
/// engine never has to look at it.
pub trait ClientFactory: Send + Sync {
    fn resource_client(&self, subscription_id: &str) -> Result<Arc<dyn ResourceOps>>;
    fn network_client(&self, subscription_id: &str) -> Result<Arc<dyn NetworkOps>>;
    fn compute_client(&self, subscription_id: &str) -> Result<Arc<dyn ComputeOps>>;
}

/// [`ClientFactory`] backed by ARM
#[derive(Clone)]
pub struct AzureClientFactory {
    credentials: AzureCredentials,
    http: AzureHttpClient,
    base_url: String,
    poll_interval: Duration,
}

impl AzureClientFactory {
    pub fn new(credentials: AzureCredentials) -> Result<Self> {
        Ok(Self {
            credentials,
            http: AzureHttpClient::new()?,
            base_url: DEFAULT_MANAGEMENT_ENDPOINT.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Point at another ARM endpoint (sovereign clouds, test servers)
    pub fn with_endpoint(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Concrete client for one subscription
    pub fn client(&self, subscription_id: &str) -> AzureClient {
        AzureClient::new(
            self.credentials.clone(),
            self.http.clone(),
            &self.base_url,
            subscription_id,
        )
        .with_poll_interval(self.poll_interval)
    }

    /// Client for calls above subscription scope, such as listing
    /// subscriptions
    pub fn tenant_client(&self) -> AzureClient {
        self.client("")
    }
}

impl ClientFactory for AzureClientFactory {
    fn resource_client(&self, subscription_id: &str) -> Result<Arc<dyn ResourceOps>> {
        Ok(Arc::new(self.client(subscription_id)))
    }

    fn network_client(&self, subscription_id: &str) -> Result<Arc<dyn NetworkOps>> {
        Ok(Arc::new(self.client(subscription_id)))
    }

    fn compute_client(&self, subscription_id: &str) -> Result<Arc<dyn ComputeOps>> {
        Ok(Arc::new(self.client(subscription_id)))
    }
}
