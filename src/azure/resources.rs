//! Generic resource operations over ARM

use super::client::AzureClient;
use super::ops::ResourceOps;
use crate::resource::id::ParsedResourceId;
use anyhow::Result;
use async_trait::async_trait;

/// API version of the generic resources listing endpoint
pub const RESOURCES_API_VERSION: &str = "2021-04-01";

impl AzureClient {
    /// URL of `/subscriptions/{id}/resources`, optionally filtered by type
    pub fn resources_url(&self, resource_type: Option<&str>) -> Result<String> {
        let mut url = url::Url::parse(&self.arm_url(
            &format!("{}/resources", self.subscription_path()),
            RESOURCES_API_VERSION,
        )?)?;
        if let Some(ty) = resource_type {
            url.query_pairs_mut()
                .append_pair("$filter", &format!("resourceType eq '{}'", ty));
        }
        Ok(url.to_string())
    }
}

#[async_trait]
impl ResourceOps for AzureClient {
    async fn delete_by_id(&self, id: &ParsedResourceId, api_version: &str) -> Result<()> {
        let url = self.arm_url(&id.to_path(&self.subscription_id), api_version)?;
        tracing::info!(
            "Deleting {}/{}/{} in {}",
            id.provider,
            id.type_path,
            id.name,
            id.resource_group
        );
        self.delete_and_wait(&url).await
    }
}
