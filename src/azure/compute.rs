//! Compute operations over ARM

use super::client::AzureClient;
use super::ops::ComputeOps;
use crate::resource::registry::{api_version_for, VIRTUAL_MACHINE};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

impl AzureClient {
    fn virtual_machine_url(&self, resource_group: &str, name: &str) -> Result<String> {
        self.arm_url(
            &format!(
                "{}/virtualMachines/{}",
                self.provider_path(resource_group, "Microsoft.Compute"),
                urlencoding::encode(name)
            ),
            api_version_for(VIRTUAL_MACHINE),
        )
    }
}

#[async_trait]
impl ComputeOps for AzureClient {
    async fn get_virtual_machine(&self, resource_group: &str, name: &str) -> Result<Value> {
        let url = self.virtual_machine_url(resource_group, name)?;
        self.get(&url).await
    }

    async fn update_virtual_machine(&self, resource_group: &str, name: &str, vm: &Value) -> Result<()> {
        let url = self.virtual_machine_url(resource_group, name)?;
        self.put_and_wait(&url, vm).await?;
        Ok(())
    }
}
