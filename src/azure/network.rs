//! Network operations over ARM

use super::client::AzureClient;
use super::ops::NetworkOps;
use crate::resource::registry::{api_version_for, NETWORK_INTERFACE};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

const NETWORK: &str = "Microsoft.Network";

impl AzureClient {
    fn network_url(&self, resource_group: &str, path: &str) -> Result<String> {
        self.arm_url(
            &format!("{}/{}", self.provider_path(resource_group, NETWORK), path),
            api_version_for(NETWORK_INTERFACE),
        )
    }
}

fn enc(name: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(name)
}

#[async_trait]
impl NetworkOps for AzureClient {
    async fn get_public_ip(&self, resource_group: &str, name: &str) -> Result<Value> {
        let url = self.network_url(resource_group, &format!("publicIPAddresses/{}", enc(name)))?;
        self.get(&url).await
    }

    async fn get_network_interface(&self, resource_group: &str, name: &str) -> Result<Value> {
        let url = self.network_url(resource_group, &format!("networkInterfaces/{}", enc(name)))?;
        self.get(&url).await
    }

    async fn list_network_interfaces(&self, resource_group: &str) -> Result<Vec<Value>> {
        let url = self.network_url(resource_group, "networkInterfaces")?;
        self.get_all_pages(&url).await
    }

    async fn update_network_interface(&self, resource_group: &str, name: &str, nic: &Value) -> Result<()> {
        let url = self.network_url(resource_group, &format!("networkInterfaces/{}", enc(name)))?;
        self.put_and_wait(&url, nic).await?;
        Ok(())
    }

    async fn delete_network_interface(&self, resource_group: &str, name: &str) -> Result<()> {
        let url = self.network_url(resource_group, &format!("networkInterfaces/{}", enc(name)))?;
        self.delete_and_wait(&url).await
    }

    async fn list_subnets(&self, resource_group: &str, vnet: &str) -> Result<Vec<Value>> {
        let url = self.network_url(resource_group, &format!("virtualNetworks/{}/subnets", enc(vnet)))?;
        self.get_all_pages(&url).await
    }

    async fn update_subnet(&self, resource_group: &str, vnet: &str, name: &str, subnet: &Value) -> Result<()> {
        let url = self.network_url(
            resource_group,
            &format!("virtualNetworks/{}/subnets/{}", enc(vnet), enc(name)),
        )?;
        self.put_and_wait(&url, subnet).await?;
        Ok(())
    }

    async fn get_virtual_network(&self, resource_group: &str, name: &str) -> Result<Value> {
        let url = self.network_url(resource_group, &format!("virtualNetworks/{}", enc(name)))?;
        self.get(&url).await
    }

    async fn update_virtual_network(&self, resource_group: &str, name: &str, vnet: &Value) -> Result<()> {
        let url = self.network_url(resource_group, &format!("virtualNetworks/{}", enc(name)))?;
        self.put_and_wait(&url, vnet).await?;
        Ok(())
    }
}
