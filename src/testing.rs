//! In-memory Azure used by unit tests
//!
//! `FakeCloud` keeps provider state as raw ARM JSON keyed by resource name
//! (one resource group is assumed) and logs every call as `VERB type/name`.

use crate::azure::http::ArmError;
use crate::azure::ops::{ClientFactory, ComputeOps, NetworkOps, ResourceOps};
use crate::resource::id::ParsedResourceId;
use crate::resource::{Account, ResourceRecord};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const SUBSCRIPTION: &str = "sub-1";
pub const RESOURCE_GROUP: &str = "rg1";

pub fn account(id: &str) -> Account {
    Account {
        subscription_id: id.to_string(),
        display_name: format!("Subscription {}", id),
        state: "Enabled".to_string(),
    }
}

/// Record owned by the default test subscription
pub fn record(id: &str, resource_type: &str) -> ResourceRecord {
    ResourceRecord::new(id, resource_type, &account(SUBSCRIPTION))
}

/// Full ARM ID in the default subscription and resource group
pub fn arm_id(provider: &str, type_path: &str, name: &str) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}/providers/{}/{}/{}",
        SUBSCRIPTION, RESOURCE_GROUP, provider, type_path, name
    )
}

pub fn network_id(type_path: &str, name: &str) -> String {
    arm_id("Microsoft.Network", type_path, name)
}

pub fn compute_id(type_path: &str, name: &str) -> String {
    arm_id("Microsoft.Compute", type_path, name)
}

fn not_found(what: &str) -> anyhow::Error {
    ArmError {
        status: 404,
        code: "ResourceNotFound".to_string(),
        message: format!("{} was not found", what),
    }
    .into()
}

#[derive(Default)]
pub struct FakeCloud {
    pub public_ips: Mutex<HashMap<String, Value>>,
    pub nics: Mutex<BTreeMap<String, Value>>,
    pub vnets: Mutex<HashMap<String, Value>>,
    pub vms: Mutex<HashMap<String, Value>>,
    /// Resource name -> error message returned by `delete_by_id`
    pub delete_errors: Mutex<HashMap<String, String>>,
    pub calls: Mutex<Vec<String>>,
    pub clients_built: AtomicUsize,
    pub fail_clients: AtomicBool,
}

impl FakeCloud {
    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn add_public_ip(&self, name: &str, ip_configuration: Option<&str>) {
        let mut properties = json!({});
        if let Some(config) = ip_configuration {
            properties["ipConfiguration"] = json!({ "id": config });
        }
        self.public_ips.lock().unwrap().insert(
            name.to_string(),
            json!({ "id": network_id("publicIPAddresses", name), "name": name, "properties": properties }),
        );
    }

    pub fn add_nic(&self, name: &str, nic: Value) {
        self.nics.lock().unwrap().insert(name.to_string(), nic);
    }

    pub fn nic(&self, name: &str) -> Option<Value> {
        self.nics.lock().unwrap().get(name).cloned()
    }

    pub fn add_vnet(&self, name: &str, subnets: Vec<Value>) {
        self.vnets.lock().unwrap().insert(
            name.to_string(),
            json!({ "id": network_id("virtualNetworks", name), "name": name, "properties": { "subnets": subnets } }),
        );
    }

    pub fn vnet(&self, name: &str) -> Option<Value> {
        self.vnets.lock().unwrap().get(name).cloned()
    }

    pub fn add_vm(&self, name: &str, nic_ids: &[&str]) {
        let nics: Vec<Value> = nic_ids.iter().map(|id| json!({ "id": id })).collect();
        self.vms.lock().unwrap().insert(
            name.to_string(),
            json!({ "id": compute_id("virtualMachines", name), "name": name,
                    "properties": { "networkProfile": { "networkInterfaces": nics } } }),
        );
    }

    pub fn vm(&self, name: &str) -> Option<Value> {
        self.vms.lock().unwrap().get(name).cloned()
    }

    pub fn fail_delete(&self, name: &str, message: &str) {
        self.delete_errors
            .lock()
            .unwrap()
            .insert(name.to_string(), message.to_string());
    }
}

/// [`ClientFactory`] handing out clients over one shared [`FakeCloud`]
#[derive(Clone, Default)]
pub struct FakeFactory(pub Arc<FakeCloud>);

impl FakeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cloud(&self) -> &FakeCloud {
        &self.0
    }

    pub fn clients_built(&self) -> usize {
        self.0.clients_built.load(Ordering::SeqCst)
    }

    fn build(&self) -> Result<FakeClient> {
        if self.0.fail_clients.load(Ordering::SeqCst) {
            anyhow::bail!("credentials rejected");
        }
        self.0.clients_built.fetch_add(1, Ordering::SeqCst);
        Ok(FakeClient(self.0.clone()))
    }
}

impl ClientFactory for FakeFactory {
    fn resource_client(&self, _subscription_id: &str) -> Result<Arc<dyn ResourceOps>> {
        Ok(Arc::new(self.build()?))
    }

    fn network_client(&self, _subscription_id: &str) -> Result<Arc<dyn NetworkOps>> {
        Ok(Arc::new(self.build()?))
    }

    fn compute_client(&self, _subscription_id: &str) -> Result<Arc<dyn ComputeOps>> {
        Ok(Arc::new(self.build()?))
    }
}

struct FakeClient(Arc<FakeCloud>);

#[async_trait]
impl ResourceOps for FakeClient {
    async fn delete_by_id(&self, id: &ParsedResourceId, _api_version: &str) -> Result<()> {
        self.0.log(format!("DELETE {}/{}", id.type_path, id.name));
        if let Some(message) = self.0.delete_errors.lock().unwrap().get(&id.name) {
            return Err(ArmError {
                status: 409,
                code: "Conflict".to_string(),
                message: message.clone(),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl NetworkOps for FakeClient {
    async fn get_public_ip(&self, _rg: &str, name: &str) -> Result<Value> {
        self.0.log(format!("GET publicIPAddresses/{}", name));
        self.0.public_ips.lock().unwrap().get(name).cloned().ok_or_else(|| not_found(name))
    }

    async fn get_network_interface(&self, _rg: &str, name: &str) -> Result<Value> {
        self.0.log(format!("GET networkInterfaces/{}", name));
        self.0.nic(name).ok_or_else(|| not_found(name))
    }

    async fn list_network_interfaces(&self, _rg: &str) -> Result<Vec<Value>> {
        self.0.log("LIST networkInterfaces".to_string());
        Ok(self.0.nics.lock().unwrap().values().cloned().collect())
    }

    async fn update_network_interface(&self, _rg: &str, name: &str, nic: &Value) -> Result<()> {
        self.0.log(format!("PUT networkInterfaces/{}", name));
        self.0.add_nic(name, nic.clone());
        Ok(())
    }

    async fn delete_network_interface(&self, _rg: &str, name: &str) -> Result<()> {
        self.0.log(format!("DELETE networkInterfaces/{}", name));
        self.0.nics.lock().unwrap().remove(name);
        Ok(())
    }

    async fn list_subnets(&self, _rg: &str, vnet: &str) -> Result<Vec<Value>> {
        self.0.log(format!("LIST virtualNetworks/{}/subnets", vnet));
        let vnet = self.0.vnet(vnet).ok_or_else(|| not_found(vnet))?;
        Ok(vnet["properties"]["subnets"].as_array().cloned().unwrap_or_default())
    }

    async fn update_subnet(&self, _rg: &str, vnet: &str, name: &str, subnet: &Value) -> Result<()> {
        self.0.log(format!("PUT virtualNetworks/{}/subnets/{}", vnet, name));
        let mut vnets = self.0.vnets.lock().unwrap();
        let entry = vnets.get_mut(vnet).ok_or_else(|| not_found(vnet))?;
        if let Some(subnets) = entry["properties"]["subnets"].as_array_mut() {
            for existing in subnets.iter_mut() {
                if existing["name"] == name {
                    *existing = subnet.clone();
                }
            }
        }
        Ok(())
    }

    async fn get_virtual_network(&self, _rg: &str, name: &str) -> Result<Value> {
        self.0.log(format!("GET virtualNetworks/{}", name));
        self.0.vnet(name).ok_or_else(|| not_found(name))
    }

    async fn update_virtual_network(&self, _rg: &str, name: &str, vnet: &Value) -> Result<()> {
        self.0.log(format!("PUT virtualNetworks/{}", name));
        self.0.vnets.lock().unwrap().insert(name.to_string(), vnet.clone());
        Ok(())
    }
}

#[async_trait]
impl ComputeOps for FakeClient {
    async fn get_virtual_machine(&self, _rg: &str, name: &str) -> Result<Value> {
        self.0.log(format!("GET virtualMachines/{}", name));
        self.0.vm(name).ok_or_else(|| not_found(name))
    }

    async fn update_virtual_machine(&self, _rg: &str, name: &str, vm: &Value) -> Result<()> {
        self.0.log(format!("PUT virtualMachines/{}", name));
        self.0.vms.lock().unwrap().insert(name.to_string(), vm.clone());
        Ok(())
    }
}
