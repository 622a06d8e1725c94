//! Pre-processing before deletion
//!
//! Some resource types cannot be deleted while other resources still point
//! at them. These routines break those references first: a public IP is
//! removed from its NIC, an NSG from its NICs and subnets, a subnet from its
//! virtual network, a NIC from its VM.
//!
//! A failed step is reported, never raised. Whether the delete that follows
//! still runs is up to the caller.

use super::{DeletionSettings, StepReport};
use crate::azure::ops::{ClientFactory, ComputeOps, NetworkOps};
use crate::resource::id::{id_segment_after, id_tail, segment_after};
use crate::resource::registry::{preprocess_for, Preprocess};
use crate::resource::ResourceRecord;
use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;

/// Run the pre-processing step registered for the resource's type.
///
/// In a dry run every step is a short pause and a success; no client is
/// built and nothing is sent.
pub async fn preprocess<F: ClientFactory + ?Sized>(
    factory: &F,
    resource: &ResourceRecord,
    settings: &DeletionSettings,
) -> StepReport {
    let Some(step) = preprocess_for(&resource.resource_type) else {
        return StepReport::success("No pre-processing required");
    };

    if settings.dry_run {
        tokio::time::sleep(settings.simulated_delay).await;
        tracing::info!("[dry-run] {} for {}", step_label(step), resource.display_name());
        return StepReport::success(format!("{} (simulation)", step_label(step)));
    }

    tracing::info!("{} for {}", step_label(step), resource.display_name());
    match run_step(factory, resource, step, settings).await {
        Ok(detail) => {
            tracing::info!("{}: {}", resource.display_name(), detail);
            StepReport::success(detail)
        }
        Err(e) => {
            let detail = format!("{:#}", e);
            tracing::warn!("Pre-processing of {} failed: {}", resource.id, detail);
            StepReport::failure(detail)
        }
    }
}

fn step_label(step: Preprocess) -> &'static str {
    match step {
        Preprocess::DisassociatePublicIp => "Public IP disassociation",
        Preprocess::DisassociateNsg => "NSG disassociation",
        Preprocess::ClearSubnet => "Subnet deletion",
        Preprocess::DetachNic => "NIC detachment",
        Preprocess::DetachDisk => "Disk detachment",
    }
}

async fn run_step<F: ClientFactory + ?Sized>(
    factory: &F,
    resource: &ResourceRecord,
    step: Preprocess,
    settings: &DeletionSettings,
) -> Result<String> {
    let subscription = resource.account_id.as_str();
    match step {
        Preprocess::DisassociatePublicIp => {
            let network = factory.network_client(subscription).context("Pre-processing failed")?;
            disassociate_public_ip(network.as_ref(), resource).await
        }
        Preprocess::DisassociateNsg => {
            let network = factory.network_client(subscription).context("Pre-processing failed")?;
            disassociate_nsg(network.as_ref(), resource).await
        }
        Preprocess::ClearSubnet => {
            let network = factory.network_client(subscription).context("Pre-processing failed")?;
            clear_subnet(network.as_ref(), resource).await
        }
        Preprocess::DetachNic => {
            let compute = factory.compute_client(subscription).context("Pre-processing failed")?;
            detach_nic(compute.as_ref(), resource).await
        }
        Preprocess::DetachDisk => {
            // Nothing to call yet: disks are released together with their VM
            tokio::time::sleep(settings.disk_detach_delay).await;
            Ok("Disk detached".to_string())
        }
    }
}

async fn disassociate_public_ip(network: &dyn NetworkOps, resource: &ResourceRecord) -> Result<String> {
    let rg = resource_group(resource)?;
    let ip = network.get_public_ip(rg, &resource.name).await?;

    let Some(config_id) = reference_id(&ip, "ipConfiguration") else {
        return Ok("No NIC association found".to_string());
    };
    let nic_id = config_id.split("/ipConfigurations").next().unwrap_or(config_id);
    let nic_name = id_tail(nic_id);

    let mut nic = network.get_network_interface(rg, nic_name).await?;
    if let Some(configs) = nic
        .pointer_mut("/properties/ipConfigurations")
        .and_then(Value::as_array_mut)
    {
        for config in configs {
            clear_reference(config, "publicIPAddress", &resource.id);
        }
    }
    network.update_network_interface(rg, nic_name, &nic).await?;

    Ok(format!("Disassociated from NIC {}", nic_name))
}

async fn disassociate_nsg(network: &dyn NetworkOps, resource: &ResourceRecord) -> Result<String> {
    let rg = resource_group(resource)?;
    let mut detached = Vec::new();

    for mut nic in network.list_network_interfaces(rg).await? {
        if clear_reference(&mut nic, "networkSecurityGroup", &resource.id) {
            let name = object_name(&nic).to_string();
            network.update_network_interface(rg, &name, &nic).await?;
            detached.push(format!("NIC: {}", name));
        }
    }

    if let Some(vnet) = id_segment_after(&resource.id, "virtualNetworks") {
        for mut subnet in network.list_subnets(rg, vnet).await? {
            if clear_reference(&mut subnet, "networkSecurityGroup", &resource.id) {
                let name = object_name(&subnet).to_string();
                network.update_subnet(rg, vnet, &name, &subnet).await?;
                detached.push(format!("Subnet: {}", name));
            }
        }
    }

    if detached.is_empty() {
        Ok("No associations found".to_string())
    } else {
        Ok(format!("Disassociated from {}", detached.join(", ")))
    }
}

async fn clear_subnet(network: &dyn NetworkOps, resource: &ResourceRecord) -> Result<String> {
    let segments: Vec<&str> = resource.id.split('/').collect();
    let Some(vnet_name) = segment_after(&segments, "virtualNetworks") else {
        bail!("Invalid resource ID format for subnet");
    };
    let rg = resource_group(resource)?;

    let mut deleted_nics = Vec::new();
    for nic in network.list_network_interfaces(rg).await? {
        if nic_uses_subnet(&nic, &resource.id) {
            let name = object_name(&nic).to_string();
            tracing::info!("Deleting NIC {} in subnet {}", name, resource.name);
            network.delete_network_interface(rg, &name).await?;
            deleted_nics.push(name);
        }
    }

    let mut vnet = network.get_virtual_network(rg, vnet_name).await?;
    if let Some(subnets) = vnet
        .pointer_mut("/properties/subnets")
        .and_then(Value::as_array_mut)
    {
        subnets.retain(|s| s.get("name").and_then(Value::as_str) != Some(resource.name.as_str()));
    }
    network.update_virtual_network(rg, vnet_name, &vnet).await?;

    let mut detail = format!("Removed from VNet {}", vnet_name);
    if !deleted_nics.is_empty() {
        detail.push_str(&format!(", deleted NICs: {}", deleted_nics.join(", ")));
    }
    Ok(detail)
}

/// Only NICs whose own ID sits under a VM path are considered attached
async fn detach_nic(compute: &dyn ComputeOps, resource: &ResourceRecord) -> Result<String> {
    let Some(vm_name) = id_segment_after(&resource.id, "virtualMachines") else {
        bail!("Not attached to a VM");
    };
    let rg = resource_group(resource)?;

    let mut vm = compute.get_virtual_machine(rg, vm_name).await?;
    if let Some(nics) = vm
        .pointer_mut("/properties/networkProfile/networkInterfaces")
        .and_then(Value::as_array_mut)
    {
        nics.retain(|nic| !nic.get("id").and_then(Value::as_str).is_some_and(|id| same_id(id, &resource.id)));
    }
    compute.update_virtual_machine(rg, vm_name, &vm).await?;

    Ok(format!("Detached from VM {}", vm_name))
}

fn resource_group(resource: &ResourceRecord) -> Result<&str> {
    resource
        .resource_group
        .as_deref()
        .or_else(|| id_segment_after(&resource.id, "resourceGroups"))
        .ok_or_else(|| anyhow!("Resource group not found in resource ID"))
}

fn same_id(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// `properties.<key>.id` of an ARM object
fn reference_id<'v>(object: &'v Value, key: &str) -> Option<&'v str> {
    object
        .get("properties")?
        .get(key)?
        .get("id")?
        .as_str()
}

/// Drop `properties.<key>` when it points at `target`. Returns whether it did.
fn clear_reference(object: &mut Value, key: &str, target: &str) -> bool {
    if !reference_id(object, key).is_some_and(|id| same_id(id, target)) {
        return false;
    }
    object
        .get_mut("properties")
        .and_then(Value::as_object_mut)
        .and_then(|props| props.remove(key))
        .is_some()
}

fn object_name(object: &Value) -> &str {
    object
        .get("name")
        .and_then(Value::as_str)
        .or_else(|| object.get("id").and_then(Value::as_str).map(id_tail))
        .unwrap_or_default()
}

fn nic_uses_subnet(nic: &Value, subnet_id: &str) -> bool {
    nic.pointer("/properties/ipConfigurations")
        .and_then(Value::as_array)
        .is_some_and(|configs| {
            configs
                .iter()
                .any(|c| reference_id(c, "subnet").is_some_and(|id| same_id(id, subnet_id)))
        })
}
