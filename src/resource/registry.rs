//! Resource Type Registry
//!
//! Static per-type metadata: conventional deletion rank, ARM API version,
//! and whether the type needs a detach step before deletion.

use std::collections::HashMap;
use std::sync::OnceLock;

pub const PUBLIC_IP: &str = "Microsoft.Network/publicIPAddresses";
pub const NETWORK_INTERFACE: &str = "Microsoft.Network/networkInterfaces";
pub const VIRTUAL_NETWORK: &str = "Microsoft.Network/virtualNetworks";
pub const SUBNET: &str = "Microsoft.Network/virtualNetworks/subnets";
pub const NETWORK_SECURITY_GROUP: &str = "Microsoft.Network/networkSecurityGroups";
pub const NETWORK_WATCHER: &str = "Microsoft.Network/networkWatchers";
pub const VIRTUAL_MACHINE: &str = "Microsoft.Compute/virtualMachines";
pub const DISK: &str = "Microsoft.Compute/disks";
pub const STORAGE_ACCOUNT: &str = "Microsoft.Storage/storageAccounts";
pub const RESOURCE_GROUP: &str = "Microsoft.Resources/resourceGroups";

/// API version used for types missing from the table
pub const DEFAULT_API_VERSION: &str = "2023-07-01";

/// Detach routine to run before the generic delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preprocess {
    DisassociatePublicIp,
    DisassociateNsg,
    ClearSubnet,
    DetachNic,
    DetachDisk,
}

/// Static metadata for one resource type
#[derive(Debug, Clone)]
pub struct TypeDef {
    pub resource_type: &'static str,
    /// Lower ranks delete first; `None` means the type takes no part in
    /// priority ordering
    pub priority: Option<u8>,
    pub api_version: &'static str,
    pub preprocess: Option<Preprocess>,
}

static TYPE_DEFS: &[TypeDef] = &[
    TypeDef {
        resource_type: SUBNET,
        priority: Some(0),
        api_version: DEFAULT_API_VERSION,
        preprocess: Some(Preprocess::ClearSubnet),
    },
    TypeDef {
        resource_type: PUBLIC_IP,
        priority: Some(1),
        api_version: "2023-05-01",
        preprocess: Some(Preprocess::DisassociatePublicIp),
    },
    TypeDef {
        resource_type: NETWORK_INTERFACE,
        priority: Some(2),
        api_version: "2023-05-01",
        preprocess: Some(Preprocess::DetachNic),
    },
    TypeDef {
        resource_type: VIRTUAL_MACHINE,
        priority: Some(3),
        api_version: "2023-07-01",
        preprocess: None,
    },
    TypeDef {
        resource_type: VIRTUAL_NETWORK,
        priority: Some(4),
        api_version: "2023-05-01",
        preprocess: None,
    },
    TypeDef {
        resource_type: NETWORK_SECURITY_GROUP,
        priority: Some(5),
        api_version: "2023-05-01",
        preprocess: Some(Preprocess::DisassociateNsg),
    },
    TypeDef {
        resource_type: STORAGE_ACCOUNT,
        priority: Some(6),
        api_version: DEFAULT_API_VERSION,
        preprocess: None,
    },
    TypeDef {
        resource_type: DISK,
        priority: Some(7),
        api_version: "2023-04-02",
        preprocess: Some(Preprocess::DetachDisk),
    },
    TypeDef {
        resource_type: RESOURCE_GROUP,
        priority: Some(8),
        api_version: DEFAULT_API_VERSION,
        preprocess: None,
    },
    TypeDef {
        resource_type: NETWORK_WATCHER,
        priority: None,
        api_version: "2023-05-01",
        preprocess: None,
    },
];

/// Global registry keyed by lowercased type tag
static REGISTRY: OnceLock<HashMap<String, &'static TypeDef>> = OnceLock::new();

/// Get the type registry (built on first access)
pub fn get_registry() -> &'static HashMap<String, &'static TypeDef> {
    REGISTRY.get_or_init(|| {
        TYPE_DEFS
            .iter()
            .map(|def| (def.resource_type.to_ascii_lowercase(), def))
            .collect()
    })
}

/// Look up a type definition; tags compare case-insensitively
pub fn get_type(resource_type: &str) -> Option<&'static TypeDef> {
    get_registry()
        .get(&resource_type.to_ascii_lowercase())
        .copied()
}

/// Rank of a type if it takes part in priority ordering
pub fn known_priority(resource_type: &str) -> Option<u8> {
    get_type(resource_type).and_then(|def| def.priority)
}

pub fn api_version_for(resource_type: &str) -> &'static str {
    get_type(resource_type)
        .map(|def| def.api_version)
        .unwrap_or(DEFAULT_API_VERSION)
}

pub fn preprocess_for(resource_type: &str) -> Option<Preprocess> {
    get_type(resource_type).and_then(|def| def.preprocess)
}
