//! aznuke: dependency-aware cleanup of Azure resources
//!
//! Discovers resources across subscriptions, filters them against exclusion
//! rules and deletes what is left in an order that respects dependencies
//! between resources (a NIC is released before the VM that holds it goes,
//! a subnet is emptied before its network is removed).

pub mod azure;
pub mod config;
pub mod engine;
pub mod report;
pub mod resource;
pub mod safety;

#[cfg(test)]
mod testing;

/// Version injected at compile time via AZNUKE_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("AZNUKE_VERSION") {
    Some(v) => v,
    None => "dev",
};
