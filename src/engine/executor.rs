//! Generic resource deletion

use super::DeletionSettings;
use crate::azure::ops::ClientFactory;
use crate::resource::id::ParsedResourceId;
use crate::resource::registry::api_version_for;
use crate::resource::ResourceRecord;
use anyhow::{Context, Result};

/// Delete one resource by its coordinates and wait for the provider to
/// finish. The error string is what ends up in the batch's failure list.
pub async fn delete_one<F: ClientFactory + ?Sized>(
    factory: &F,
    resource: &ResourceRecord,
    settings: &DeletionSettings,
) -> Result<(), String> {
    let api_version = api_version_for(&resource.resource_type);

    if settings.dry_run {
        tokio::time::sleep(settings.simulated_delay).await;
        tracing::info!(
            "[dry-run] Would delete {} ({}, api-version {})",
            resource.display_name(),
            resource.resource_type,
            api_version
        );
        return Ok(());
    }

    match execute(factory, resource, api_version).await {
        Ok(()) => {
            tracing::info!("Deleted {}", resource.id);
            Ok(())
        }
        Err(e) => {
            let message = format!("{:#}", e);
            tracing::error!("Failed to delete {}: {}", resource.id, message);
            Err(message)
        }
    }
}

async fn execute<F: ClientFactory + ?Sized>(
    factory: &F,
    resource: &ResourceRecord,
    api_version: &str,
) -> Result<()> {
    let id = ParsedResourceId::parse(&resource.id)?;
    let client = factory
        .resource_client(&resource.account_id)
        .context("Failed to create resource client")?;
    client.delete_by_id(&id, api_version).await
}
