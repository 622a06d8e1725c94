//! Resource Discovery
//!
//! Lists resources per subscription from ARM (with pagination and an
//! optional resource-type filter) and normalizes them into records.

use super::model::{Account, ResourceRecord};
use crate::azure::ops::AzureClientFactory;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};

/// Number of subscriptions listed concurrently
const MAX_CONCURRENT_LISTINGS: usize = 4;

/// Source of resource records for one account
#[async_trait]
pub trait ResourceLister: Send + Sync {
    async fn list_resources(
        &self,
        account: &Account,
        type_filter: Option<&[String]>,
    ) -> Result<Vec<ResourceRecord>>;
}

#[async_trait]
impl ResourceLister for AzureClientFactory {
    async fn list_resources(
        &self,
        account: &Account,
        type_filter: Option<&[String]>,
    ) -> Result<Vec<ResourceRecord>> {
        let client = self.client(&account.subscription_id);

        let urls = match type_filter {
            Some(types) if !types.is_empty() => types
                .iter()
                .map(|t| client.resources_url(Some(t)))
                .collect::<Result<Vec<_>>>()?,
            _ => vec![client.resources_url(None)?],
        };

        let mut records = Vec::new();
        for url in urls {
            let items = client.get_all_pages(&url).await.with_context(|| {
                format!("Failed to list resources in {}", account.display_name)
            })?;
            records.extend(
                items
                    .iter()
                    .filter_map(|item| ResourceRecord::from_arm(item, account)),
            );
        }

        tracing::info!(
            "Discovered {} resources in subscription {}",
            records.len(),
            account.display_name
        );
        Ok(records)
    }
}

/// Discover resources across every account, keeping account order
pub async fn discover_all<L: ResourceLister + ?Sized>(
    lister: &L,
    accounts: &[Account],
    type_filter: Option<&[String]>,
) -> Result<Vec<ResourceRecord>> {
    let per_account: Vec<Vec<ResourceRecord>> = stream::iter(accounts)
        .map(|account| lister.list_resources(account, type_filter))
        .buffered(MAX_CONCURRENT_LISTINGS)
        .try_collect()
        .await?;

    Ok(per_account.into_iter().flatten().collect())
}

/// Parse a comma-separated `--checks` value into resource types
pub fn parse_resource_types(checks: Option<&str>) -> Option<Vec<String>> {
    let types: Vec<String> = checks?
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    (!types.is_empty()).then_some(types)
}

/// Keep resources located in `region` (case- and space-insensitive)
pub fn filter_by_region(resources: Vec<ResourceRecord>, region: &str) -> Vec<ResourceRecord> {
    let wanted = normalize_region(region);
    resources
        .into_iter()
        .filter(|r| r.location.as_deref().is_some_and(|l| normalize_region(l) == wanted))
        .collect()
}

fn normalize_region(region: &str) -> String {
    region
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapLister(HashMap<String, Vec<ResourceRecord>>);

    #[async_trait]
    impl ResourceLister for MapLister {
        async fn list_resources(
            &self,
            account: &Account,
            type_filter: Option<&[String]>,
        ) -> Result<Vec<ResourceRecord>> {
            let all = self.0.get(&account.subscription_id).cloned().unwrap_or_default();
            Ok(match type_filter {
                Some(types) => all
                    .into_iter()
                    .filter(|r| types.contains(&r.resource_type))
                    .collect(),
                None => all,
            })
        }
    }

    fn account(id: &str) -> Account {
        Account {
            subscription_id: id.to_string(),
            display_name: format!("Sub {}", id),
            state: "Enabled".to_string(),
        }
    }

    #[tokio::test]
    async fn test_discover_all_preserves_account_order() {
        let a = account("a");
        let b = account("b");
        let mut map = HashMap::new();
        map.insert("a".to_string(), vec![ResourceRecord::new("/a/1", "T1", &a)]);
        map.insert(
            "b".to_string(),
            vec![
                ResourceRecord::new("/b/1", "T1", &b),
                ResourceRecord::new("/b/2", "T2", &b),
            ],
        );
        let lister = MapLister(map);

        let all = discover_all(&lister, &[a.clone(), b.clone()], None).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["/a/1", "/b/1", "/b/2"]);

        let filter = vec!["T2".to_string()];
        let some = discover_all(&lister, &[a, b], Some(&filter)).await.unwrap();
        assert_eq!(some.len(), 1);
        assert_eq!(some[0].account_name, "Sub b");
    }

    #[test]
    fn test_parse_resource_types() {
        assert_eq!(parse_resource_types(None), None);
        assert_eq!(parse_resource_types(Some(" , ")), None);
        assert_eq!(
            parse_resource_types(Some("Microsoft.Compute/disks, Microsoft.Storage/storageAccounts")),
            Some(vec![
                "Microsoft.Compute/disks".to_string(),
                "Microsoft.Storage/storageAccounts".to_string()
            ])
        );
    }

    #[test]
    fn test_filter_by_region() {
        let acc = account("a");
        let mut west = ResourceRecord::new("/a/1", "T", &acc);
        west.location = Some("westeurope".to_string());
        let mut east = ResourceRecord::new("/a/2", "T", &acc);
        east.location = Some("eastus".to_string());
        let nowhere = ResourceRecord::new("/a/3", "T", &acc);

        let kept = filter_by_region(vec![west, east, nowhere], "West Europe");
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "/a/1");
    }
}
