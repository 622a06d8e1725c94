//! Resource data model
//!
//! Normalized representation of discovered Azure resources and the
//! subscriptions (accounts) that own them.

use super::id::{id_segment_after, id_tail};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Subscription a resource belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub subscription_id: String,
    pub display_name: String,
    pub state: String,
}

impl From<&Value> for Account {
    fn from(value: &Value) -> Self {
        Self {
            subscription_id: value
                .get("subscriptionId")
                .and_then(|v| v.as_str())
                .unwrap_or("-")
                .to_string(),
            display_name: value
                .get("displayName")
                .and_then(|v| v.as_str())
                .unwrap_or("-")
                .to_string(),
            state: value
                .get("state")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown")
                .to_string(),
        }
    }
}

/// One discovered cloud resource. Read-only inside the deletion engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub account_id: String,
    pub account_name: String,
    #[serde(default)]
    pub resource_group: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl ResourceRecord {
    /// Build a record from an ID and type, deriving name and resource group
    /// from the ID path.
    pub fn new(id: impl Into<String>, resource_type: impl Into<String>, account: &Account) -> Self {
        let id = id.into();
        Self {
            name: id_tail(&id).to_string(),
            resource_group: id_segment_after(&id, "resourceGroups").map(str::to_string),
            resource_type: resource_type.into(),
            account_id: account.subscription_id.clone(),
            account_name: account.display_name.clone(),
            location: None,
            tags: BTreeMap::new(),
            id,
        }
    }

    /// Normalize a raw ARM resource object listed under `account`.
    /// Returns `None` when the object carries no `id`.
    pub fn from_arm(value: &Value, account: &Account) -> Option<Self> {
        let id = value.get("id").and_then(|v| v.as_str())?;
        let resource_type = value.get("type").and_then(|v| v.as_str()).unwrap_or_default();
        let mut record = Self::new(id, resource_type, account);

        if let Some(name) = value.get("name").and_then(|v| v.as_str()).filter(|n| !n.is_empty()) {
            record.name = name.to_string();
        }
        record.location = value
            .get("location")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        if let Some(tags) = value.get("tags").and_then(|v| v.as_object()) {
            record.tags = tags
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect();
        }

        Some(record)
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }

    /// Name shown to the user next to failures
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            id_tail(&self.id)
        } else {
            &self.name
        }
    }
}
