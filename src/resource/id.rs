//! Resource ID parsing
//!
//! ARM resource IDs are hierarchical paths of the form
//! `/subscriptions/{sub}/resourceGroups/{rg}/providers/{namespace}/{type...}/{name}`.
//! Everything that needs to re-derive a relationship from an ID goes through
//! [`ParsedResourceId`] instead of slicing strings at the call site.

use thiserror::Error;

/// Minimum number of `/`-separated segments (the leading empty one included)
/// a deletable resource ID must have.
pub const MIN_ID_SEGMENTS: usize = 9;

/// Why a resource ID could not be decomposed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceIdError {
    #[error("resource ID has {found} path segments, at least {MIN_ID_SEGMENTS} are required")]
    TooShort { found: usize },
    #[error("resource ID is missing the '{0}' segment")]
    MissingAnchor(&'static str),
    #[error("resource ID has no type path after provider '{0}'")]
    MissingTypePath(String),
}

/// Structured view of an ARM resource ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResourceId {
    pub subscription: Option<String>,
    pub resource_group: String,
    pub provider: String,
    /// Segments between the provider namespace and the name,
    /// e.g. `virtualNetworks/vnet1/subnets` for a subnet
    pub type_path: String,
    pub name: String,
}

impl ParsedResourceId {
    pub fn parse(id: &str) -> Result<Self, ResourceIdError> {
        let segments: Vec<&str> = id.split('/').collect();
        if segments.len() < MIN_ID_SEGMENTS {
            return Err(ResourceIdError::TooShort {
                found: segments.len(),
            });
        }

        let resource_group = segment_after(&segments, "resourceGroups")
            .ok_or(ResourceIdError::MissingAnchor("resourceGroups"))?;
        let provider_idx = anchor_index(&segments, "providers")
            .filter(|idx| idx + 1 < segments.len())
            .ok_or(ResourceIdError::MissingAnchor("providers"))?;
        let provider = segments[provider_idx + 1];

        let name_idx = segments.len() - 1;
        if name_idx <= provider_idx + 2 || segments[name_idx].is_empty() {
            return Err(ResourceIdError::MissingTypePath(provider.to_string()));
        }

        Ok(Self {
            subscription: segment_after(&segments, "subscriptions").map(str::to_string),
            resource_group: resource_group.to_string(),
            provider: provider.to_string(),
            type_path: segments[provider_idx + 2..name_idx].join("/"),
            name: segments[name_idx].to_string(),
        })
    }

    /// Rebuild the canonical ARM path, falling back to `default_subscription`
    /// when the ID itself carried none.
    pub fn to_path(&self, default_subscription: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/{}/{}/{}",
            self.subscription.as_deref().unwrap_or(default_subscription),
            self.resource_group,
            self.provider,
            self.type_path,
            self.name
        )
    }
}

/// Value of the segment that follows `anchor`, if any.
/// Anchors are matched case-insensitively as ARM does not normalize them.
pub fn segment_after<'a>(segments: &[&'a str], anchor: &str) -> Option<&'a str> {
    let idx = anchor_index(segments, anchor)?;
    segments
        .get(idx + 1)
        .copied()
        .filter(|s| !s.is_empty())
}

/// Convenience wrapper over [`segment_after`] for a raw ID string
pub fn id_segment_after<'a>(id: &'a str, anchor: &str) -> Option<&'a str> {
    let segments: Vec<&'a str> = id.split('/').collect();
    segment_after(&segments, anchor)
}

/// Last path segment of an ID, used when a record has no display name
pub fn id_tail(id: &str) -> &str {
    id.trim_end_matches('/').rsplit('/').next().unwrap_or(id)
}

fn anchor_index(segments: &[&str], anchor: &str) -> Option<usize> {
    segments.iter().position(|s| s.eq_ignore_ascii_case(anchor))
}

#[cfg(test)]
mod tests {
    use super::*;

    const VM_ID: &str = "/subscriptions/sub-1/resourceGroups/rg1/providers/Microsoft.Compute/virtualMachines/vm1";

    #[test]
    fn test_parse_full_id() {
        let parsed = ParsedResourceId::parse(VM_ID).unwrap();
        assert_eq!(parsed.subscription.as_deref(), Some("sub-1"));
        assert_eq!(parsed.resource_group, "rg1");
        assert_eq!(parsed.provider, "Microsoft.Compute");
        assert_eq!(parsed.type_path, "virtualMachines");
        assert_eq!(parsed.name, "vm1");
        assert_eq!(parsed.to_path("other"), VM_ID);
    }

    #[test]
    fn test_parse_nested_type_path() {
        let id = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet1/subnets/default";
        let parsed = ParsedResourceId::parse(id).unwrap();
        assert_eq!(parsed.type_path, "virtualNetworks/vnet1/subnets");
        assert_eq!(parsed.name, "default");
    }

    #[test]
    fn test_short_id_rejected() {
        let err = ParsedResourceId::parse("/providers/Microsoft.Resources/resourceGroups/rg1").unwrap_err();
        assert_eq!(err, ResourceIdError::TooShort { found: 5 });
    }

    #[test]
    fn test_missing_anchor_rejected() {
        let err = ParsedResourceId::parse("/a/b/c/d/providers/Microsoft.Compute/virtualMachines/vm1")
            .unwrap_err();
        assert_eq!(err, ResourceIdError::MissingAnchor("resourceGroups"));

        let err = ParsedResourceId::parse("/subscriptions/s/resourceGroups/rg/x/Microsoft.Compute/virtualMachines/vm1")
            .unwrap_err();
        assert_eq!(err, ResourceIdError::MissingAnchor("providers"));
    }

    #[test]
    fn test_missing_type_path_rejected() {
        let err = ParsedResourceId::parse("/subscriptions/s/x/y/resourceGroups/rg/providers/Microsoft.Compute/vm1")
            .unwrap_err();
        assert!(matches!(err, ResourceIdError::MissingTypePath(_)));
    }

    #[test]
    fn test_anchor_case_insensitive() {
        let id = "/subscriptions/s/resourcegroups/RG1/providers/Microsoft.Compute/disks/d1";
        assert_eq!(ParsedResourceId::parse(id).unwrap().resource_group, "RG1");
    }

    #[test]
    fn test_id_helpers() {
        assert_eq!(id_tail(VM_ID), "vm1");
        assert_eq!(id_tail("plain"), "plain");
        assert_eq!(id_segment_after(VM_ID, "virtualMachines"), Some("vm1"));
        assert_eq!(id_segment_after(VM_ID, "networkInterfaces"), None);
    }
}
