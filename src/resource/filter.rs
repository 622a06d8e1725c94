//! Exclusion Rules
//!
//! Loads exclusion rules from YAML and partitions discovered resources into
//! the set to delete and the set to preserve.

use super::model::ResourceRecord;
use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default exclusions file name, looked up next to the user config
pub const DEFAULT_EXCLUSIONS_FILE: &str = "exclusions.yaml";

/// Exclusion rules as written in the YAML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExclusionRules {
    #[serde(default)]
    pub resource_types: Vec<String>,
    /// Regular expressions matched at the start of the resource name
    #[serde(default)]
    pub name_patterns: Vec<String>,
    #[serde(default)]
    pub resource_ids: Vec<String>,
    /// Every listed tag whose key and value both match preserves the resource
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl ExclusionRules {
    /// Parse rules from YAML text. An empty document yields no rules.
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let rules: Option<Self> =
            serde_yaml::from_str(content).context("Failed to parse exclusion rules")?;
        Ok(rules.unwrap_or_default())
    }

    /// Validate name patterns and build the matcher
    pub fn compile(&self) -> Result<ExclusionFilter<'_>> {
        let name_patterns = self
            .name_patterns
            .iter()
            .map(|p| {
                Regex::new(&format!("^(?:{})", p))
                    .with_context(|| format!("Invalid name pattern '{}'", p))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ExclusionFilter {
            rules: self,
            name_patterns,
        })
    }
}

/// Compiled form of [`ExclusionRules`]
pub struct ExclusionFilter<'a> {
    rules: &'a ExclusionRules,
    name_patterns: Vec<Regex>,
}

impl ExclusionFilter<'_> {
    /// Whether a resource matches any exclusion rule
    pub fn should_preserve(&self, resource: &ResourceRecord) -> bool {
        if self.rules.resource_types.contains(&resource.resource_type) {
            return true;
        }
        if self.name_patterns.iter().any(|re| re.is_match(&resource.name)) {
            return true;
        }
        if self.rules.resource_ids.contains(&resource.id) {
            return true;
        }
        self.rules
            .tags
            .iter()
            .any(|(key, value)| resource.tags.get(key) == Some(value))
    }

    /// Split resources into `(to_delete, to_preserve)`, keeping input order
    pub fn partition(
        &self,
        resources: Vec<ResourceRecord>,
    ) -> (Vec<ResourceRecord>, Vec<ResourceRecord>) {
        let (to_preserve, to_delete): (Vec<_>, Vec<_>) = resources
            .into_iter()
            .partition(|r| self.should_preserve(r));
        (to_delete, to_preserve)
    }
}

/// Partition resources with freshly compiled rules
pub fn partition(
    resources: Vec<ResourceRecord>,
    rules: &ExclusionRules,
) -> Result<(Vec<ResourceRecord>, Vec<ResourceRecord>)> {
    Ok(rules.compile()?.partition(resources))
}

/// Locate the exclusions file: the given path, then relative to the working
/// directory, then inside the aznuke config directory
pub fn find_config_file(config_path: &Path) -> Option<PathBuf> {
    if config_path.exists() {
        return Some(config_path.to_path_buf());
    }

    if let Ok(cwd) = std::env::current_dir() {
        let candidate = cwd.join(config_path);
        if candidate.exists() {
            return Some(candidate);
        }
    }

    let config_dir = dirs::config_dir()?.join("aznuke");
    let file_name = config_path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_EXCLUSIONS_FILE));
    [config_dir.join(file_name), config_dir.join(DEFAULT_EXCLUSIONS_FILE)]
        .into_iter()
        .find(|p| p.exists())
}

/// Load exclusion rules. A missing file is not an error: no exclusions apply.
pub fn load_exclusions(config_path: &Path) -> Result<ExclusionRules> {
    let Some(path) = find_config_file(config_path) else {
        tracing::warn!(
            "Could not find exclusions file at {:?}, no exclusions will be applied",
            config_path
        );
        return Ok(ExclusionRules::default());
    };

    tracing::info!("Loading exclusions from {:?}", path);
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read exclusions file {:?}", path))?;
    let rules = ExclusionRules::from_yaml(&content)?;
    // Reject invalid name patterns on load
    rules.compile()?;
    Ok(rules)
}
