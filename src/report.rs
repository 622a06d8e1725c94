//! Console and JSON output for `scan` and `delete`

use crate::engine::BatchResult;
use crate::resource::ResourceRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::{self, Write};

/// Resources listed per type before the summary collapses the rest
pub const SUMMARY_LIMIT: usize = 10;

/// JSON document printed by `scan --output json`
#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub scan_results: ScanResults,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ScanResults {
    pub total_resources: usize,
    pub resources_identified: usize,
    pub resources_excluded: usize,
    pub resources: Vec<ScanEntry>,
}

#[derive(Debug, Serialize)]
pub struct ScanEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub subscription_id: String,
    pub resource_group: Option<String>,
}

impl ScanReport {
    pub fn new(total: usize, selected: &[ResourceRecord], excluded: usize) -> Self {
        Self {
            scan_results: ScanResults {
                total_resources: total,
                resources_identified: selected.len(),
                resources_excluded: excluded,
                resources: selected
                    .iter()
                    .map(|r| ScanEntry {
                        name: r.name.clone(),
                        resource_type: r.resource_type.clone(),
                        subscription_id: r.account_id.clone(),
                        resource_group: r.resource_group.clone(),
                    })
                    .collect(),
            },
            generated_at: Utc::now(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Resources grouped by type, types in first-seen order
pub fn group_by_type(resources: &[ResourceRecord]) -> Vec<(&str, Vec<&ResourceRecord>)> {
    let mut groups: Vec<(&str, Vec<&ResourceRecord>)> = Vec::new();
    for resource in resources {
        match groups
            .iter_mut()
            .find(|(t, _)| *t == resource.resource_type)
        {
            Some((_, members)) => members.push(resource),
            None => groups.push((resource.resource_type.as_str(), vec![resource])),
        }
    }
    groups
}

/// Per-type listing, at most [`SUMMARY_LIMIT`] names per type
pub fn write_summary_by_type<W: Write>(out: &mut W, resources: &[ResourceRecord]) -> io::Result<()> {
    for (resource_type, members) in group_by_type(resources) {
        writeln!(out, "\n{} ({}):", resource_type, members.len())?;
        for resource in members.iter().take(SUMMARY_LIMIT) {
            writeln!(
                out,
                "  - {} (Subscription: {})",
                resource.display_name(),
                resource.account_name
            )?;
        }
        if members.len() > SUMMARY_LIMIT {
            writeln!(out, "  ... and {} more", members.len() - SUMMARY_LIMIT)?;
        }
    }
    Ok(())
}

/// Text form of a scan
pub fn write_scan_text<W: Write>(
    out: &mut W,
    total: usize,
    selected: &[ResourceRecord],
    excluded: usize,
) -> io::Result<()> {
    writeln!(out, "Found {} total resources", total)?;
    writeln!(out, "[SELECTED] {} resources identified", selected.len())?;
    writeln!(out, "[EXCLUDED] {} resources excluded", excluded)?;
    if !selected.is_empty() {
        writeln!(out, "\nResources Selected:")?;
        write_summary_by_type(out, selected)?;
    }
    Ok(())
}

/// Final summary of a deletion batch
pub fn write_completion<W: Write>(out: &mut W, result: &BatchResult, dry_run: bool) -> io::Result<()> {
    let verb = if dry_run { "would be deleted" } else { "deleted" };
    if result.is_clean() {
        writeln!(out, "\n[COMPLETE] {} resources {}", result.deleted.len(), verb)?;
    } else {
        writeln!(
            out,
            "\n[PARTIAL] {} resources {}, {} failed",
            result.deleted.len(),
            verb,
            result.failed.len()
        )?;
        writeln!(out, "\n[DETAILS] Resources that failed to process:")?;
        for (resource, reason) in &result.failed {
            writeln!(out, "  - {}: {}", resource.display_name(), reason)?;
        }
    }
    Ok(())
}
