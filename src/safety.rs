//! Safety Checks
//!
//! Protected subscriptions and the interactive confirmation that stands
//! between a scan and a live delete.

use crate::report::write_summary_by_type;
use crate::resource::{Account, ResourceRecord};
use anyhow::Result;
use std::io::{BufRead, Write};

/// Word the user has to type (in any case) to start a live delete
pub const CONFIRMATION_WORD: &str = "DELETE";

pub fn is_protected_subscription(subscription_id: &str, protected: &[String]) -> bool {
    protected
        .iter()
        .any(|p| p.eq_ignore_ascii_case(subscription_id))
}

/// Drop protected subscriptions before anything is discovered in them
pub fn remove_protected(accounts: Vec<Account>, protected: &[String]) -> Vec<Account> {
    accounts
        .into_iter()
        .filter(|a| {
            let keep = !is_protected_subscription(&a.subscription_id, protected);
            if !keep {
                tracing::info!("Skipping protected subscription {}", a.display_name);
            }
            keep
        })
        .collect()
}

/// Show what is about to be deleted and ask for confirmation.
///
/// Returns `true` when the batch may run. A dry run never prompts.
pub fn confirm_deletion<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    resources: &[ResourceRecord],
    dry_run: bool,
) -> Result<bool> {
    if resources.is_empty() {
        writeln!(output, "No resources to delete.")?;
        return Ok(false);
    }

    writeln!(output, "\nFound {} resources to delete:", resources.len())?;
    write_summary_by_type(output, resources)?;

    if dry_run {
        writeln!(output, "\nDRY RUN MODE: No resources will be deleted.")?;
        return Ok(true);
    }

    write!(output, "Type '{}' to confirm deletion: ", CONFIRMATION_WORD)?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;

    if answer.trim().eq_ignore_ascii_case(CONFIRMATION_WORD) {
        writeln!(output, "Proceeding with the deletion process...")?;
        Ok(true)
    } else {
        writeln!(output, "Deletion process aborted.")?;
        Ok(false)
    }
}
