//! Batch orchestration
//!
//! Runs a whole candidate list: group by account, order each group, then
//! pre-process and delete one resource at a time, recording every outcome.

use super::executor::delete_one;
use super::graph::build_graph;
use super::preprocess::preprocess;
use super::progress::ProgressSink;
use super::sequence::sequence;
use super::DeletionSettings;
use crate::azure::ops::ClientFactory;
use crate::resource::registry::preprocess_for;
use crate::resource::ResourceRecord;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use thiserror::Error;
use tracing::Instrument;

/// Group key for records that carry no account id
pub const UNKNOWN_ACCOUNT: &str = "unknown";

/// What happened to each candidate of a batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    /// Deleted resources, in processing order
    pub deleted: Vec<ResourceRecord>,
    /// Failed resources with the reason
    pub failed: Vec<(ResourceRecord, String)>,
}

impl BatchResult {
    pub fn processed(&self) -> usize {
        self.deleted.len() + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// The batch was cut short; `partial` holds what had already been recorded
#[derive(Debug, Error)]
#[error(
    "deletion interrupted after {} deleted and {} failed",
    partial.deleted.len(),
    partial.failed.len()
)]
pub struct BatchInterrupted {
    pub partial: BatchResult,
}

/// Deletion engine over a [`ClientFactory`]. The factory carries the
/// credentials; the engine only asks it for clients.
pub struct DeletionEngine<F> {
    factory: F,
    settings: DeletionSettings,
}

impl<F: ClientFactory> DeletionEngine<F> {
    pub fn new(factory: F, settings: DeletionSettings) -> Self {
        Self { factory, settings }
    }

    /// Delete every candidate. Never fails as a whole: per-resource problems
    /// land in [`BatchResult::failed`].
    pub async fn delete_all(
        &self,
        candidates: &[ResourceRecord],
        progress: &dyn ProgressSink,
    ) -> BatchResult {
        let mut result = BatchResult::default();
        self.run(candidates, progress, &mut result).await;
        result
    }

    /// Like [`delete_all`](Self::delete_all), but stops at the next
    /// suspension point once `interrupt` completes. Nothing is rolled back.
    pub async fn delete_all_until<I>(
        &self,
        candidates: &[ResourceRecord],
        progress: &dyn ProgressSink,
        interrupt: I,
    ) -> Result<BatchResult, BatchInterrupted>
    where
        I: Future<Output = ()>,
    {
        let mut result = BatchResult::default();
        let completed = tokio::select! {
            _ = self.run(candidates, progress, &mut result) => true,
            _ = interrupt => false,
        };

        if completed {
            Ok(result)
        } else {
            tracing::warn!(
                "Deletion interrupted after {} of {} resources",
                result.processed(),
                candidates.len()
            );
            Err(BatchInterrupted { partial: result })
        }
    }

    async fn run(
        &self,
        candidates: &[ResourceRecord],
        progress: &dyn ProgressSink,
        result: &mut BatchResult,
    ) {
        if candidates.is_empty() {
            return;
        }

        let run_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("batch", %run_id, dry_run = self.settings.dry_run);
        async {
            tracing::info!("Processing {} resources", candidates.len());
            progress.start(candidates.len());

            for (account, group) in group_by_account(candidates) {
                let graph = build_graph(&group);
                let ordered = sequence(&group, &graph);
                tracing::info!("Account {}: {} resources", account, ordered.len());

                for resource in ordered {
                    let outcome = AssertUnwindSafe(self.process(resource))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|panic| Err(panic_reason(resource, panic)));
                    match outcome {
                        Ok(()) => result.deleted.push(resource.clone()),
                        Err(reason) => result.failed.push((resource.clone(), reason)),
                    }
                    progress.advance(1);
                }
            }

            progress.finish();
            tracing::info!(
                "Batch done: {} deleted, {} failed",
                result.deleted.len(),
                result.failed.len()
            );
        }
        .instrument(span)
        .await
    }

    async fn process(&self, resource: &ResourceRecord) -> Result<(), String> {
        if preprocess_for(&resource.resource_type).is_some() {
            let report = preprocess(&self.factory, resource, &self.settings).await;
            if report.ok {
                tracing::debug!("Pre-processed {}: {}", resource.display_name(), report.detail);
            } else {
                tracing::warn!(
                    "Pre-processing {} failed, deleting anyway: {}",
                    resource.display_name(),
                    report.detail
                );
            }
        }

        delete_one(&self.factory, resource, &self.settings).await
    }
}

/// Failure reason for a resource whose processing panicked
fn panic_reason(resource: &ResourceRecord, panic: Box<dyn Any + Send>) -> String {
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    tracing::error!("Processing {} panicked: {}", resource.id, message);
    format!("Processing panicked: {}", message)
}

/// Split candidates by account id, keeping first-seen order for both the
/// accounts and the resources inside each account
fn group_by_account(candidates: &[ResourceRecord]) -> Vec<(&str, Vec<&ResourceRecord>)> {
    let mut groups: Vec<(&str, Vec<&ResourceRecord>)> = Vec::new();
    for resource in candidates {
        let key = if resource.account_id.is_empty() {
            UNKNOWN_ACCOUNT
        } else {
            resource.account_id.as_str()
        };
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(resource),
            None => groups.push((key, vec![resource])),
        }
    }
    groups
}
