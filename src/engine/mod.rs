//! Dependency-aware deletion engine
//!
//! A batch of candidate resources is grouped by account, each group is turned
//! into a [`graph::DependencyGraph`], sequenced, and then every resource goes
//! through its type's pre-processing step (if any) followed by the generic
//! delete. One resource failing never stops the batch.
//!
//! # Module Structure
//!
//! - [`graph`] - Type-priority and ID-containment edges
//! - [`sequence`] - Post-order walk producing the processing order
//! - [`preprocess`] - Detach/disassociate routines run before a delete
//! - [`executor`] - Generic delete by resource coordinates
//! - [`orchestrator`] - Per-account batch loop and outcome bookkeeping
//! - [`progress`] - Progress sinks

pub mod executor;
pub mod graph;
pub mod orchestrator;
pub mod preprocess;
pub mod progress;
pub mod sequence;

pub use graph::{build_graph, Dependency, DependencyGraph};
pub use orchestrator::{BatchInterrupted, BatchResult, DeletionEngine};
pub use progress::{ConsoleProgress, LogProgress, NoProgress, ProgressSink};
pub use sequence::sequence;

use std::time::Duration;

/// Pause standing in for a remote call during a dry run
pub const DEFAULT_SIMULATED_DELAY: Duration = Duration::from_millis(500);

/// Wait used by the disk detach step
pub const DEFAULT_DISK_DETACH_DELAY: Duration = Duration::from_secs(1);

/// Knobs shared by every step of a batch
#[derive(Debug, Clone)]
pub struct DeletionSettings {
    pub dry_run: bool,
    pub simulated_delay: Duration,
    pub disk_detach_delay: Duration,
}

impl Default for DeletionSettings {
    fn default() -> Self {
        Self {
            dry_run: true,
            simulated_delay: DEFAULT_SIMULATED_DELAY,
            disk_detach_delay: DEFAULT_DISK_DETACH_DELAY,
        }
    }
}

impl DeletionSettings {
    pub fn live() -> Self {
        Self {
            dry_run: false,
            ..Self::default()
        }
    }

    /// Same settings with every artificial wait removed
    pub fn without_delays(mut self) -> Self {
        self.simulated_delay = Duration::ZERO;
        self.disk_detach_delay = Duration::ZERO;
        self
    }
}

/// Outcome of one pre-processing step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub ok: bool,
    pub detail: String,
}

impl StepReport {
    pub fn success(detail: impl Into<String>) -> Self {
        Self {
            ok: true,
            detail: detail.into(),
        }
    }

    pub fn failure(detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            detail: detail.into(),
        }
    }
}
