//! Self-contained recalculation runs.
//!
//! A run owns `Arc` handles to the inputs it was started with, so executing
//! it never touches session state and it can be moved onto a blocking
//! worker.

use std::sync::Arc;
use surge_aggregation::SnapshotComposer;
use surge_core::{Config, HexIndexer, Snapshot, TimestampMs};
use surge_distribution::{build_report, DistributionReport, TimeRange};
use surge_ingestion::Dataset;

/// Whether a finished run's result was stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    /// Result is now the session's current view.
    Applied,
    /// A newer run or input change happened first; result discarded.
    Superseded,
}

/// Value produced by a run, tagged with the run id it came from.
#[derive(Debug, Clone)]
pub struct RunOutput<T> {
    run_id: u64,
    value: T,
}

impl<T> RunOutput<T> {
    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// Map snapshot (with halo) at one instant.
pub struct MapRun<H: HexIndexer> {
    pub(crate) run_id: u64,
    pub(crate) ts_ms: TimestampMs,
    pub(crate) indexer: Arc<H>,
    pub(crate) dataset: Arc<Dataset>,
    pub(crate) config: Arc<Config>,
}

impl<H: HexIndexer> MapRun<H> {
    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    pub fn ts_ms(&self) -> TimestampMs {
        self.ts_ms
    }

    pub fn execute(self) -> RunOutput<Snapshot> {
        let composer =
            SnapshotComposer::for_dataset(self.indexer.as_ref(), &self.config, &self.dataset);
        RunOutput {
            run_id: self.run_id,
            value: composer.compose_with_halo(&self.dataset, self.ts_ms),
        }
    }
}

/// Distribution sweep plus histogram.
pub struct DistributionRun<H: HexIndexer> {
    pub(crate) run_id: u64,
    pub(crate) range: Option<TimeRange>,
    pub(crate) indexer: Arc<H>,
    pub(crate) dataset: Arc<Dataset>,
    pub(crate) config: Arc<Config>,
}

impl<H: HexIndexer> DistributionRun<H> {
    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    /// `None` sweeps the configured range.
    pub fn range(&self) -> Option<TimeRange> {
        self.range
    }

    pub fn execute(self) -> RunOutput<DistributionReport> {
        let composer =
            SnapshotComposer::for_dataset(self.indexer.as_ref(), &self.config, &self.dataset);
        let report = build_report(&composer, &self.dataset, &self.config.distribution, self.range);
        RunOutput {
            run_id: self.run_id,
            value: report,
        }
    }
}
