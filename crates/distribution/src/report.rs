//! Sweep plus histogram in one call.

use crate::histogram::{Histogram, HistogramBuilder};
use crate::sampler::{DistributionSampler, TimeRange};
use serde::Serialize;
use surge_aggregation::SnapshotComposer;
use surge_core::config::DistributionConfig;
use surge_core::{HexIndexer, ValueMode};
use surge_ingestion::Dataset;

/// Result of a distribution run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DistributionReport {
    /// What the values mean.
    pub mode: Option<ValueMode>,
    /// Range swept after clamping; `None` when nothing was swept.
    pub range: Option<TimeRange>,
    pub instants: usize,
    pub dropped_non_finite: usize,
    pub histogram: Histogram,
}

/// Sweep `range` (or the configured range) and bin the population.
pub fn build_report<H: HexIndexer + ?Sized>(
    composer: &SnapshotComposer<'_, H>,
    dataset: &Dataset,
    config: &DistributionConfig,
    range: Option<TimeRange>,
) -> DistributionReport {
    let Some(range) = range.or_else(|| TimeRange::from_config(config, dataset)) else {
        return DistributionReport::default();
    };

    let run = DistributionSampler::from_config(composer, config).sample(dataset, range);
    let histogram = HistogramBuilder::new(config.bin_count).build(run.samples);

    DistributionReport {
        mode: Some(composer.mode()),
        range: run.range,
        instants: run.instants.len(),
        dropped_non_finite: run.dropped_non_finite,
        histogram,
    }
}
