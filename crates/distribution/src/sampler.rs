//! Time-swept sampling of snapshot values.
//!
//! Replays the snapshot computation at evenly spaced instants across a time
//! range and flattens every active cell's value into one population, keeping
//! the cell and instant each value came from.

use serde::{Deserialize, Serialize};
use surge_aggregation::SnapshotComposer;
use surge_core::config::DistributionConfig;
use surge_core::{minutes_to_ms, DistributionSample, HexIndexer, TimestampMs, ValueMode};
use surge_ingestion::Dataset;
use tracing::info;

/// Inclusive time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from_ms: TimestampMs,
    pub to_ms: TimestampMs,
}

impl TimeRange {
    pub fn new(from_ms: TimestampMs, to_ms: TimestampMs) -> Self {
        Self { from_ms, to_ms }
    }

    /// Restrict to `bounds`; the result may be inverted.
    pub fn clamp_to(&self, bounds: (TimestampMs, TimestampMs)) -> Self {
        Self {
            from_ms: self.from_ms.max(bounds.0),
            to_ms: self.to_ms.min(bounds.1),
        }
    }

    /// True when the range starts after it ends.
    pub fn is_inverted(&self) -> bool {
        self.from_ms > self.to_ms
    }

    /// Configured range, with unset ends taken from the dataset bounds.
    pub fn from_config(config: &DistributionConfig, dataset: &Dataset) -> Option<Self> {
        let (lo, hi) = dataset.time_bounds()?;
        Some(Self::new(config.from_ms.unwrap_or(lo), config.to_ms.unwrap_or(hi)))
    }
}

/// Sample instants: `from`, then every `step` strictly before `to`, then `to`.
///
/// Both ends are always present. A non-positive step yields only the ends;
/// an inverted range yields nothing.
pub fn sample_instants(from: TimestampMs, to: TimestampMs, step_ms: i64) -> Vec<TimestampMs> {
    if from > to {
        return Vec::new();
    }

    let mut instants = vec![from];
    if step_ms > 0 {
        let mut t = from.saturating_add(step_ms);
        while t < to {
            instants.push(t);
            t = t.saturating_add(step_ms);
        }
    }
    if to != from {
        instants.push(to);
    }
    instants
}

/// Output of one sweep.
#[derive(Debug, Clone, Default)]
pub struct SampleRun {
    /// Range actually swept, after clamping.
    pub range: Option<TimeRange>,
    /// Instants visited.
    pub instants: Vec<TimestampMs>,
    /// Flattened population with provenance.
    pub samples: Vec<DistributionSample>,
    /// Non-finite values discarded.
    pub dropped_non_finite: usize,
}

impl SampleRun {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.value)
    }
}

/// Sweeps a snapshot composer across a time range.
pub struct DistributionSampler<'c, 'a, H: HexIndexer + ?Sized> {
    composer: &'c SnapshotComposer<'a, H>,
    step_ms: i64,
}

impl<'c, 'a, H: HexIndexer + ?Sized> DistributionSampler<'c, 'a, H> {
    pub fn new(composer: &'c SnapshotComposer<'a, H>, step_ms: i64) -> Self {
        Self { composer, step_ms }
    }

    pub fn from_config(composer: &'c SnapshotComposer<'a, H>, config: &DistributionConfig) -> Self {
        Self::new(composer, minutes_to_ms(config.step_minutes))
    }

    /// Sample every active cell at every instant of `range`, clamped to the
    /// dataset's observed time bounds.
    pub fn sample(&self, dataset: &Dataset, range: TimeRange) -> SampleRun {
        if self.composer.mode() == ValueMode::Empty {
            return SampleRun::default();
        }
        let Some(bounds) = dataset.time_bounds() else {
            return SampleRun::default();
        };

        let range = range.clamp_to(bounds);
        if range.is_inverted() {
            return SampleRun::default();
        }

        let instants = sample_instants(range.from_ms, range.to_ms, self.step_ms);
        let mut samples = Vec::new();
        let mut dropped_non_finite = 0;

        for &t in &instants {
            for (cell_id, value) in self.composer.cell_values(dataset, t) {
                if value.is_finite() {
                    samples.push(DistributionSample {
                        value,
                        cell_id,
                        ts_ms: t,
                    });
                } else {
                    dropped_non_finite += 1;
                }
            }
        }

        info!(
            from_ms = range.from_ms,
            to_ms = range.to_ms,
            instants = instants.len(),
            samples = samples.len(),
            dropped = dropped_non_finite,
            "distribution sweep complete"
        );

        SampleRun {
            range: Some(range),
            instants,
            samples,
            dropped_non_finite,
        }
    }
}
