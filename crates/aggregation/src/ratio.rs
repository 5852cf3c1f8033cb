//! Demand/supply ratio under a selectable normalization policy.
//!
//! `Raw` and `Log` are per-cell formulas. `ZScore` standardizes the raw
//! ratio against every cell of the snapshot, so it needs the whole
//! population before it can emit anything.

use crate::spatial::CellCounts;
use crate::stats::RunningStats;
use std::collections::BTreeMap;
use surge_core::{CellId, RatioPolicy};

/// `d / s`; with no supply, 1 if there is demand, else 0.
#[inline]
pub fn raw_ratio(demand: u32, supply: u32) -> f64 {
    if supply > 0 {
        demand as f64 / supply as f64
    } else if demand > 0 {
        1.0
    } else {
        0.0
    }
}

/// `ln(d + 1) / ln(s + 1)`; with no supply, 1 if there is demand, else 0.
///
/// `ln(s + 1) > 0` whenever `s > 0`, so the division is always finite.
#[inline]
pub fn log_ratio(demand: u32, supply: u32) -> f64 {
    if supply > 0 {
        (demand as f64).ln_1p() / (supply as f64).ln_1p()
    } else if demand > 0 {
        1.0
    } else {
        0.0
    }
}

/// Computes per-cell ratios for one snapshot.
#[derive(Debug, Clone, Copy)]
pub struct RatioEngine {
    policy: RatioPolicy,
}

impl RatioEngine {
    pub fn new(policy: RatioPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> RatioPolicy {
        self.policy
    }

    /// Ratio for every cell in `counts.all_cell_ids()`.
    pub fn compute(&self, counts: &CellCounts) -> BTreeMap<CellId, f64> {
        let cells = counts.all_cell_ids();
        let per_cell = |f: fn(u32, u32) -> f64| {
            cells
                .iter()
                .map(|c| (c.clone(), f(counts.demand_at(c), counts.supply_at(c))))
                .collect::<BTreeMap<_, _>>()
        };

        match self.policy {
            RatioPolicy::Raw => per_cell(raw_ratio),
            RatioPolicy::Log => per_cell(log_ratio),
            RatioPolicy::ZScore => z_scores(per_cell(raw_ratio)),
        }
    }
}

/// Replace each value by `(x - mean) / std_dev`, keeping it unchanged when
/// the population has no spread.
fn z_scores(mut ratios: BTreeMap<CellId, f64>) -> BTreeMap<CellId, f64> {
    let stats: RunningStats = ratios.values().copied().collect();
    let mean = stats.mean();
    let std_dev = stats.std_dev();

    if std_dev > 0.0 {
        for r in ratios.values_mut() {
            *r = (*r - mean) / std_dev;
        }
    }
    ratios
}
