//! Snapshot composition.
//!
//! Runs temporal filter, spatial aggregation, ratio engine and pricing for
//! one reference instant. The map view additionally gets a halo of ring-1
//! neighbor cells with zero values, plus cell centers.

use crate::pricing::PricingResolver;
use crate::ratio::RatioEngine;
use crate::spatial::{CellCounts, SpatialAggregator};
use crate::temporal::TemporalFilter;
use std::collections::BTreeSet;
use surge_core::{
    CellAggregate, CellId, Config, DataPresence, HexIndexer, Snapshot, TimestampMs, ValueMode,
};
use surge_ingestion::Dataset;
use tracing::debug;

/// Composes per-cell snapshots under one applied configuration.
pub struct SnapshotComposer<'a, H: HexIndexer + ?Sized> {
    indexer: &'a H,
    resolution: u8,
    filter: TemporalFilter,
    ratio: RatioEngine,
    pricing: Option<PricingResolver>,
    mode: ValueMode,
}

impl<'a, H: HexIndexer + ?Sized> SnapshotComposer<'a, H> {
    /// `presence` must describe the whole upload, not a filtered subset.
    pub fn new(indexer: &'a H, config: &Config, presence: DataPresence) -> Self {
        let pricing = PricingResolver::from_config(&config.pricing);
        let mode = ValueMode::resolve(presence, pricing.is_some());

        Self {
            indexer,
            resolution: config.grid.resolution,
            filter: TemporalFilter::from_config(&config.window),
            ratio: RatioEngine::new(config.ratio.policy),
            pricing,
            mode,
        }
    }

    /// Composer for a dataset, taking presence from the dataset itself.
    pub fn for_dataset(indexer: &'a H, config: &Config, dataset: &Dataset) -> Self {
        Self::new(indexer, config, dataset.presence())
    }

    pub fn mode(&self) -> ValueMode {
        self.mode
    }

    pub fn indexer(&self) -> &'a H {
        self.indexer
    }

    /// Per-cell counts of the records active at `t`.
    pub fn counts(&self, dataset: &Dataset, t: TimestampMs) -> CellCounts {
        let demand = self.filter.active_demand_sorted(t, dataset.demand());
        let supply = self.filter.active_supply(t, dataset.supply());
        SpatialAggregator::new(self.indexer, self.resolution).aggregate(demand, supply)
    }

    /// Active cells at `t`, ordered by cell id.
    pub fn compose(&self, dataset: &Dataset, t: TimestampMs) -> Snapshot {
        if self.mode == ValueMode::Empty {
            return Snapshot::empty(t, self.mode);
        }

        let counts = self.counts(dataset, t);
        let cells = self.build_cells(&counts);

        debug!(
            ts_ms = t,
            mode = ?self.mode,
            cells = cells.len(),
            demand = counts.total_demand(),
            supply = counts.total_supply(),
            "snapshot composed"
        );

        Snapshot {
            ts_ms: t,
            mode: self.mode,
            cells,
        }
    }

    /// Active cells plus zero-valued ring-1 halo cells, with centers.
    pub fn compose_with_halo(&self, dataset: &Dataset, t: TimestampMs) -> Snapshot {
        let mut snapshot = self.compose(dataset, t);

        let active: BTreeSet<CellId> = snapshot.cells.iter().map(|c| c.cell_id.clone()).collect();
        let mut halo = BTreeSet::new();

        for cell in &active {
            match self.indexer.ring_neighbors(cell, 1) {
                Ok(neighbors) => {
                    halo.extend(neighbors.into_iter().filter(|n| !active.contains(n)));
                }
                Err(err) => debug!(cell = %cell, %err, "neighbor lookup failed, skipping"),
            }
        }

        snapshot
            .cells
            .extend(halo.into_iter().map(CellAggregate::inactive));

        for cell in &mut snapshot.cells {
            cell.center = self.indexer.center_of(&cell.cell_id).ok();
        }

        snapshot
    }

    /// `(cell, value)` for every active cell at `t`.
    pub fn cell_values(&self, dataset: &Dataset, t: TimestampMs) -> Vec<(CellId, f64)> {
        self.compose(dataset, t)
            .cells
            .into_iter()
            .map(|c| (c.cell_id, c.value))
            .collect()
    }

    fn build_cells(&self, counts: &CellCounts) -> Vec<CellAggregate> {
        let active = |cell_id: CellId, ratio: f64| CellAggregate {
            demand_count: counts.demand_at(&cell_id),
            supply_count: counts.supply_at(&cell_id),
            cell_id,
            ratio,
            multiplier: None,
            final_price: 0.0,
            value: ratio,
            active: true,
            center: None,
        };

        match self.mode {
            ValueMode::Empty => Vec::new(),
            // One-sided modes: the count verbatim, no normalization.
            ValueMode::DemandOnly => counts
                .all_cell_ids()
                .into_iter()
                .map(|c| {
                    let d = counts.demand_at(&c) as f64;
                    active(c, d)
                })
                .collect(),
            ValueMode::SupplyOnly => counts
                .all_cell_ids()
                .into_iter()
                .map(|c| {
                    let s = counts.supply_at(&c) as f64;
                    active(c, s)
                })
                .collect(),
            // `pricing` is present exactly in price mode.
            ValueMode::Price | ValueMode::Coefficient => self
                .ratio
                .compute(counts)
                .into_iter()
                .map(|(c, ratio)| match &self.pricing {
                    Some(pricing) => {
                        let multiplier = pricing.multiplier(ratio);
                        let final_price = multiplier * pricing.base_price();
                        CellAggregate {
                            multiplier: Some(multiplier),
                            final_price,
                            value: final_price,
                            ..active(c, ratio)
                        }
                    }
                    None => active(c, ratio),
                })
                .collect(),
        }
    }
}
