//! Spatial bucketing of active records into grid cells.

use std::collections::{BTreeMap, BTreeSet};
use surge_core::{CellId, DemandEvent, HexIndexer, SupplyRecord};
use tracing::warn;

/// Per-cell counts for one snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellCounts {
    /// Demand events per cell.
    pub demand: BTreeMap<CellId, u32>,
    /// Available vehicles per cell.
    pub supply: BTreeMap<CellId, u32>,
    /// Records the indexer could not place.
    pub unindexed: u32,
}

impl CellCounts {
    /// Union of cells with any demand or supply, in key order.
    pub fn all_cell_ids(&self) -> BTreeSet<CellId> {
        self.demand.keys().chain(self.supply.keys()).cloned().collect()
    }

    pub fn demand_at(&self, cell: &CellId) -> u32 {
        self.demand.get(cell).copied().unwrap_or(0)
    }

    pub fn supply_at(&self, cell: &CellId) -> u32 {
        self.supply.get(cell).copied().unwrap_or(0)
    }

    pub fn total_demand(&self) -> u64 {
        self.demand.values().map(|&c| c as u64).sum()
    }

    pub fn total_supply(&self) -> u64 {
        self.supply.values().map(|&c| c as u64).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.demand.is_empty() && self.supply.is_empty()
    }
}

/// Buckets records into cells at a fixed resolution.
pub struct SpatialAggregator<'a, H: HexIndexer + ?Sized> {
    indexer: &'a H,
    resolution: u8,
}

impl<'a, H: HexIndexer + ?Sized> SpatialAggregator<'a, H> {
    pub fn new(indexer: &'a H, resolution: u8) -> Self {
        Self { indexer, resolution }
    }

    pub fn resolution(&self) -> u8 {
        self.resolution
    }

    /// Count each active record once in its cell.
    pub fn aggregate<'d, D, S>(&self, demand: D, supply: S) -> CellCounts
    where
        D: IntoIterator<Item = &'d DemandEvent>,
        S: IntoIterator<Item = &'d SupplyRecord>,
    {
        let mut counts = CellCounts::default();

        for e in demand {
            match self.indexer.cell_id_for(e.lat, e.lng, self.resolution) {
                Ok(cell) => *counts.demand.entry(cell).or_insert(0) += 1,
                Err(err) => {
                    warn!(lat = e.lat, lng = e.lng, %err, "demand event not indexable");
                    counts.unindexed += 1;
                }
            }
        }

        for v in supply {
            match self.indexer.cell_id_for(v.lat, v.lng, self.resolution) {
                Ok(cell) => *counts.supply.entry(cell).or_insert(0) += 1,
                Err(err) => {
                    warn!(lat = v.lat, lng = v.lng, %err, "supply record not indexable");
                    counts.unindexed += 1;
                }
            }
        }

        counts
    }
}
