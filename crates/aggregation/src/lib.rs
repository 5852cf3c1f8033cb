//! Spatiotemporal aggregation for the surge-map system.
//!
//! This crate handles:
//! - Temporal filtering (demand lookback window, supply availability)
//! - Spatial bucketing into hex cells
//! - Demand/supply ratio under raw, log or z-score normalization
//! - Multiplier table lookup and pricing
//! - Snapshot composition, including the map halo

pub mod pricing;
pub mod ratio;
pub mod snapshot;
pub mod spatial;
pub mod stats;
pub mod temporal;

#[cfg(test)]
mod test_support;

pub use pricing::{resolve_multiplier, PricingResolver};
pub use ratio::{log_ratio, raw_ratio, RatioEngine};
pub use snapshot::SnapshotComposer;
pub use spatial::{CellCounts, SpatialAggregator};
pub use stats::RunningStats;
pub use temporal::TemporalFilter;
