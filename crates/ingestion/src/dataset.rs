//! Immutable uploaded datasets.

use crate::validator::{DemandRow, RowValidator, SupplyRow, ValidationStats};
use serde::{Deserialize, Serialize};
use std::path::Path;
use surge_core::{DataPresence, DemandEvent, MultiplierRule, Result, SupplyRecord, TimestampMs};
use tracing::info;

/// Validated demand and supply, fixed for the lifetime of a computation.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// Demand events, sorted by timestamp.
    demand: Vec<DemandEvent>,
    supply: Vec<SupplyRecord>,
}

impl Dataset {
    /// Build a dataset from validated records.
    pub fn new(mut demand: Vec<DemandEvent>, supply: Vec<SupplyRecord>) -> Self {
        demand.sort_by_key(|e| e.ts_ms);
        Self { demand, supply }
    }

    /// Demand events in timestamp order.
    pub fn demand(&self) -> &[DemandEvent] {
        &self.demand
    }

    pub fn supply(&self) -> &[SupplyRecord] {
        &self.supply
    }

    /// Which kinds of data were uploaded.
    pub fn presence(&self) -> DataPresence {
        DataPresence::new(!self.demand.is_empty(), !self.supply.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.demand.is_empty() && self.supply.is_empty()
    }

    /// Earliest and latest instant observed across both datasets.
    ///
    /// Demand contributes its timestamps, supply its window starts and ends.
    pub fn time_bounds(&self) -> Option<(TimestampMs, TimestampMs)> {
        let demand = self.demand.first().zip(self.demand.last()).map(|(a, b)| (a.ts_ms, b.ts_ms));

        let supply = self.supply.iter().fold(None, |acc: Option<(i64, i64)>, v| {
            Some(match acc {
                Some((lo, hi)) => (lo.min(v.start_ms), hi.max(v.end_ms)),
                None => (v.start_ms, v.end_ms),
            })
        });

        match (demand, supply) {
            (Some((a, b)), Some((c, d))) => Some((a.min(c), b.max(d))),
            (Some(bounds), None) | (None, Some(bounds)) => Some(bounds),
            (None, None) => None,
        }
    }
}

/// Upload file layout: parsed rows plus an optional multiplier table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetFile {
    pub demand: Vec<DemandRow>,
    pub supply: Vec<SupplyRow>,
    pub multipliers: Vec<MultiplierRule>,
}

/// Result of validating an upload.
#[derive(Debug, Clone)]
pub struct Upload {
    pub dataset: Dataset,
    pub multipliers: Vec<MultiplierRule>,
    pub stats: ValidationStats,
}

impl DatasetFile {
    /// Validate every row and build the dataset.
    pub fn into_upload(self) -> Upload {
        let mut validator = RowValidator::new();
        let demand = validator.demand(&self.demand);
        let supply = validator.supply(&self.supply);
        let stats = validator.stats().clone();

        info!(
            demand = stats.demand_accepted,
            supply = stats.supply_accepted,
            rejected = stats.rejected(),
            multipliers = self.multipliers.len(),
            "upload validated"
        );

        Upload {
            dataset: Dataset::new(demand, supply),
            multipliers: self.multipliers,
            stats,
        }
    }
}

/// Parse and validate an upload from JSON text.
pub fn from_json_str(s: &str) -> Result<Upload> {
    let file: DatasetFile = serde_json::from_str(s)?;
    Ok(file.into_upload())
}

/// Load and validate an upload file (JSON).
pub fn load_json(path: impl AsRef<Path>) -> Result<Upload> {
    let text = std::fs::read_to_string(path)?;
    from_json_str(&text)
}
