//! Row validation at the ingestion boundary.
//!
//! Converts parsed upload rows into typed records and drops the ones the
//! pipeline must never see: non-finite coordinates, the `(0, 0)` placeholder
//! coordinate, and supply windows that end before they start.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surge_core::{DemandEvent, SupplyRecord};
use tracing::debug;

/// A parsed demand row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandRow {
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
}

/// A parsed supply row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplyRow {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
}

/// Why a row was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// NaN or infinite latitude/longitude.
    NonFinite,
    /// Exactly `(0, 0)`.
    NullIsland,
    /// Supply window ends before it starts.
    InvertedInterval,
}

/// Statistics about row validation.
#[derive(Debug, Clone, Default)]
pub struct ValidationStats {
    /// Demand rows accepted.
    pub demand_accepted: u64,
    /// Supply rows accepted.
    pub supply_accepted: u64,
    /// Rows with non-finite coordinates.
    pub non_finite: u64,
    /// Rows at exactly (0, 0).
    pub null_island: u64,
    /// Supply rows with start > end.
    pub inverted_interval: u64,
}

impl ValidationStats {
    /// Total rows rejected for any reason.
    pub fn rejected(&self) -> u64 {
        self.non_finite + self.null_island + self.inverted_interval
    }

    /// Total rows accepted.
    pub fn accepted(&self) -> u64 {
        self.demand_accepted + self.supply_accepted
    }

    fn record(&mut self, rejection: Rejection) {
        match rejection {
            Rejection::NonFinite => self.non_finite += 1,
            Rejection::NullIsland => self.null_island += 1,
            Rejection::InvertedInterval => self.inverted_interval += 1,
        }
    }
}

fn check_coordinate(lat: f64, lng: f64) -> Result<(), Rejection> {
    if !lat.is_finite() || !lng.is_finite() {
        return Err(Rejection::NonFinite);
    }
    if lat == 0.0 && lng == 0.0 {
        return Err(Rejection::NullIsland);
    }
    Ok(())
}

/// Validate a demand row.
pub fn validate_demand(row: &DemandRow) -> Result<DemandEvent, Rejection> {
    check_coordinate(row.latitude, row.longitude)?;
    Ok(DemandEvent {
        ts_ms: row.timestamp.timestamp_millis(),
        lat: row.latitude,
        lng: row.longitude,
    })
}

/// Validate a supply row.
pub fn validate_supply(row: &SupplyRow) -> Result<SupplyRecord, Rejection> {
    check_coordinate(row.latitude, row.longitude)?;
    let start_ms = row.start_time.timestamp_millis();
    let end_ms = row.end_time.timestamp_millis();
    if start_ms > end_ms {
        return Err(Rejection::InvertedInterval);
    }
    Ok(SupplyRecord {
        start_ms,
        end_ms,
        lat: row.latitude,
        lng: row.longitude,
    })
}

/// Batch validator that keeps counts of what it dropped.
#[derive(Debug, Default)]
pub struct RowValidator {
    stats: ValidationStats,
}

impl RowValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate demand rows, dropping invalid ones.
    pub fn demand(&mut self, rows: &[DemandRow]) -> Vec<DemandEvent> {
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            match validate_demand(row) {
                Ok(event) => {
                    self.stats.demand_accepted += 1;
                    out.push(event);
                }
                Err(rejection) => {
                    debug!(?rejection, ?row, "dropping demand row");
                    self.stats.record(rejection);
                }
            }
        }
        out
    }

    /// Validate supply rows, dropping invalid ones.
    pub fn supply(&mut self, rows: &[SupplyRow]) -> Vec<SupplyRecord> {
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            match validate_supply(row) {
                Ok(record) => {
                    self.stats.supply_accepted += 1;
                    out.push(record);
                }
                Err(rejection) => {
                    debug!(?rejection, ?row, "dropping supply row");
                    self.stats.record(rejection);
                }
            }
        }
        out
    }

    /// Get validation statistics.
    pub fn stats(&self) -> &ValidationStats {
        &self.stats
    }
}
