//! Core data types for the surge-map system.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp in milliseconds since Unix epoch (UTC).
pub type TimestampMs = i64;

/// One minute in milliseconds.
pub const MINUTE_MS: i64 = 60_000;

/// Convert a duration in minutes to milliseconds.
#[inline]
pub fn minutes_to_ms(minutes: u32) -> i64 {
    minutes as i64 * MINUTE_MS
}

/// Format a timestamp as RFC 3339 (UTC, second precision).
///
/// Falls back to the raw millisecond value if it is outside chrono's range.
pub fn format_ts(ts_ms: TimestampMs) -> String {
    DateTime::<Utc>::from_timestamp_millis(ts_ms)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| ts_ms.to_string())
}

/// A single trip request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DemandEvent {
    /// Request time.
    pub ts_ms: TimestampMs,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

/// A vehicle availability window at a fixed location.
///
/// `start_ms <= end_ms` is guaranteed by ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupplyRecord {
    /// Start of availability.
    pub start_ms: TimestampMs,
    /// End of availability.
    pub end_ms: TimestampMs,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl SupplyRecord {
    /// Whether the vehicle is available at `ts_ms` (both ends inclusive).
    #[inline]
    pub fn contains(&self, ts_ms: TimestampMs) -> bool {
        self.start_ms <= ts_ms && ts_ms <= self.end_ms
    }
}

/// One step of a multiplier table: ratios at or above `min_ratio` get `multiplier`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultiplierRule {
    /// Lower bound (inclusive) of the ratio band.
    pub min_ratio: f64,
    /// Price multiplier for the band.
    pub multiplier: f64,
}

impl MultiplierRule {
    pub fn new(min_ratio: f64, multiplier: f64) -> Self {
        Self { min_ratio, multiplier }
    }
}

/// Opaque hexagonal cell key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(String);

impl CellId {
    pub fn new(key: impl Into<String>) -> Self {
        CellId(key.into())
    }

    /// Get the raw key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CellId {
    fn from(s: &str) -> Self {
        CellId(s.to_string())
    }
}

impl From<String> for CellId {
    fn from(s: String) -> Self {
        CellId(s)
    }
}

/// A point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

/// Which datasets are present in the whole upload.
///
/// Always derived from the full dataset, never from a time-filtered subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DataPresence {
    pub has_demand: bool,
    pub has_supply: bool,
}

impl DataPresence {
    pub fn new(has_demand: bool, has_supply: bool) -> Self {
        Self { has_demand, has_supply }
    }

    /// Both demand and supply were uploaded.
    #[inline]
    pub fn has_both(&self) -> bool {
        self.has_demand && self.has_supply
    }
}

/// What a snapshot emits as the per-cell value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueMode {
    /// Both datasets plus a usable multiplier table and base price.
    Price,
    /// Both datasets, no pricing: the ratio itself.
    Coefficient,
    /// Demand only: raw demand count.
    DemandOnly,
    /// Supply only: raw supply count.
    SupplyOnly,
    /// Nothing uploaded.
    Empty,
}

impl ValueMode {
    /// Select the mode from global data presence and pricing readiness.
    pub fn resolve(presence: DataPresence, pricing_ready: bool) -> Self {
        match (presence.has_demand, presence.has_supply) {
            (true, true) if pricing_ready => ValueMode::Price,
            (true, true) => ValueMode::Coefficient,
            (true, false) => ValueMode::DemandOnly,
            (false, true) => ValueMode::SupplyOnly,
            (false, false) => ValueMode::Empty,
        }
    }

    /// Whether the ratio engine runs in this mode.
    pub fn uses_ratio(self) -> bool {
        matches!(self, ValueMode::Price | ValueMode::Coefficient)
    }
}

/// Aggregated state of one cell in one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellAggregate {
    pub cell_id: CellId,
    pub demand_count: u32,
    pub supply_count: u32,
    /// Normalized ratio; equals the count in one-sided modes.
    pub ratio: f64,
    /// Resolved multiplier (price mode only).
    pub multiplier: Option<f64>,
    /// `multiplier * base_price` in price mode, otherwise 0.
    pub final_price: f64,
    /// Value emitted under the snapshot's mode.
    pub value: f64,
    /// False for halo decoration cells.
    pub active: bool,
    /// Cell center, only filled for map rendering.
    pub center: Option<Coordinate>,
}

impl CellAggregate {
    /// A zero-valued halo cell.
    pub fn inactive(cell_id: CellId) -> Self {
        Self {
            cell_id,
            demand_count: 0,
            supply_count: 0,
            ratio: 0.0,
            multiplier: None,
            final_price: 0.0,
            value: 0.0,
            active: false,
            center: None,
        }
    }
}

/// All cells at one reference instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub ts_ms: TimestampMs,
    pub mode: ValueMode,
    /// Active cells first, then halo cells.
    pub cells: Vec<CellAggregate>,
}

impl Snapshot {
    /// An empty snapshot.
    pub fn empty(ts_ms: TimestampMs, mode: ValueMode) -> Self {
        Self {
            ts_ms,
            mode,
            cells: Vec::new(),
        }
    }

    pub fn active_cells(&self) -> impl Iterator<Item = &CellAggregate> {
        self.cells.iter().filter(|c| c.active)
    }

    pub fn halo_cells(&self) -> impl Iterator<Item = &CellAggregate> {
        self.cells.iter().filter(|c| !c.active)
    }

    /// Find a cell by id.
    pub fn cell(&self, cell_id: &CellId) -> Option<&CellAggregate> {
        self.cells.iter().find(|c| &c.cell_id == cell_id)
    }

    /// Emitted values of active cells.
    pub fn values(&self) -> Vec<f64> {
        self.active_cells().map(|c| c.value).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// One contribution to a time-swept value population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSample {
    pub value: f64,
    pub cell_id: CellId,
    pub ts_ms: TimestampMs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minutes_to_ms() {
        assert_eq!(minutes_to_ms(0), 0);
        assert_eq!(minutes_to_ms(15), 900_000);
    }

    #[test]
    fn test_format_ts() {
        // 2024-01-01 00:01:30 UTC
        assert_eq!(format_ts(1704067290000), "2024-01-01T00:01:30Z");
    }

    #[test]
    fn test_supply_contains_inclusive() {
        let v = SupplyRecord {
            start_ms: 100,
            end_ms: 200,
            lat: 1.0,
            lng: 1.0,
        };
        assert!(v.contains(100));
        assert!(v.contains(200));
        assert!(!v.contains(99));
        assert!(!v.contains(201));
    }

    #[test]
    fn test_value_mode_resolve() {
        let both = DataPresence::new(true, true);
        assert_eq!(ValueMode::resolve(both, true), ValueMode::Price);
        assert_eq!(ValueMode::resolve(both, false), ValueMode::Coefficient);
        assert_eq!(
            ValueMode::resolve(DataPresence::new(true, false), true),
            ValueMode::DemandOnly
        );
        assert_eq!(
            ValueMode::resolve(DataPresence::new(false, true), true),
            ValueMode::SupplyOnly
        );
        assert_eq!(
            ValueMode::resolve(DataPresence::default(), true),
            ValueMode::Empty
        );
    }

    #[test]
    fn test_cell_id_serde_transparent() {
        let id = CellId::new("88283082b9fffff");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"88283082b9fffff\"");
    }

    #[test]
    fn test_inactive_cell_is_zero() {
        let cell = CellAggregate::inactive(CellId::new("x"));
        assert!(!cell.active);
        assert_eq!(cell.demand_count, 0);
        assert_eq!(cell.supply_count, 0);
        assert_eq!(cell.value, 0.0);
        assert_eq!(cell.final_price, 0.0);
    }
}
