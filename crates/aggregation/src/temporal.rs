//! Temporal filtering of demand and supply.
//!
//! Demand is active inside a trailing window `[t - w, t]`; supply is active
//! while its availability window contains `t`. Both bounds are inclusive.

use surge_core::config::WindowConfig;
use surge_core::{minutes_to_ms, DemandEvent, SupplyRecord, TimestampMs};

/// Selects the records active at a reference instant.
#[derive(Debug, Clone, Copy)]
pub struct TemporalFilter {
    lookback_ms: i64,
}

impl TemporalFilter {
    /// Create a filter with a demand lookback in milliseconds.
    pub fn new(lookback_ms: i64) -> Self {
        Self {
            lookback_ms: lookback_ms.max(0),
        }
    }

    pub fn from_config(config: &WindowConfig) -> Self {
        Self::new(minutes_to_ms(config.lookback_minutes))
    }

    pub fn lookback_ms(&self) -> i64 {
        self.lookback_ms
    }

    /// Demand events with `t - w <= ts <= t`.
    pub fn active_demand<'a>(
        &self,
        t: TimestampMs,
        events: &'a [DemandEvent],
    ) -> Vec<&'a DemandEvent> {
        let from = t.saturating_sub(self.lookback_ms);
        events
            .iter()
            .filter(|e| from <= e.ts_ms && e.ts_ms <= t)
            .collect()
    }

    /// Same as [`active_demand`](Self::active_demand) for events sorted by timestamp.
    pub fn active_demand_sorted<'a>(
        &self,
        t: TimestampMs,
        events: &'a [DemandEvent],
    ) -> &'a [DemandEvent] {
        debug_assert!(events.windows(2).all(|w| w[0].ts_ms <= w[1].ts_ms));

        let from = t.saturating_sub(self.lookback_ms);
        let lo = events.partition_point(|e| e.ts_ms < from);
        let hi = events.partition_point(|e| e.ts_ms <= t);
        if lo >= hi {
            return &[];
        }
        &events[lo..hi]
    }

    /// Supply records whose window contains `t`.
    pub fn active_supply<'a>(
        &self,
        t: TimestampMs,
        records: &'a [SupplyRecord],
    ) -> Vec<&'a SupplyRecord> {
        records.iter().filter(|v| v.contains(t)).collect()
    }
}
