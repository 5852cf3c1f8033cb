//! Tabular rows handed to a downstream exporter.

use crate::histogram::{Histogram, HistogramBin};
use serde::Serialize;
use std::io::Write;
use surge_core::{format_ts, Result, TimestampMs};

/// One histogram bar as a table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistogramRow {
    pub label: String,
    pub count: usize,
}

/// One sample behind a bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrillDownRow {
    pub cell_id: String,
    pub ts_ms: TimestampMs,
    /// RFC 3339 rendering of `ts_ms`.
    pub instant: String,
    pub value: f64,
}

impl Histogram {
    /// `(label, count)` per bar, in bin order.
    pub fn rows(&self) -> Vec<HistogramRow> {
        self.bins
            .iter()
            .map(|b| HistogramRow {
                label: b.label.clone(),
                count: b.count,
            })
            .collect()
    }
}

impl HistogramBin {
    /// Contributing samples as rows.
    pub fn drill_down_rows(&self) -> Vec<DrillDownRow> {
        self.samples
            .iter()
            .map(|s| DrillDownRow {
                cell_id: s.cell_id.to_string(),
                ts_ms: s.ts_ms,
                instant: format_ts(s.ts_ms),
                value: s.value,
            })
            .collect()
    }
}

/// Write rows as a pretty-printed JSON array.
pub fn write_rows_json<W: Write, T: Serialize>(mut writer: W, rows: &[T]) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, rows)?;
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::HistogramBuilder;
    use surge_core::{CellId, DistributionSample};

    fn histogram() -> Histogram {
        let samples = [0.0, 1.0, 4.0, 5.0]
            .iter()
            .enumerate()
            .map(|(i, &v)| DistributionSample {
                value: v,
                cell_id: CellId::new(format!("cell-{}", i)),
                ts_ms: 1704067200000 + i as i64 * 60_000,
            })
            .collect();
        HistogramBuilder::new(5).build(samples)
    }

    #[test]
    fn test_rows() {
        let rows = histogram().rows();
        assert_eq!(rows.len(), 5);
        assert_eq!(
            rows[0],
            HistogramRow {
                label: "0.00–1.00".to_string(),
                count: 1
            }
        );
        assert_eq!(rows.iter().map(|r| r.count).sum::<usize>(), 4);
    }

    #[test]
    fn test_drill_down_rows() {
        let hist = histogram();
        let rows = hist.bins[4].drill_down_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cell_id, "cell-2");
        assert_eq!(rows[0].instant, "2024-01-01T00:02:00Z");
        assert_eq!(rows[1].value, 5.0);
    }

    #[test]
    fn test_write_rows_json() {
        let mut buf = Vec::new();
        write_rows_json(&mut buf, &histogram().rows()).unwrap();

        let parsed: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        let arr = parsed.as_array().unwrap();
        assert_eq!(arr.len(), 5);
        assert_eq!(arr[0]["label"], "0.00–1.00");
        assert_eq!(arr[0]["count"], 1);
    }
}
