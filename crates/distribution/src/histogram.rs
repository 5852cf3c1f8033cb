//! Equal-width histogram over a sampled value population.
//!
//! Bins span `[min, max]` of the population. Every bin keeps the samples
//! that fell into it so a chart can drill down from a bar to the cells and
//! instants behind it.

use serde::{Deserialize, Serialize};
use surge_core::DistributionSample;

/// Fewest bins a histogram will use.
pub const MIN_BINS: usize = 5;
/// Most bins a histogram will use.
pub const MAX_BINS: usize = 60;

/// One histogram bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    /// Lower edge.
    pub low: f64,
    /// Upper edge.
    pub high: f64,
    /// `"{low}–{high}"`, two decimals.
    pub label: String,
    pub count: usize,
    /// Contributing samples.
    pub samples: Vec<DistributionSample>,
}

/// Binned population.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// Observed minimum (0 for an empty population).
    pub min: f64,
    /// Observed maximum (0 for an empty population).
    pub max: f64,
    /// Bins in ascending value order.
    pub bins: Vec<HistogramBin>,
}

impl Histogram {
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Sum of bin counts.
    pub fn total_count(&self) -> usize {
        self.bins.iter().map(|b| b.count).sum()
    }

    pub fn bin(&self, index: usize) -> Option<&HistogramBin> {
        self.bins.get(index)
    }

    /// Samples behind a bar; empty for an unknown index.
    pub fn drill_down(&self, index: usize) -> &[DistributionSample] {
        self.bins.get(index).map(|b| b.samples.as_slice()).unwrap_or(&[])
    }
}

/// Builds histograms with a fixed bin count.
#[derive(Debug, Clone, Copy)]
pub struct HistogramBuilder {
    bin_count: usize,
}

impl HistogramBuilder {
    /// `bin_count` is clamped to `MIN_BINS..=MAX_BINS`.
    pub fn new(bin_count: usize) -> Self {
        Self {
            bin_count: bin_count.clamp(MIN_BINS, MAX_BINS),
        }
    }

    pub fn bin_count(&self) -> usize {
        self.bin_count
    }

    /// Bin a population. Non-finite values are dropped.
    pub fn build(&self, samples: Vec<DistributionSample>) -> Histogram {
        let samples: Vec<DistributionSample> = samples
            .into_iter()
            .filter(|s| s.value.is_finite())
            .collect();

        // Linear scan, no variadic max over the whole population.
        let mut bounds: Option<(f64, f64)> = None;
        for s in &samples {
            bounds = Some(match bounds {
                Some((lo, hi)) => (lo.min(s.value), hi.max(s.value)),
                None => (s.value, s.value),
            });
        }
        let Some((min, max)) = bounds else {
            return Histogram::default();
        };

        if min == max {
            return Histogram {
                min,
                max,
                bins: vec![HistogramBin {
                    low: min,
                    high: max,
                    label: format!("{:.2}", min),
                    count: samples.len(),
                    samples,
                }],
            };
        }

        let n = self.bin_count;
        let width = (max - min) / n as f64;
        let mut bins: Vec<HistogramBin> = (0..n)
            .map(|i| {
                let low = min + i as f64 * width;
                let high = if i + 1 == n { max } else { min + (i + 1) as f64 * width };
                HistogramBin {
                    low,
                    high,
                    label: format!("{:.2}–{:.2}", low, high),
                    count: 0,
                    samples: Vec::new(),
                }
            })
            .collect();

        for s in samples {
            let raw = ((s.value - min) / width).floor();
            let index = if raw <= 0.0 { 0 } else { (raw as usize).min(n - 1) };
            let bin = &mut bins[index];
            bin.count += 1;
            bin.samples.push(s);
        }

        Histogram { min, max, bins }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use surge_core::CellId;

    fn make_sample(value: f64) -> DistributionSample {
        DistributionSample {
            value,
            cell_id: CellId::new("c"),
            ts_ms: 0,
        }
    }

    fn population(values: &[f64]) -> Vec<DistributionSample> {
        values.iter().map(|&v| make_sample(v)).collect()
    }

    #[test]
    fn test_bin_count_clamped() {
        assert_eq!(HistogramBuilder::new(0).bin_count(), MIN_BINS);
        assert_eq!(HistogramBuilder::new(20).bin_count(), 20);
        assert_eq!(HistogramBuilder::new(1000).bin_count(), MAX_BINS);
    }

    #[test]
    fn test_empty_population() {
        let hist = HistogramBuilder::new(10).build(Vec::new());
        assert!(hist.is_empty());
        assert_eq!(hist.total_count(), 0);
    }

    #[test]
    fn test_single_value_population() {
        let hist = HistogramBuilder::new(10).build(population(&[2.5, 2.5, 2.5]));
        assert_eq!(hist.bins.len(), 1);
        assert_eq!(hist.bins[0].label, "2.50");
        assert_eq!(hist.bins[0].count, 3);
        assert_eq!(hist.drill_down(0).len(), 3);
    }

    #[test]
    fn test_equal_width_bins() {
        let hist =
            HistogramBuilder::new(5).build(population(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 10.0]));

        assert_eq!(hist.bins.len(), 5);
        assert_eq!(hist.min, 0.0);
        assert_eq!(hist.max, 10.0);

        let labels: Vec<&str> = hist.bins.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["0.00–2.00", "2.00–4.00", "4.00–6.00", "6.00–8.00", "8.00–10.00"]
        );

        let counts: Vec<usize> = hist.bins.iter().map(|b| b.count).collect();
        // Max lands in the last bin rather than overflowing
        assert_eq!(counts, vec![2, 2, 2, 0, 1]);
    }

    #[test]
    fn test_bins_contiguous() {
        let hist = HistogramBuilder::new(7).build(population(&[-3.3, 0.1, 4.7, 9.9]));
        for pair in hist.bins.windows(2) {
            assert_eq!(pair[0].high, pair[1].low);
            assert!(pair[0].low < pair[1].low);
        }
        assert_eq!(hist.bins.first().unwrap().low, -3.3);
        assert_eq!(hist.bins.last().unwrap().high, 9.9);
    }

    #[test]
    fn test_coverage() {
        let values: Vec<f64> = (0..1000)
            .map(|i| ((i * 7919) % 1009) as f64 / 13.0 - 20.0)
            .collect();

        for n in [5, 13, 60] {
            let hist = HistogramBuilder::new(n).build(population(&values));
            assert_eq!(hist.total_count(), values.len());

            for bin in &hist.bins {
                assert_eq!(bin.count, bin.samples.len());
                for s in &bin.samples {
                    assert!(s.value >= bin.low - 1e-9 && s.value <= bin.high + 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_non_finite_dropped() {
        let hist = HistogramBuilder::new(5).build(population(&[1.0, f64::NAN, 2.0, f64::INFINITY]));
        assert_eq!(hist.total_count(), 2);
        assert_eq!(hist.max, 2.0);
    }

    #[test]
    fn test_drill_down_provenance() {
        let samples = vec![
            DistributionSample {
                value: 1.0,
                cell_id: CellId::new("a"),
                ts_ms: 10,
            },
            DistributionSample {
                value: 9.0,
                cell_id: CellId::new("b"),
                ts_ms: 20,
            },
        ];
        let hist = HistogramBuilder::new(5).build(samples);

        assert_eq!(hist.drill_down(0)[0].cell_id, CellId::new("a"));
        let last = hist.drill_down(4);
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].cell_id, CellId::new("b"));
        assert_eq!(last[0].ts_ms, 20);
        assert!(hist.drill_down(99).is_empty());
    }
}
