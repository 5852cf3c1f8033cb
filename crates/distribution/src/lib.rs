//! Time-swept distribution of surge values.
//!
//! This crate provides:
//! - Sample instant generation and range clamping
//! - The distribution sweep with per-value provenance
//! - Equal-width histograms with drill-down
//! - Export rows for downstream writers

pub mod export;
pub mod histogram;
pub mod report;
pub mod sampler;

pub use export::{write_rows_json, DrillDownRow, HistogramRow};
pub use histogram::{Histogram, HistogramBin, HistogramBuilder, MAX_BINS, MIN_BINS};
pub use report::{build_report, DistributionReport};
pub use sampler::{sample_instants, DistributionSampler, SampleRun, TimeRange};
