//! PyO3 bindings for the surge map.
//!
//! Exposes to Python:
//! - Demand, supply and multiplier records
//! - Per-cell map aggregates and histogram bins
//! - A `Dashboard` holding one dataset and its settings

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use surge_core::{
    CellAggregate as RustCellAggregate, DemandEvent as RustDemandEvent,
    DistributionSample as RustDistributionSample, Error as RustError, H3Indexer,
    MultiplierRule as RustMultiplierRule, RatioPolicy, SupplyRecord as RustSupplyRecord,
    ValueMode,
};
use surge_distribution::{HistogramBin as RustHistogramBin, TimeRange};
use surge_ingestion::{Dataset, Upload};
use surge_session::{Commit, DashboardSession};

fn to_py_err(err: RustError) -> PyErr {
    match err {
        RustError::Io(e) => PyRuntimeError::new_err(e.to_string()),
        other => PyValueError::new_err(other.to_string()),
    }
}

fn mode_name(mode: ValueMode) -> &'static str {
    match mode {
        ValueMode::Price => "price",
        ValueMode::Coefficient => "coefficient",
        ValueMode::DemandOnly => "demand_only",
        ValueMode::SupplyOnly => "supply_only",
        ValueMode::Empty => "empty",
    }
}

fn parse_policy(name: &str) -> PyResult<RatioPolicy> {
    match name {
        "raw" => Ok(RatioPolicy::Raw),
        "log" => Ok(RatioPolicy::Log),
        "z_score" | "zscore" => Ok(RatioPolicy::ZScore),
        other => Err(PyValueError::new_err(format!(
            "unknown ratio policy {:?} (expected raw, log or z_score)",
            other
        ))),
    }
}

// ============================================================================
// Python-exposed Types
// ============================================================================

/// One demand occurrence.
#[pyclass]
#[derive(Clone)]
pub struct DemandEvent {
    #[pyo3(get, set)]
    pub ts_ms: i64,
    #[pyo3(get, set)]
    pub lat: f64,
    #[pyo3(get, set)]
    pub lng: f64,
}

#[pymethods]
impl DemandEvent {
    #[new]
    fn new(ts_ms: i64, lat: f64, lng: f64) -> Self {
        DemandEvent { ts_ms, lat, lng }
    }

    fn __repr__(&self) -> String {
        format!("DemandEvent(ts_ms={}, lat={}, lng={})", self.ts_ms, self.lat, self.lng)
    }
}

impl From<DemandEvent> for RustDemandEvent {
    fn from(e: DemandEvent) -> Self {
        RustDemandEvent {
            ts_ms: e.ts_ms,
            lat: e.lat,
            lng: e.lng,
        }
    }
}

/// One supply unit available over `[start_ms, end_ms]`.
#[pyclass]
#[derive(Clone)]
pub struct SupplyRecord {
    #[pyo3(get, set)]
    pub start_ms: i64,
    #[pyo3(get, set)]
    pub end_ms: i64,
    #[pyo3(get, set)]
    pub lat: f64,
    #[pyo3(get, set)]
    pub lng: f64,
}

#[pymethods]
impl SupplyRecord {
    #[new]
    fn new(start_ms: i64, end_ms: i64, lat: f64, lng: f64) -> Self {
        SupplyRecord {
            start_ms,
            end_ms,
            lat,
            lng,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "SupplyRecord(start_ms={}, end_ms={}, lat={}, lng={})",
            self.start_ms, self.end_ms, self.lat, self.lng
        )
    }
}

impl From<SupplyRecord> for RustSupplyRecord {
    fn from(s: SupplyRecord) -> Self {
        RustSupplyRecord {
            start_ms: s.start_ms,
            end_ms: s.end_ms,
            lat: s.lat,
            lng: s.lng,
        }
    }
}

/// Multiplier band: ratios at or above `min_ratio` get `multiplier`.
#[pyclass]
#[derive(Clone)]
pub struct MultiplierRule {
    #[pyo3(get, set)]
    pub min_ratio: f64,
    #[pyo3(get, set)]
    pub multiplier: f64,
}

#[pymethods]
impl MultiplierRule {
    #[new]
    fn new(min_ratio: f64, multiplier: f64) -> Self {
        MultiplierRule { min_ratio, multiplier }
    }

    fn __repr__(&self) -> String {
        format!("MultiplierRule(min_ratio={}, multiplier={})", self.min_ratio, self.multiplier)
    }
}

impl From<MultiplierRule> for RustMultiplierRule {
    fn from(r: MultiplierRule) -> Self {
        RustMultiplierRule::new(r.min_ratio, r.multiplier)
    }
}

/// Map cell: active, or a zero-valued halo neighbor.
#[pyclass]
#[derive(Clone)]
pub struct CellAggregate {
    #[pyo3(get)]
    pub cell_id: String,
    #[pyo3(get)]
    pub demand_count: u32,
    #[pyo3(get)]
    pub supply_count: u32,
    #[pyo3(get)]
    pub ratio: f64,
    #[pyo3(get)]
    pub multiplier: Option<f64>,
    #[pyo3(get)]
    pub final_price: f64,
    #[pyo3(get)]
    pub value: f64,
    #[pyo3(get)]
    pub active: bool,
    #[pyo3(get)]
    pub lat: Option<f64>,
    #[pyo3(get)]
    pub lng: Option<f64>,
}

#[pymethods]
impl CellAggregate {
    fn __repr__(&self) -> String {
        format!(
            "CellAggregate(cell_id={}, demand={}, supply={}, value={:.4}, active={})",
            self.cell_id, self.demand_count, self.supply_count, self.value, self.active
        )
    }
}

impl From<RustCellAggregate> for CellAggregate {
    fn from(c: RustCellAggregate) -> Self {
        CellAggregate {
            cell_id: c.cell_id.to_string(),
            demand_count: c.demand_count,
            supply_count: c.supply_count,
            ratio: c.ratio,
            multiplier: c.multiplier,
            final_price: c.final_price,
            value: c.value,
            active: c.active,
            lat: c.center.map(|p| p.lat),
            lng: c.center.map(|p| p.lng),
        }
    }
}

/// One value of the distribution population with its provenance.
#[pyclass]
#[derive(Clone)]
pub struct DistributionSample {
    #[pyo3(get)]
    pub value: f64,
    #[pyo3(get)]
    pub cell_id: String,
    #[pyo3(get)]
    pub ts_ms: i64,
}

impl From<RustDistributionSample> for DistributionSample {
    fn from(s: RustDistributionSample) -> Self {
        DistributionSample {
            value: s.value,
            cell_id: s.cell_id.to_string(),
            ts_ms: s.ts_ms,
        }
    }
}

/// Histogram bar with the samples behind it.
#[pyclass]
#[derive(Clone)]
pub struct HistogramBin {
    #[pyo3(get)]
    pub low: f64,
    #[pyo3(get)]
    pub high: f64,
    #[pyo3(get)]
    pub label: String,
    #[pyo3(get)]
    pub count: usize,
    #[pyo3(get)]
    pub samples: Vec<DistributionSample>,
}

#[pymethods]
impl HistogramBin {
    fn __repr__(&self) -> String {
        format!("HistogramBin(label={:?}, count={})", self.label, self.count)
    }
}

impl From<RustHistogramBin> for HistogramBin {
    fn from(b: RustHistogramBin) -> Self {
        HistogramBin {
            low: b.low,
            high: b.high,
            label: b.label,
            count: b.count,
            samples: b.samples.into_iter().map(|s| s.into()).collect(),
        }
    }
}

// ============================================================================
// Python-exposed Dashboard
// ============================================================================

/// One uploaded dataset plus its settings.
///
/// Setters edit a draft; `apply()` makes it current. `snapshot` and
/// `distribution` always use the applied settings.
#[pyclass]
pub struct Dashboard {
    inner: DashboardSession<H3Indexer>,
}

impl Dashboard {
    fn from_upload(upload: Upload) -> Self {
        let mut inner = DashboardSession::new(H3Indexer::new());
        inner.load_upload(upload);
        Dashboard { inner }
    }
}

#[pymethods]
impl Dashboard {
    #[new]
    #[pyo3(signature = (demand, supply, multipliers = Vec::new()))]
    fn new(
        demand: Vec<DemandEvent>,
        supply: Vec<SupplyRecord>,
        multipliers: Vec<MultiplierRule>,
    ) -> Self {
        let dataset = Dataset::new(
            demand.into_iter().map(|e| e.into()).collect(),
            supply.into_iter().map(|s| s.into()).collect(),
        );
        Self::from_upload(Upload {
            dataset,
            multipliers: multipliers.into_iter().map(|r| r.into()).collect(),
            stats: Default::default(),
        })
    }

    /// Load and validate a JSON upload file.
    #[staticmethod]
    fn from_json(path: &str) -> PyResult<Self> {
        surge_ingestion::load_json(path).map(Self::from_upload).map_err(to_py_err)
    }

    /// Validate a JSON upload held in memory.
    #[staticmethod]
    fn from_json_str(text: &str) -> PyResult<Self> {
        surge_ingestion::from_json_str(text)
            .map(Self::from_upload)
            .map_err(to_py_err)
    }

    fn set_resolution(&mut self, resolution: u8) {
        self.inner.draft_mut().grid.resolution = resolution;
    }

    fn set_lookback_minutes(&mut self, minutes: u32) {
        self.inner.draft_mut().window.lookback_minutes = minutes;
    }

    /// `"raw"`, `"log"` or `"z_score"`.
    fn set_policy(&mut self, policy: &str) -> PyResult<()> {
        self.inner.draft_mut().ratio.policy = parse_policy(policy)?;
        Ok(())
    }

    /// Base price, and optionally a replacement multiplier table.
    #[pyo3(signature = (base_price, multipliers = None))]
    fn set_pricing(&mut self, base_price: f64, multipliers: Option<Vec<MultiplierRule>>) {
        let pricing = &mut self.inner.draft_mut().pricing;
        pricing.base_price = base_price;
        if let Some(rules) = multipliers {
            pricing.multipliers = rules.into_iter().map(|r| r.into()).collect();
        }
    }

    /// Make the draft settings current. Returns the new generation.
    fn apply(&mut self) -> PyResult<u64> {
        self.inner.apply().map_err(to_py_err)
    }

    #[getter]
    fn is_dirty(&self) -> bool {
        self.inner.is_dirty()
    }

    #[getter]
    fn generation(&self) -> u64 {
        self.inner.generation()
    }

    /// `(first_ms, last_ms)` observed in the dataset, or `None`.
    #[getter]
    fn time_bounds(&self) -> Option<(i64, i64)> {
        self.inner.dataset().time_bounds()
    }

    /// Mode of the last computed map, or `None` before the first snapshot.
    #[getter]
    fn mode(&self) -> Option<&'static str> {
        self.inner.map().map(|s| mode_name(s.mode))
    }

    /// Active cells and their ring-1 halo at `ts_ms`.
    fn snapshot(&mut self, py: Python<'_>, ts_ms: i64) -> PyResult<Vec<CellAggregate>> {
        let run = self.inner.begin_map(ts_ms);
        let output = py.allow_threads(move || run.execute());
        if self.inner.commit_map(output) == Commit::Superseded {
            return Err(PyRuntimeError::new_err("map run was superseded"));
        }
        Ok(self
            .inner
            .map()
            .map(|s| s.cells.iter().cloned().map(|c| c.into()).collect())
            .unwrap_or_default())
    }

    /// Histogram of values swept over `[from_ms, to_ms]`.
    ///
    /// `step_minutes` and `bins` update the distribution settings only;
    /// other unapplied edits stay pending. Missing range ends default to the
    /// dataset bounds.
    #[pyo3(signature = (from_ms = None, to_ms = None, step_minutes = None, bins = None))]
    fn distribution(
        &mut self,
        py: Python<'_>,
        from_ms: Option<i64>,
        to_ms: Option<i64>,
        step_minutes: Option<u32>,
        bins: Option<usize>,
    ) -> PyResult<Vec<HistogramBin>> {
        if step_minutes.is_some() || bins.is_some() {
            self.inner
                .apply_distribution(|section| {
                    if let Some(step) = step_minutes {
                        section.step_minutes = step;
                    }
                    if let Some(n) = bins {
                        section.bin_count = n;
                    }
                })
                .map_err(to_py_err)?;
        }

        let range = match (from_ms, to_ms, self.inner.dataset().time_bounds()) {
            (None, None, _) => None,
            (from, to, Some((lo, hi))) => {
                Some(TimeRange::new(from.unwrap_or(lo), to.unwrap_or(hi)))
            }
            (_, _, None) => None,
        };

        let run = self.inner.begin_distribution(range);
        let output = py.allow_threads(move || run.execute());
        if self.inner.commit_distribution(output) == Commit::Superseded {
            return Err(PyRuntimeError::new_err("distribution run was superseded"));
        }
        Ok(self
            .inner
            .distribution()
            .map(|r| r.histogram.bins.iter().cloned().map(|b| b.into()).collect())
            .unwrap_or_default())
    }
}

// ============================================================================
// Module Definition
// ============================================================================

/// Surge Map Core - hex-grid demand/supply ratios for Python.
#[pymodule]
fn surge_map_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Types
    m.add_class::<DemandEvent>()?;
    m.add_class::<SupplyRecord>()?;
    m.add_class::<MultiplierRule>()?;
    m.add_class::<CellAggregate>()?;
    m.add_class::<DistributionSample>()?;
    m.add_class::<HistogramBin>()?;

    // Session
    m.add_class::<Dashboard>()?;

    Ok(())
}
