//! Deterministic square-grid indexer for tests.

use std::collections::HashSet;
use surge_core::{CellId, Coordinate, Error, HexIndexer, Result};

/// Cells are `step x step` degree squares, `step = 1 / 2^resolution`.
#[derive(Debug, Default)]
pub struct SquareGridIndexer {
    /// Cells whose ring lookup fails.
    pub failing_rings: HashSet<CellId>,
}

impl SquareGridIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failing_ring(mut self, cell: CellId) -> Self {
        self.failing_rings.insert(cell);
        self
    }

    fn key(res: u8, i: i64, j: i64) -> CellId {
        CellId::new(format!("{}:{}:{}", res, i, j))
    }

    fn parse(cell: &CellId) -> Result<(u8, i64, i64)> {
        let parts: Vec<&str> = cell.as_str().split(':').collect();
        let bad = || Error::hex_index(format!("bad cell {}", cell));
        if parts.len() != 3 {
            return Err(bad());
        }
        Ok((
            parts[0].parse().map_err(|_| bad())?,
            parts[1].parse().map_err(|_| bad())?,
            parts[2].parse().map_err(|_| bad())?,
        ))
    }

    fn step(res: u8) -> f64 {
        1.0 / (1u64 << res) as f64
    }
}

impl HexIndexer for SquareGridIndexer {
    fn cell_id_for(&self, lat: f64, lng: f64, resolution: u8) -> Result<CellId> {
        if !lat.is_finite() || !lng.is_finite() || resolution > 15 {
            return Err(Error::hex_index("out of range"));
        }
        let step = Self::step(resolution);
        Ok(Self::key(
            resolution,
            (lat / step).floor() as i64,
            (lng / step).floor() as i64,
        ))
    }

    fn center_of(&self, cell: &CellId) -> Result<Coordinate> {
        let (res, i, j) = Self::parse(cell)?;
        let step = Self::step(res);
        Ok(Coordinate {
            lat: (i as f64 + 0.5) * step,
            lng: (j as f64 + 0.5) * step,
        })
    }

    fn ring_neighbors(&self, cell: &CellId, radius: u32) -> Result<Vec<CellId>> {
        if self.failing_rings.contains(cell) {
            return Err(Error::hex_index("ring lookup failed"));
        }
        let (res, i, j) = Self::parse(cell)?;
        let r = radius as i64;
        let mut out = Vec::new();
        for di in -r..=r {
            for dj in -r..=r {
                if di.abs().max(dj.abs()) == r {
                    out.push(Self::key(res, i + di, j + dj));
                }
            }
        }
        Ok(out)
    }
}
