//! Hexagonal grid indexing.
//!
//! The pipeline only talks to the grid through [`HexIndexer`]; [`H3Indexer`]
//! is the production implementation on top of `h3o`.

use crate::error::{Error, Result};
use crate::types::{CellId, Coordinate};
use h3o::{CellIndex, LatLng, Resolution};
use std::str::FromStr;

/// Pure cell indexing functions.
pub trait HexIndexer: Send + Sync {
    /// Cell containing the coordinate at the given resolution.
    fn cell_id_for(&self, lat: f64, lng: f64, resolution: u8) -> Result<CellId>;

    /// Center coordinate of a cell.
    fn center_of(&self, cell: &CellId) -> Result<Coordinate>;

    /// Cells at exactly `radius` grid steps from `cell`.
    fn ring_neighbors(&self, cell: &CellId, radius: u32) -> Result<Vec<CellId>>;
}

/// H3 indexer backed by `h3o`.
#[derive(Debug, Clone, Copy, Default)]
pub struct H3Indexer;

impl H3Indexer {
    pub fn new() -> Self {
        H3Indexer
    }

    fn parse(cell: &CellId) -> Result<CellIndex> {
        CellIndex::from_str(cell.as_str())
            .map_err(|e| Error::hex_index(format!("invalid cell {}: {}", cell, e)))
    }
}

impl HexIndexer for H3Indexer {
    fn cell_id_for(&self, lat: f64, lng: f64, resolution: u8) -> Result<CellId> {
        let res = Resolution::try_from(resolution)
            .map_err(|e| Error::hex_index(format!("resolution {}: {}", resolution, e)))?;
        let ll = LatLng::new(lat, lng)
            .map_err(|e| Error::hex_index(format!("coordinate ({}, {}): {}", lat, lng, e)))?;
        Ok(CellId::new(ll.to_cell(res).to_string()))
    }

    fn center_of(&self, cell: &CellId) -> Result<Coordinate> {
        let ll = LatLng::from(Self::parse(cell)?);
        Ok(Coordinate {
            lat: ll.lat(),
            lng: ll.lng(),
        })
    }

    fn ring_neighbors(&self, cell: &CellId, radius: u32) -> Result<Vec<CellId>> {
        let index = Self::parse(cell)?;
        // Distances from the disk stay exact around pentagons, unlike the fast ring.
        let disk: Vec<(CellIndex, u32)> = index.grid_disk_distances(radius);
        Ok(disk
            .into_iter()
            .filter(|&(_, d)| d == radius)
            .map(|(c, _)| CellId::new(c.to_string()))
            .collect())
    }
}
