//! Data ingestion boundary for the surge-map system.
//!
//! This crate handles:
//! - Row validation (non-finite and placeholder coordinates, inverted windows)
//! - Immutable datasets with global presence and time bounds
//! - JSON upload loading

pub mod dataset;
pub mod validator;

pub use dataset::{from_json_str, load_json, Dataset, DatasetFile, Upload};
pub use validator::{DemandRow, Rejection, RowValidator, SupplyRow, ValidationStats};
