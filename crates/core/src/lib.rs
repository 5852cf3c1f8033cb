//! Core types and configuration for the surge-map system.
//!
//! This crate provides shared types used across all other crates:
//! - Demand, supply and multiplier records
//! - Per-cell snapshot and distribution sample types
//! - Configuration structures
//! - The hex indexer seam and its H3 implementation
//! - Common error types

pub mod config;
pub mod error;
pub mod hex;
pub mod types;

pub use config::{Config, RatioPolicy};
pub use error::{Error, Result};
pub use hex::{H3Indexer, HexIndexer};
pub use types::*;
