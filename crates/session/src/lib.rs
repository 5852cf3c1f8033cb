//! Interactive session for the surge map.
//!
//! This crate provides:
//! - Draft and applied settings with an explicit apply step
//! - Map and distribution runs over immutable inputs
//! - Generation-guarded commits so stale results are dropped
//! - Async recalculation on tokio's blocking pool

pub mod dashboard;
pub mod run;

pub use dashboard::DashboardSession;
pub use run::{Commit, DistributionRun, MapRun, RunOutput};
