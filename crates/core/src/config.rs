//! Configuration structures for the surge-map system.

use crate::error::{Error, Result};
use crate::types::MultiplierRule;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Highest grid resolution the hex indexer accepts.
pub const MAX_RESOLUTION: u8 = 15;

/// Main configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hex grid configuration.
    pub grid: GridConfig,
    /// Demand lookback window.
    pub window: WindowConfig,
    /// Ratio normalization.
    pub ratio: RatioConfig,
    /// Multiplier table and base price.
    pub pricing: PricingConfig,
    /// Time sweep and histogram.
    pub distribution: DistributionConfig,
}

impl Config {
    /// Parse a configuration from JSON and validate it.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file (JSON).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check values the pipeline cannot work around.
    pub fn validate(&self) -> Result<()> {
        if self.grid.resolution > MAX_RESOLUTION {
            return Err(Error::config(format!(
                "grid resolution {} out of range 0..={}",
                self.grid.resolution, MAX_RESOLUTION
            )));
        }
        if self.distribution.step_minutes == 0 {
            return Err(Error::config("distribution step must be at least one minute"));
        }
        if !self.pricing.base_price.is_finite() {
            return Err(Error::config("base price must be finite"));
        }
        if let Some(rule) = self
            .pricing
            .multipliers
            .iter()
            .find(|r| !r.min_ratio.is_finite() || !r.multiplier.is_finite())
        {
            return Err(Error::config(format!(
                "multiplier rule has non-finite field: {:?}",
                rule
            )));
        }
        if let (Some(from), Some(to)) = (self.distribution.from_ms, self.distribution.to_ms) {
            if from > to {
                return Err(Error::config("distribution range starts after it ends"));
            }
        }
        Ok(())
    }
}

/// Hex grid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Grid resolution (0 = coarsest, 15 = finest).
    pub resolution: u8,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { resolution: 8 }
    }
}

/// Lookback window for demand events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Demand events within this many minutes before the instant are active.
    pub lookback_minutes: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            lookback_minutes: 30,
        }
    }
}

/// Ratio normalization policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioPolicy {
    /// `d / s`.
    #[default]
    Raw,
    /// `ln(d + 1) / ln(s + 1)`.
    Log,
    /// Raw ratio standardized against all cells in the snapshot.
    ZScore,
}

/// Ratio engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatioConfig {
    pub policy: RatioPolicy,
}

/// Pricing configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Base price; `<= 0` disables pricing.
    pub base_price: f64,
    /// Multiplier table, any order.
    pub multipliers: Vec<MultiplierRule>,
}

impl PricingConfig {
    /// Both a table and a positive base price are present.
    pub fn is_ready(&self) -> bool {
        !self.multipliers.is_empty() && self.base_price > 0.0
    }
}

/// Distribution sweep configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionConfig {
    /// Sampling step in minutes.
    pub step_minutes: u32,
    /// Requested histogram bins (clamped to 5..=60 when building).
    pub bin_count: usize,
    /// Sweep start; dataset minimum when unset.
    pub from_ms: Option<i64>,
    /// Sweep end; dataset maximum when unset.
    pub to_ms: Option<i64>,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            step_minutes: 15,
            bin_count: 20,
            from_ms: None,
            to_ms: None,
        }
    }
}
