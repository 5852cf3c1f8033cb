//! Ratio to price multiplier lookup.
//!
//! A multiplier table is a step function. Rules may arrive in any order;
//! they are ordered by descending `min_ratio` before lookup and the first
//! rule at or below the ratio wins. Ratios under every threshold get the
//! lowest rule, and an empty table is the identity (multiplier 1).

use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use surge_core::config::PricingConfig;
use surge_core::MultiplierRule;

fn sorted_desc(table: &[MultiplierRule]) -> Vec<MultiplierRule> {
    let mut rules = table.to_vec();
    rules.sort_by_key(|r| Reverse(OrderedFloat(r.min_ratio)));
    rules
}

fn lookup(ratio: f64, rules_desc: &[MultiplierRule]) -> f64 {
    match rules_desc.iter().find(|r| r.min_ratio <= ratio) {
        Some(rule) => rule.multiplier,
        None => rules_desc.last().map_or(1.0, |r| r.multiplier),
    }
}

/// Resolve the multiplier for `ratio` from an unsorted table.
pub fn resolve_multiplier(ratio: f64, table: &[MultiplierRule]) -> f64 {
    lookup(ratio, &sorted_desc(table))
}

/// Multiplier table plus base price, ordered once and reused for every
/// cell of a snapshot.
#[derive(Debug, Clone)]
pub struct PricingResolver {
    rules_desc: Vec<MultiplierRule>,
    base_price: f64,
}

impl PricingResolver {
    pub fn new(table: &[MultiplierRule], base_price: f64) -> Self {
        Self {
            rules_desc: sorted_desc(table),
            base_price,
        }
    }

    /// `None` when pricing is not configured (empty table or `base_price <= 0`).
    pub fn from_config(config: &PricingConfig) -> Option<Self> {
        config
            .is_ready()
            .then(|| Self::new(&config.multipliers, config.base_price))
    }

    pub fn multiplier(&self, ratio: f64) -> f64 {
        lookup(ratio, &self.rules_desc)
    }

    /// `multiplier(ratio) * base_price`.
    pub fn price(&self, ratio: f64) -> f64 {
        self.multiplier(ratio) * self.base_price
    }

    pub fn base_price(&self) -> f64 {
        self.base_price
    }

    /// Rules in lookup order.
    pub fn rules(&self) -> &[MultiplierRule] {
        &self.rules_desc
    }
}
