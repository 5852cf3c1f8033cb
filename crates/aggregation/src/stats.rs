//! Single-pass population statistics.
//!
//! Welford's update: keeps count, running mean and the sum of squared
//! deviations from the running mean, so no second pass or large-sum
//! cancellation is needed.

/// Running mean and sample standard deviation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    sum_sq_dev: f64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observation.
    pub fn push(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.sum_sq_dev += delta * (x - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean of the observations (0 when empty).
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample standard deviation (`n - 1` denominator), 0 for fewer than two values.
    pub fn std_dev(&self) -> f64 {
        if self.count > 1 {
            (self.sum_sq_dev / (self.count - 1) as f64).sqrt()
        } else {
            0.0
        }
    }
}

impl FromIterator<f64> for RunningStats {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = RunningStats::new();
        for x in iter {
            stats.push(x);
        }
        stats
    }
}
