//! Window statistics - quality-weighted mean, extrema and sample deviation

use serde::{Deserialize, Serialize};

/// Statistical summary of one window of weighted samples
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticalSummary {
    pub count: usize,
    pub mean: f64,
    pub weighted_mean: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub variance: f64,
    pub std_dev: f64,
    pub mean_weight: f64,
    pub coefficient_of_variation: f64,
}

/// Statistical analyzer
#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticalAnalyzer;

impl StatisticalAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Summarize `(value, weight)` samples. Returns `None` for an empty window.
    pub fn summarize(&self, samples: &[(f64, f64)]) -> Option<StatisticalSummary> {
        if samples.is_empty() {
            return None;
        }

        let count = samples.len();
        let n = count as f64;
        let mean = samples.iter().map(|&(v, _)| v).sum::<f64>() / n;

        let min = samples.iter().map(|&(v, _)| v).fold(f64::INFINITY, f64::min);
        let max = samples.iter().map(|&(v, _)| v).fold(f64::NEG_INFINITY, f64::max);

        let variance = self.sample_variance(samples.iter().map(|&(v, _)| v), mean, count);
        let std_dev = variance.sqrt();

        let coefficient_of_variation = if mean.abs() > 1e-10 {
            std_dev / mean.abs()
        } else {
            0.0
        };

        Some(StatisticalSummary {
            count,
            mean,
            weighted_mean: self.weighted_mean(samples),
            min,
            max,
            range: max - min,
            variance,
            std_dev,
            mean_weight: samples.iter().map(|&(_, w)| w).sum::<f64>() / n,
            coefficient_of_variation,
        })
    }

    /// Σ(v·w) / Σw, falling back to the plain mean when the weights sum to zero
    pub fn weighted_mean(&self, samples: &[(f64, f64)]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }

        let total_weight: f64 = samples.iter().map(|&(_, w)| w).sum();
        if total_weight > 0.0 {
            samples.iter().map(|&(v, w)| v * w).sum::<f64>() / total_weight
        } else {
            samples.iter().map(|&(v, _)| v).sum::<f64>() / samples.len() as f64
        }
    }

    /// Sample standard deviation (n - 1 divisor); zero for fewer than two values
    pub fn std_dev(&self, data: &[f64]) -> f64 {
        if data.len() < 2 {
            return 0.0;
        }
        let mean = data.iter().sum::<f64>() / data.len() as f64;
        self.sample_variance(data.iter().copied(), mean, data.len()).sqrt()
    }

    fn sample_variance(&self, values: impl Iterator<Item = f64>, mean: f64, count: usize) -> f64 {
        if count < 2 {
            return 0.0;
        }
        values.map(|x| (x - mean).powi(2)).sum::<f64>() / (count - 1) as f64
    }
}
