//! Anomaly detection - immediate range checks and aggregate-level rules

use std::fmt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AggregatedData;
use crate::config::AnomalyConfig;
use crate::sensors::{SensorReading, SensorType};

/// Range reported for sensor types without a calibrated range
pub const FALLBACK_RANGE: (f64, f64) = (0.0, 100.0);

/// Detected anomaly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub anomaly_id: String,
    pub sensor_type: SensorType,
    pub location: String,
    pub anomaly_type: AnomalyType,
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub expected_range: (f64, f64),
}

impl Anomaly {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyType {
    OutOfRange,         // Single reading outside the calibrated range
    HighVariance,       // Window spread large relative to its mean
    RapidChange,        // Average moving too fast between aggregates
    SustainedTrend,     // Strictly monotonic run of averages
}

impl AnomalyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyType::OutOfRange => "out_of_range",
            AnomalyType::HighVariance => "high_variance",
            AnomalyType::RapidChange => "rapid_change",
            AnomalyType::SustainedTrend => "sustained_trend",
        }
    }
}

impl fmt::Display for AnomalyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    Increasing,
    Decreasing,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TrendDirection::Increasing => "increasing",
            TrendDirection::Decreasing => "decreasing",
        })
    }
}

/// A rule hit before it is stamped into an `Anomaly`
#[derive(Debug, Clone, PartialEq)]
struct Finding {
    anomaly_type: AnomalyType,
    severity: Severity,
    message: String,
}

/// Rule-based anomaly detector
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    config: AnomalyConfig,
}

impl AnomalyDetector {
    pub fn new(config: AnomalyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnomalyConfig {
        &self.config
    }

    /// Immediate out-of-range check for a freshly submitted reading
    pub fn check_reading(&self, reading: &SensorReading, now: DateTime<Utc>) -> Option<Anomaly> {
        let (lo, hi) = reading.sensor_type.expected_range()?;

        if reading.value >= lo && reading.value <= hi {
            return None;
        }

        let midpoint = (lo + hi) / 2.0;
        let severity = if (reading.value - midpoint).abs() > self.config.critical_distance {
            Severity::Critical
        } else {
            Severity::Warning
        };

        Some(Anomaly {
            anomaly_id: new_anomaly_id(),
            sensor_type: reading.sensor_type,
            location: reading.location.clone(),
            anomaly_type: AnomalyType::OutOfRange,
            severity,
            message: format!(
                "{} out of range: {:.1} (expected {:.1}-{:.1})",
                reading.sensor_type, reading.value, lo, hi
            ),
            timestamp: now,
            value: reading.value,
            expected_range: (lo, hi),
        })
    }

    /// Variance, rate-of-change and trend rules for a freshly stored aggregate.
    ///
    /// `history` is the stored sequence for the aggregate's key in arrival
    /// order, ending with `aggregate` itself.
    pub fn check_aggregate(&self, aggregate: &AggregatedData, history: &[AggregatedData]) -> Vec<Anomaly> {
        let findings = [
            self.detect_high_variance(aggregate),
            self.detect_rate_of_change(aggregate, history),
            self.detect_trend(aggregate, history),
        ];

        let expected_range = aggregate
            .sensor_type
            .expected_range()
            .unwrap_or(FALLBACK_RANGE);

        findings
            .into_iter()
            .flatten()
            .map(|finding| Anomaly {
                anomaly_id: new_anomaly_id(),
                sensor_type: aggregate.sensor_type,
                location: aggregate.location.clone(),
                anomaly_type: finding.anomaly_type,
                severity: finding.severity,
                message: finding.message,
                timestamp: aggregate.timestamp,
                value: aggregate.average,
                expected_range,
            })
            .collect()
    }

    /// std_dev above a fraction of |average|. Skipped for near-zero averages,
    /// where the ratio is meaningless.
    fn detect_high_variance(&self, aggregate: &AggregatedData) -> Option<Finding> {
        let magnitude = aggregate.average.abs();
        if magnitude < self.config.min_variance_average {
            return None;
        }

        if aggregate.std_dev > magnitude * self.config.variance_ratio {
            Some(Finding {
                anomaly_type: AnomalyType::HighVariance,
                severity: Severity::Warning,
                message: format!("High variance detected in {} readings", aggregate.sensor_type),
            })
        } else {
            None
        }
    }

    fn detect_rate_of_change(&self, aggregate: &AggregatedData, history: &[AggregatedData]) -> Option<Finding> {
        if history.len() < 2 {
            return None;
        }
        let previous = &history[history.len() - 2];

        let minutes = (aggregate.timestamp - previous.timestamp).num_milliseconds() as f64 / 60_000.0;
        if minutes <= 0.0 {
            return None;
        }

        let rate = (aggregate.average - previous.average).abs() / minutes;
        if rate > self.config.rate_of_change_per_min {
            Some(Finding {
                anomaly_type: AnomalyType::RapidChange,
                severity: Severity::Warning,
                message: format!("Rapid change in {}: {:.1}/min", aggregate.sensor_type, rate),
            })
        } else {
            None
        }
    }

    fn detect_trend(&self, aggregate: &AggregatedData, history: &[AggregatedData]) -> Option<Finding> {
        let window = self.config.trend_window;
        if window < 2 || history.len() < window {
            return None;
        }

        let averages: Vec<f64> = history[history.len() - window..]
            .iter()
            .map(|a| a.average)
            .collect();

        let direction = trend_direction(&averages)?;

        Some(Finding {
            anomaly_type: AnomalyType::SustainedTrend,
            severity: Severity::Info,
            message: format!("Sustained {} trend in {}", direction, aggregate.sensor_type),
        })
    }
}

/// Direction of a strictly monotonic sequence, `None` otherwise
pub fn trend_direction(values: &[f64]) -> Option<TrendDirection> {
    if values.len() < 2 {
        return None;
    }

    let increasing = values.windows(2).all(|w| w[0] < w[1]);
    let decreasing = values.windows(2).all(|w| w[0] > w[1]);

    if !(increasing || decreasing) {
        return None;
    }

    let (first, last) = (values[0], values[values.len() - 1]);
    if last > first {
        Some(TrendDirection::Increasing)
    } else {
        Some(TrendDirection::Decreasing)
    }
}

fn new_anomaly_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
