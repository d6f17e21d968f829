// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fogbarn

//! Configuration module

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::analysis::AggregationWindow;
use crate::error::{FogError, FogResult};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application name
    pub app_name: String,

    /// Log level
    pub log_level: String,

    /// Enable demo mode (simulated greenhouse devices)
    pub demo_mode: bool,

    /// Aggregation schedule and reporting windows
    pub aggregation: AggregationConfig,

    /// Anomaly rule thresholds
    pub anomaly: AnomalyConfig,

    /// Retention schedule and limits
    pub retention: RetentionConfig,

    /// Demo simulator settings
    pub demo: DemoConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "FogBarn".to_string(),
            log_level: "info".to_string(),
            demo_mode: false,
            aggregation: AggregationConfig::default(),
            anomaly: AnomalyConfig::default(),
            retention: RetentionConfig::default(),
            demo: DemoConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("fogbarn"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> FogResult<()> {
        let invalid = |msg: &str| Err(FogError::InvalidConfig(msg.to_string()));

        if self.aggregation.interval_secs == 0 {
            return invalid("aggregation.interval_secs must be positive");
        }
        if self.retention.interval_secs == 0 {
            return invalid("retention.interval_secs must be positive");
        }
        if self.retention.max_anomalies == 0 {
            return invalid("retention.max_anomalies must be positive");
        }
        if self.retention.raw_max_age_secs == 0 || self.retention.aggregate_max_age_secs == 0 {
            return invalid("retention ages must be positive");
        }
        if self.retention.raw_max_age_secs > MAX_RETENTION_SECS
            || self.retention.aggregate_max_age_secs > MAX_RETENTION_SECS
        {
            return invalid("retention ages must not exceed ten years");
        }
        if self.anomaly.variance_ratio <= 0.0 || self.anomaly.rate_of_change_per_min <= 0.0 {
            return invalid("anomaly thresholds must be positive");
        }
        if self.anomaly.critical_distance < 0.0 || self.anomaly.min_variance_average < 0.0 {
            return invalid("anomaly distances must not be negative");
        }
        if self.anomaly.trend_window < 2 {
            return invalid("anomaly.trend_window must be at least 2");
        }
        if !(0.0..=1.0).contains(&self.demo.offline_probability) {
            return invalid("demo.offline_probability must be within [0, 1]");
        }
        Ok(())
    }
}

/// Aggregation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Seconds between aggregation ticks
    pub interval_secs: u64,

    /// Windows reported by live metric queries
    pub dashboard_windows: Vec<AggregationWindow>,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            dashboard_windows: vec![
                AggregationWindow::OneMinute,
                AggregationWindow::FiveMinutes,
                AggregationWindow::FifteenMinutes,
            ],
        }
    }
}

impl AggregationConfig {
    /// Tick period, never shorter than one second
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

/// Anomaly detection thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// High variance when std_dev exceeds |average| times this ratio
    pub variance_ratio: f64,

    /// Rapid change threshold in units per minute
    pub rate_of_change_per_min: f64,

    /// Number of aggregates that must move monotonically
    pub trend_window: usize,

    /// Out-of-range readings farther than this from the range midpoint are critical
    pub critical_distance: f64,

    /// Variance rule is skipped when |average| is below this
    pub min_variance_average: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            variance_ratio: 0.3,
            rate_of_change_per_min: 5.0,
            trend_window: 5,
            critical_distance: 10.0,
            min_variance_average: 1e-6,
        }
    }
}

/// Retention configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Seconds between retention passes
    pub interval_secs: u64,

    /// Raw readings older than this are dropped
    pub raw_max_age_secs: u64,

    /// Aggregates older than this are dropped
    pub aggregate_max_age_secs: u64,

    /// Anomaly history is truncated to the most recent N
    pub max_anomalies: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,             // 5 minutes
            raw_max_age_secs: 7200,         // 2 hours
            aggregate_max_age_secs: 86400,  // 24 hours
            max_anomalies: 100,
        }
    }
}

impl RetentionConfig {
    /// Tick period, never shorter than one second
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn raw_max_age(&self) -> chrono::Duration {
        age(self.raw_max_age_secs)
    }

    pub fn aggregate_max_age(&self) -> chrono::Duration {
        age(self.aggregate_max_age_secs)
    }
}

/// Longest retention age accepted, ten years
pub const MAX_RETENTION_SECS: u64 = 10 * 365 * 24 * 3600;

fn age(secs: u64) -> chrono::Duration {
    chrono::Duration::seconds(secs.min(MAX_RETENTION_SECS) as i64)
}

/// Demo simulator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Seconds between simulated device passes
    pub interval_secs: u64,

    /// Chance a device drops offline for a pass
    pub offline_probability: f64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            offline_probability: 0.05,
        }
    }
}

impl DemoConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}
