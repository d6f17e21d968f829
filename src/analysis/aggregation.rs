//! Multi-window aggregation of raw readings

use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::StatisticalAnalyzer;
use crate::error::FogError;
use crate::sensors::{SensorReading, SensorType};

/// Trailing time spans readings are summarized over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AggregationWindow {
    #[serde(rename = "1min")]
    OneMinute,
    #[serde(rename = "5min")]
    FiveMinutes,
    #[serde(rename = "15min")]
    FifteenMinutes,
    #[serde(rename = "1h")]
    OneHour,
}

impl AggregationWindow {
    pub const ALL: [AggregationWindow; 4] = [
        AggregationWindow::OneMinute,
        AggregationWindow::FiveMinutes,
        AggregationWindow::FifteenMinutes,
        AggregationWindow::OneHour,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            AggregationWindow::OneMinute => "1min",
            AggregationWindow::FiveMinutes => "5min",
            AggregationWindow::FifteenMinutes => "15min",
            AggregationWindow::OneHour => "1h",
        }
    }

    pub fn seconds(&self) -> i64 {
        match self {
            AggregationWindow::OneMinute => 60,
            AggregationWindow::FiveMinutes => 300,
            AggregationWindow::FifteenMinutes => 900,
            AggregationWindow::OneHour => 3600,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::seconds(self.seconds())
    }

    /// Whether `timestamp` lies in `[now - window, now]`
    pub fn contains(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        timestamp <= now && now - timestamp <= self.duration()
    }
}

impl fmt::Display for AggregationWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AggregationWindow {
    type Err = FogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AggregationWindow::ALL
            .iter()
            .copied()
            .find(|w| w.label() == s)
            .ok_or_else(|| FogError::UnknownWindow(s.to_string()))
    }
}

/// Statistical summary of one (sensor type, location, window) at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedData {
    pub timeframe: AggregationWindow,
    pub sensor_type: SensorType,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
    pub std_dev: f64,
    pub timestamp: DateTime<Utc>,
    pub quality_score: f64,
    pub location: String,
}

impl AggregatedData {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Rolls buffered readings up into windowed aggregates
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator {
    stats: StatisticalAnalyzer,
}

impl Aggregator {
    pub fn new() -> Self {
        Self { stats: StatisticalAnalyzer::new() }
    }

    /// Aggregate the readings of one buffer key that fall inside `window`.
    ///
    /// `now` is the tick's reference instant; every window evaluated during a
    /// pass must receive the same value. Returns `None` when no reading falls
    /// inside the window.
    pub fn aggregate(
        &self,
        sensor_type: SensorType,
        location: &str,
        readings: &[SensorReading],
        window: AggregationWindow,
        now: DateTime<Utc>,
    ) -> Option<AggregatedData> {
        let samples: Vec<(f64, f64)> = readings
            .iter()
            .filter(|r| window.contains(r.timestamp, now))
            .map(|r| (r.value, r.quality))
            .collect();

        let summary = self.stats.summarize(&samples)?;

        Some(AggregatedData {
            timeframe: window,
            sensor_type,
            average: summary.weighted_mean,
            min: summary.min,
            max: summary.max,
            count: summary.count,
            std_dev: summary.std_dev,
            timestamp: now,
            quality_score: summary.mean_weight,
            location: location.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn reading(value: f64, quality: f64, age_secs: i64, now: DateTime<Utc>) -> SensorReading {
        SensorReading::new("node", SensorType::Humidity, value, "north_wing")
            .at(now - Duration::seconds(age_secs))
            .with_quality(quality)
    }

    #[test]
    fn test_window_labels() {
        for window in AggregationWindow::ALL {
            assert_eq!(window.label().parse::<AggregationWindow>().unwrap(), window);
        }
        assert!("2h".parse::<AggregationWindow>().is_err());
        assert_eq!(AggregationWindow::FifteenMinutes.seconds(), 900);
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let now = Utc::now();
        let window = AggregationWindow::OneMinute;
        assert!(window.contains(now, now));
        assert!(window.contains(now - Duration::seconds(60), now));
        assert!(!window.contains(now - Duration::seconds(61), now));
        assert!(!window.contains(now + Duration::seconds(1), now));
    }

    #[test]
    fn test_constant_readings() {
        let now = Utc::now();
        let readings: Vec<_> = (0..4).map(|i| reading(10.0, 1.0, i * 5, now)).collect();

        let agg = Aggregator::new()
            .aggregate(SensorType::Humidity, "north_wing", &readings, AggregationWindow::OneMinute, now)
            .unwrap();

        assert_eq!(agg.average, 10.0);
        assert_eq!(agg.min, 10.0);
        assert_eq!(agg.max, 10.0);
        assert_eq!(agg.count, 4);
        assert_eq!(agg.std_dev, 0.0);
        assert_eq!(agg.timestamp, now);
        assert_eq!(agg.timeframe, AggregationWindow::OneMinute);
    }

    #[test]
    fn test_windows_select_different_subsets() {
        let now = Utc::now();
        let readings = vec![
            reading(40.0, 1.0, 30, now),
            reading(50.0, 1.0, 200, now),
            reading(60.0, 1.0, 3000, now),
            reading(70.0, 1.0, 5000, now),
        ];
        let aggregator = Aggregator::new();
        let count = |w| {
            aggregator
                .aggregate(SensorType::Humidity, "north_wing", &readings, w, now)
                .map(|a| a.count)
        };

        assert_eq!(count(AggregationWindow::OneMinute), Some(1));
        assert_eq!(count(AggregationWindow::FiveMinutes), Some(2));
        assert_eq!(count(AggregationWindow::FifteenMinutes), Some(2));
        assert_eq!(count(AggregationWindow::OneHour), Some(3));
    }

    #[test]
    fn test_empty_window_yields_nothing() {
        let now = Utc::now();
        let readings = vec![reading(40.0, 1.0, 600, now)];
        let agg = Aggregator::new()
            .aggregate(SensorType::Humidity, "north_wing", &readings, AggregationWindow::OneMinute, now);
        assert!(agg.is_none());
    }

    #[test]
    fn test_quality_score_is_unweighted_mean() {
        let now = Utc::now();
        let readings = vec![reading(10.0, 1.0, 1, now), reading(20.0, 0.5, 2, now)];

        let agg = Aggregator::new()
            .aggregate(SensorType::Humidity, "north_wing", &readings, AggregationWindow::OneMinute, now)
            .unwrap();

        assert_relative_eq!(agg.quality_score, 0.75);
        assert_relative_eq!(agg.average, 20.0 / 1.5);
    }

    #[test]
    fn test_zero_quality_falls_back_to_plain_mean() {
        let now = Utc::now();
        let readings = vec![reading(10.0, 0.0, 1, now), reading(30.0, 0.0, 2, now)];

        let agg = Aggregator::new()
            .aggregate(SensorType::Humidity, "north_wing", &readings, AggregationWindow::OneMinute, now)
            .unwrap();

        assert_relative_eq!(agg.average, 20.0);
        assert_eq!(agg.quality_score, 0.0);
    }

    #[test]
    fn test_aggregate_json() {
        let now = Utc::now();
        let readings = vec![reading(10.0, 1.0, 1, now)];
        let agg = Aggregator::new()
            .aggregate(SensorType::Co2Level, "tropical_zone", &readings, AggregationWindow::FiveMinutes, now)
            .unwrap();

        let json = agg.to_json().unwrap();
        assert!(json.contains("\"timeframe\":\"5min\""));
        assert!(json.contains("\"sensor_type\":\"co2_level\""));
    }
}
