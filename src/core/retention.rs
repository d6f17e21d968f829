// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fogbarn

//! Retention - periodic pruning of raw readings, aggregates and anomalies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RetentionConfig;
use crate::store::{AggregateHistory, AnomalyLog, ReadingBuffer};

/// What one retention pass removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionReport {
    pub readings_removed: usize,
    pub aggregates_removed: usize,
    pub anomalies_removed: usize,
}

impl RetentionReport {
    pub fn total(&self) -> usize {
        self.readings_removed + self.aggregates_removed + self.anomalies_removed
    }
}

/// Applies age and size limits to the engine's stores
#[derive(Debug, Clone)]
pub struct RetentionManager {
    config: RetentionConfig,
}

impl RetentionManager {
    pub fn new(config: RetentionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetentionConfig {
        &self.config
    }

    pub fn prune(
        &self,
        buffer: &mut ReadingBuffer,
        history: &mut AggregateHistory,
        anomalies: &mut AnomalyLog,
        now: DateTime<Utc>,
    ) -> RetentionReport {
        RetentionReport {
            readings_removed: buffer.prune_older_than(now - self.config.raw_max_age()),
            aggregates_removed: history.prune_older_than(now - self.config.aggregate_max_age()),
            anomalies_removed: anomalies.truncate_to_recent(self.config.max_anomalies),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AggregatedData, AggregationWindow, Anomaly, AnomalyType, Severity};
    use crate::sensors::{SensorReading, SensorType};
    use chrono::Duration;

    fn anomaly(timestamp: DateTime<Utc>) -> Anomaly {
        Anomaly {
            anomaly_id: uuid::Uuid::new_v4().to_string(),
            sensor_type: SensorType::Co2Level,
            location: "tropical_zone".to_string(),
            anomaly_type: AnomalyType::HighVariance,
            severity: Severity::Warning,
            message: String::new(),
            timestamp,
            value: 900.0,
            expected_range: (300.0, 1500.0),
        }
    }

    fn aggregate(timestamp: DateTime<Utc>) -> AggregatedData {
        AggregatedData {
            timeframe: AggregationWindow::FiveMinutes,
            sensor_type: SensorType::Co2Level,
            average: 900.0,
            min: 900.0,
            max: 900.0,
            count: 1,
            std_dev: 0.0,
            timestamp,
            quality_score: 1.0,
            location: "tropical_zone".to_string(),
        }
    }

    #[test]
    fn test_prune_applies_every_limit() {
        let now = Utc::now();
        let manager = RetentionManager::new(RetentionConfig::default());

        let mut buffer = ReadingBuffer::new();
        buffer.push(SensorReading::new("n", SensorType::Co2Level, 900.0, "tropical_zone").at(now - Duration::minutes(119)));
        buffer.push(SensorReading::new("n", SensorType::Co2Level, 900.0, "tropical_zone").at(now - Duration::minutes(121)));

        let mut history = AggregateHistory::new();
        history.push(aggregate(now - Duration::hours(23)));
        history.push(aggregate(now - Duration::hours(25)));

        let mut anomalies = AnomalyLog::new();
        for i in 0..105 {
            anomalies.push(anomaly(now - Duration::seconds(i)));
        }

        let report = manager.prune(&mut buffer, &mut history, &mut anomalies, now);

        assert_eq!(report.readings_removed, 1);
        assert_eq!(report.aggregates_removed, 1);
        assert_eq!(report.anomalies_removed, 5);
        assert_eq!(report.total(), 7);
        assert_eq!(buffer.len(), 1);
        assert_eq!(history.len(), 1);
        assert_eq!(anomalies.len(), 100);
    }

    #[test]
    fn test_prune_empty_stores() {
        let manager = RetentionManager::new(RetentionConfig::default());
        let report = manager.prune(
            &mut ReadingBuffer::new(),
            &mut AggregateHistory::new(),
            &mut AnomalyLog::new(),
            Utc::now(),
        );
        assert_eq!(report, RetentionReport::default());
    }
}
