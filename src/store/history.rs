//! Aggregate history keyed by (sensor type, location, window)

use std::collections::HashMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::{AggregatedData, AggregationWindow};
use crate::sensors::SensorType;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HistoryKey {
    pub sensor_type: SensorType,
    pub location: String,
    pub window: AggregationWindow,
}

impl HistoryKey {
    pub fn new(sensor_type: SensorType, location: &str, window: AggregationWindow) -> Self {
        Self {
            sensor_type,
            location: location.to_string(),
            window,
        }
    }

    pub fn of(aggregate: &AggregatedData) -> Self {
        Self::new(aggregate.sensor_type, &aggregate.location, aggregate.timeframe)
    }
}

/// Per-key aggregate sequences in arrival order (oldest first)
#[derive(Debug, Default)]
pub struct AggregateHistory {
    entries: HashMap<HistoryKey, Vec<AggregatedData>>,
}

impl AggregateHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an aggregate and return its key's full sequence, ending with it
    pub fn push(&mut self, aggregate: AggregatedData) -> &[AggregatedData] {
        let entries = self.entries.entry(HistoryKey::of(&aggregate)).or_default();
        entries.push(aggregate);
        entries.as_slice()
    }

    pub fn get(&self, key: &HistoryKey) -> Option<&[AggregatedData]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn latest(&self, key: &HistoryKey) -> Option<&AggregatedData> {
        self.entries.get(key).and_then(|e| e.last())
    }

    pub fn keys(&self) -> Vec<HistoryKey> {
        let mut keys: Vec<HistoryKey> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Total stored aggregates across all keys
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop aggregates stamped before `cutoff` and forget emptied keys.
    /// Returns the number of aggregates removed.
    pub fn prune_older_than(&mut self, cutoff: DateTime<Utc>) -> usize {
        let mut removed = 0;

        self.entries.retain(|_, entries| {
            let before = entries.len();
            entries.retain(|a| a.timestamp > cutoff);
            removed += before - entries.len();
            !entries.is_empty()
        });

        removed
    }
}
