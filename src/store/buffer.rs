//! Append-only raw reading buffer keyed by (sensor type, location)

use std::collections::{BTreeSet, HashMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sensors::{SensorReading, SensorType};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BufferKey {
    pub sensor_type: SensorType,
    pub location: String,
}

impl BufferKey {
    pub fn new(sensor_type: SensorType, location: &str) -> Self {
        Self {
            sensor_type,
            location: location.to_string(),
        }
    }

    pub fn of(reading: &SensorReading) -> Self {
        Self::new(reading.sensor_type, &reading.location)
    }
}

/// Raw readings grouped by key, in submission order
#[derive(Debug, Default)]
pub struct ReadingBuffer {
    readings: HashMap<BufferKey, Vec<SensorReading>>,
    total: usize,
}

impl ReadingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, reading: SensorReading) {
        self.readings
            .entry(BufferKey::of(&reading))
            .or_default()
            .push(reading);
        self.total += 1;
    }

    pub fn get(&self, sensor_type: SensorType, location: &str) -> Option<&[SensorReading]> {
        self.readings
            .get(&BufferKey::new(sensor_type, location))
            .map(Vec::as_slice)
    }

    /// Keys currently holding readings, sorted
    pub fn keys(&self) -> Vec<BufferKey> {
        let mut keys: Vec<BufferKey> = self.readings.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn locations(&self) -> BTreeSet<String> {
        self.readings.keys().map(|k| k.location.clone()).collect()
    }

    /// Total buffered readings across all keys
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn key_count(&self) -> usize {
        self.readings.len()
    }

    /// Drop readings stamped before `cutoff` and forget emptied keys.
    /// Returns the number of readings removed.
    pub fn prune_older_than(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.total;

        self.readings.retain(|_, readings| {
            readings.retain(|r| r.timestamp > cutoff);
            !readings.is_empty()
        });

        self.total = self.readings.values().map(Vec::len).sum();
        before - self.total
    }
}
