// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fogbarn

//! Sensor types, quality grades and raw readings

use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FogError;

/// Sensor types reported by greenhouse edge devices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorType {
    Temperature,        // Celsius
    Humidity,           // Percentage
    SoilMoisture,       // Percentage
    LightIntensity,     // Lux
    Co2Level,           // PPM
    SoilPh,             // pH
}

impl SensorType {
    /// Every sensor type, in declaration order
    pub const ALL: [SensorType; 6] = [
        SensorType::Temperature,
        SensorType::Humidity,
        SensorType::SoilMoisture,
        SensorType::LightIntensity,
        SensorType::Co2Level,
        SensorType::SoilPh,
    ];

    /// Wire name of the sensor type
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorType::Temperature => "temperature",
            SensorType::Humidity => "humidity",
            SensorType::SoilMoisture => "soil_moisture",
            SensorType::LightIntensity => "light_intensity",
            SensorType::Co2Level => "co2_level",
            SensorType::SoilPh => "soil_ph",
        }
    }

    /// Calibrated operating range `(min, max)` for the sensor type.
    ///
    /// This is a domain constant used by the out-of-range rule, not a
    /// validation bound: readings outside it are still accepted and buffered.
    pub fn expected_range(&self) -> Option<(f64, f64)> {
        let range = match self {
            SensorType::Temperature => (15.0, 35.0),
            SensorType::Humidity => (30.0, 80.0),
            SensorType::SoilMoisture => (20.0, 80.0),
            SensorType::LightIntensity => (0.0, 1000.0),
            SensorType::Co2Level => (300.0, 1500.0),
            SensorType::SoilPh => (5.5, 7.5),
        };
        Some(range)
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorType {
    type Err = FogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SensorType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| FogError::UnknownSensorType(s.to_string()))
    }
}

/// Coarse quality grades an edge device can attach to a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQuality {
    Excellent,
    Good,
    Fair,
    Poor,
    Unreliable,
}

impl DataQuality {
    pub fn score(&self) -> f64 {
        match self {
            DataQuality::Excellent => 1.0,
            DataQuality::Good => 0.8,
            DataQuality::Fair => 0.6,
            DataQuality::Poor => 0.4,
            DataQuality::Unreliable => 0.2,
        }
    }

    /// Highest grade whose score does not exceed `score`
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 1.0 => DataQuality::Excellent,
            s if s >= 0.8 => DataQuality::Good,
            s if s >= 0.6 => DataQuality::Fair,
            s if s >= 0.4 => DataQuality::Poor,
            _ => DataQuality::Unreliable,
        }
    }
}

/// A single raw measurement submitted by an edge device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub device_id: String,
    pub sensor_type: SensorType,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub location: String,
    pub quality: f64,  // 0-1 reliability weight
    pub battery_level: Option<f64>,
    pub signal_strength: Option<f64>,
}

impl SensorReading {
    /// Reading stamped with the current time and full quality
    pub fn new(device_id: &str, sensor_type: SensorType, value: f64, location: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            sensor_type,
            value,
            timestamp: Utc::now(),
            location: location.to_string(),
            quality: 1.0,
            battery_level: None,
            signal_strength: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Set the quality weight, clamped into `[0, 1]`
    pub fn with_quality(mut self, quality: f64) -> Self {
        self.quality = clamp_quality(quality);
        self
    }

    /// Re-apply the quality bounds to a reading built field by field or
    /// deserialized from a transport. NaN counts as zero weight.
    pub fn normalized(mut self) -> Self {
        self.quality = clamp_quality(self.quality);
        self
    }

    pub fn with_grade(self, grade: DataQuality) -> Self {
        self.with_quality(grade.score())
    }

    pub fn with_battery(mut self, battery_level: f64) -> Self {
        self.battery_level = Some(battery_level);
        self
    }

    pub fn with_signal(mut self, signal_strength: f64) -> Self {
        self.signal_strength = Some(signal_strength);
        self
    }

    pub fn grade(&self) -> DataQuality {
        DataQuality::from_score(self.quality)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

fn clamp_quality(quality: f64) -> f64 {
    if quality.is_nan() {
        0.0
    } else {
        quality.clamp(0.0, 1.0)
    }
}
