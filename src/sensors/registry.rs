// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fogbarn

//! Edge device registry - capabilities, liveness and battery state

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SensorType;
use crate::error::FogError;

/// Liveness of an edge device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Online,
    Offline,
    Unknown,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Online => "online",
            DeviceStatus::Offline => "offline",
            DeviceStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceStatus {
    type Err = FogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(DeviceStatus::Online),
            "offline" => Ok(DeviceStatus::Offline),
            "unknown" => Ok(DeviceStatus::Unknown),
            other => Err(FogError::UnknownDeviceStatus(other.to_string())),
        }
    }
}

/// A registered edge device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeDevice {
    pub device_id: String,
    pub device_type: String,
    pub location: String,
    pub capabilities: BTreeSet<SensorType>,
    pub address: Option<String>,
    pub last_seen: DateTime<Utc>,
    pub status: DeviceStatus,
    pub battery_level: f64,
    pub registered_at: DateTime<Utc>,
}

/// What changed on a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceChange {
    Registered {
        location: String,
        capabilities: Vec<SensorType>,
    },
    StatusChanged {
        status: DeviceStatus,
        battery_level: Option<f64>,
    },
}

/// Notification payload for device registration and status updates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceEvent {
    pub device_id: String,
    pub change: DeviceChange,
    pub timestamp: DateTime<Utc>,
}

/// Registry of known edge devices keyed by device id.
///
/// Devices are never removed; a device that stops reporting simply keeps its
/// last known status until someone marks it offline.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: HashMap<String, EdgeDevice>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a device, resetting it to online with a full battery
    pub fn register(
        &mut self,
        device_id: &str,
        device_type: &str,
        location: &str,
        capabilities: &[SensorType],
        address: Option<&str>,
        now: DateTime<Utc>,
    ) -> DeviceEvent {
        let capabilities: BTreeSet<SensorType> = capabilities.iter().copied().collect();

        self.devices.insert(device_id.to_string(), EdgeDevice {
            device_id: device_id.to_string(),
            device_type: device_type.to_string(),
            location: location.to_string(),
            capabilities: capabilities.clone(),
            address: address.map(str::to_string),
            last_seen: now,
            status: DeviceStatus::Online,
            battery_level: 100.0,
            registered_at: now,
        });

        DeviceEvent {
            device_id: device_id.to_string(),
            change: DeviceChange::Registered {
                location: location.to_string(),
                capabilities: capabilities.into_iter().collect(),
            },
            timestamp: now,
        }
    }

    /// Update liveness of a known device. Unknown ids are ignored.
    pub fn update_status(
        &mut self,
        device_id: &str,
        status: DeviceStatus,
        battery_level: Option<f64>,
        now: DateTime<Utc>,
    ) -> Option<DeviceEvent> {
        let device = self.devices.get_mut(device_id)?;

        device.last_seen = now;
        device.status = status;
        if let Some(level) = battery_level {
            device.battery_level = level;
        }

        Some(DeviceEvent {
            device_id: device_id.to_string(),
            change: DeviceChange::StatusChanged { status, battery_level },
            timestamp: now,
        })
    }

    pub fn get(&self, device_id: &str) -> Option<&EdgeDevice> {
        self.devices.get(device_id)
    }

    /// Owned snapshot of every device, ordered by id
    pub fn list_devices(&self) -> Vec<EdgeDevice> {
        let mut devices: Vec<EdgeDevice> = self.devices.values().cloned().collect();
        devices.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        devices
    }

    /// Distinct locations of registered devices
    pub fn locations(&self) -> BTreeSet<String> {
        self.devices.values().map(|d| d.location.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
