// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fogbarn

//! Greenhouse simulator for demo/testing

use rand::prelude::*;
use rand_distr::{StandardNormal, Uniform};
use std::f64::consts::PI;
use chrono::{DateTime, Timelike, Utc};
use tracing::debug;

use super::{DeviceStatus, SensorReading, SensorType};
use crate::core::Engine;

/// Static description of a demo edge node
#[derive(Debug, Clone)]
pub struct DemoDevice {
    pub id: &'static str,
    pub device_type: &'static str,
    pub location: &'static str,
    pub capabilities: &'static [SensorType],
}

/// The three nodes the greenhouse demo starts with
pub const DEMO_DEVICES: [DemoDevice; 3] = [
    DemoDevice {
        id: "sensor_node_001",
        device_type: "Environmental Sensor Node",
        location: "north_wing",
        capabilities: &[SensorType::Temperature, SensorType::Humidity, SensorType::LightIntensity],
    },
    DemoDevice {
        id: "soil_sensor_001",
        device_type: "Soil Monitoring Node",
        location: "herb_garden",
        capabilities: &[SensorType::SoilMoisture, SensorType::SoilPh, SensorType::Temperature],
    },
    DemoDevice {
        id: "climate_001",
        device_type: "Climate Control Node",
        location: "tropical_zone",
        capabilities: &[SensorType::Temperature, SensorType::Humidity, SensorType::Co2Level],
    },
];

/// Simulates a greenhouse full of edge devices feeding the engine
pub struct SensorSimulator {
    rng: rand::rngs::StdRng,
    offline_probability: f64,
    readings_generated: u64,
}

impl SensorSimulator {
    pub fn new(offline_probability: f64) -> Self {
        Self {
            rng: rand::rngs::StdRng::from_entropy(),
            offline_probability,
            readings_generated: 0,
        }
    }

    /// Deterministic simulator for tests
    pub fn seeded(seed: u64, offline_probability: f64) -> Self {
        Self {
            rng: rand::rngs::StdRng::seed_from_u64(seed),
            offline_probability,
            readings_generated: 0,
        }
    }

    /// Register the demo nodes with the engine
    pub fn register_demo_devices(engine: &Engine) {
        for device in DEMO_DEVICES.iter() {
            engine.register_device(
                device.id,
                device.device_type,
                device.location,
                device.capabilities,
                None,
            );
        }
    }

    pub fn readings_generated(&self) -> u64 {
        self.readings_generated
    }

    /// One demo pass over every registered device.
    ///
    /// A device may drop offline for the pass; otherwise it reports one fresh
    /// battery level, carried by each of its readings, and one reading per
    /// capability. Returns the number of
    /// readings submitted.
    pub fn step(&mut self, engine: &Engine) -> usize {
        let now = Utc::now();
        let mut submitted = 0;

        for device in engine.get_device_status() {
            if self.rng.gen::<f64>() < self.offline_probability {
                engine.update_device_status(&device.device_id, DeviceStatus::Offline, None);
                debug!("Demo device {} went offline", device.device_id);
                continue;
            }

            let battery = self.rng.gen_range(20.0..100.0);
            engine.update_device_status(&device.device_id, DeviceStatus::Online, Some(battery));

            for &sensor_type in &device.capabilities {
                let reading = self
                    .generate_reading(&device.device_id, sensor_type, &device.location, now)
                    .with_battery(battery);
                engine.submit_reading(reading);
                submitted += 1;
            }
        }

        self.readings_generated += submitted as u64;
        submitted
    }

    pub fn generate_reading(
        &mut self,
        device_id: &str,
        sensor_type: SensorType,
        location: &str,
        now: DateTime<Utc>,
    ) -> SensorReading {
        let value = self.generate_value(sensor_type, now.hour());

        SensorReading::new(device_id, sensor_type, value, location)
            .at(now)
            .with_quality(self.rng.gen_range(0.7..1.0))
            .with_signal(self.rng.gen_range(-50.0..-30.0))
    }

    fn generate_value(&mut self, sensor_type: SensorType, hour: u32) -> f64 {
        match sensor_type {
            SensorType::Temperature => self.generate_temperature(hour),
            SensorType::LightIntensity => self.generate_light(hour),
            SensorType::SoilPh => self.generate_ph(),
            _ => {
                let (lo, hi) = Self::base_range(sensor_type);
                self.rng.sample(Uniform::new(lo, hi))
            }
        }
    }

    fn generate_temperature(&mut self, hour: u32) -> f64 {
        // Diurnal swing on top of the base band
        let base = self.rng.sample(Uniform::new(22.0, 28.0));
        base + 5.0 * (hour as f64 * PI / 12.0).sin()
    }

    fn generate_light(&mut self, hour: u32) -> f64 {
        if (6..=18).contains(&hour) {
            self.rng.sample(Uniform::new(300.0, 800.0))
        } else {
            self.rng.sample(Uniform::new(0.0, 50.0))
        }
    }

    fn generate_ph(&mut self) -> f64 {
        let noise: f64 = self.rng.sample(StandardNormal);
        (6.5 + 0.2 * noise).clamp(6.0, 7.0)
    }

    /// Nominal value band the simulator draws from
    pub fn base_range(sensor_type: SensorType) -> (f64, f64) {
        match sensor_type {
            SensorType::Temperature => (22.0, 28.0),
            SensorType::Humidity => (45.0, 75.0),
            SensorType::SoilMoisture => (35.0, 65.0),
            SensorType::LightIntensity => (100.0, 800.0),
            SensorType::Co2Level => (400.0, 1200.0),
            SensorType::SoilPh => (6.0, 7.0),
        }
    }
}
