// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fogbarn

//! FogBarn - Edge-to-Fog Telemetry Reduction
//!
//! An in-process engine that sits between a fleet of edge sensors and the
//! consumers that care about them:
//! - Device registry with liveness and battery tracking
//! - Quality-weighted aggregation over 1min, 5min, 15min and 1h windows
//! - Immediate range checks on every submitted reading
//! - Variance, rate-of-change and sustained-trend rules on aggregates
//! - Bounded retention for raw readings, aggregates and anomalies
//! - At-least-once, in-order notifications for every stored record
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      FogBarn Engine                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────┐  ┌──────────┐  ┌───────────┐  ┌────────────┐  │
//! │  │ Devices │→ │  Reading │→ │ Aggregator│→ │  Anomaly   │  │
//! │  │Registry │  │  Buffer  │  │ (windows) │  │  Detector  │  │
//! │  └─────────┘  └──────────┘  └───────────┘  └────────────┘  │
//! │       ↓            ↓             ↓              ↓          │
//! │  ┌─────────────────────────────────────────────────────┐   │
//! │  │                    Event Bus                         │   │
//! │  └─────────────────────────────────────────────────────┘   │
//! │       ↑                                         ↑          │
//! │  ┌──────────────────┐              ┌──────────────────┐    │
//! │  │ Scheduler        │              │ Retention        │    │
//! │  │ (aggregation)    │              │ (pruning)        │    │
//! │  └──────────────────┘              └──────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod analysis;
pub mod config;
pub mod core;
pub mod error;
pub mod sensors;
pub mod store;

// Re-exports for convenience
pub use analysis::{AggregatedData, AggregationWindow, Anomaly, AnomalyType, Severity};
pub use config::Config;
pub use core::{Engine, EngineStats, EventBus, Scheduler};
pub use error::{FogError, FogResult};
pub use sensors::{DeviceStatus, EdgeDevice, SensorReading, SensorType};

/// FogBarn version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// FogBarn name
pub const NAME: &str = "FogBarn";
