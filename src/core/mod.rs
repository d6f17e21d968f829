//! Core engine module - ingestion, scheduled ticks and notifications

mod engine;
mod scheduler;
mod event_bus;
mod retention;

pub use engine::{AggregatedMetrics, Engine};
pub use scheduler::Scheduler;
pub use event_bus::{Event, EventBus, EventPayload, EventType};
pub use retention::{RetentionManager, RetentionReport};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Engine-wide counters and store sizes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineStats {
    pub readings_ingested: u64,
    pub aggregates_produced: u64,
    pub anomalies_emitted: u64,
    pub devices: usize,
    pub buffered_readings: usize,
    pub stored_aggregates: usize,
    pub stored_anomalies: usize,
    pub uptime_seconds: u64,
    pub last_aggregation: Option<DateTime<Utc>>,
    pub last_retention: Option<DateTime<Utc>>,
}
