// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fogbarn

//! Main aggregation engine
//!
//! All mutable state (device table, raw buffer, aggregate history, anomaly
//! log) sits behind one engine-wide lock. Every operation holds it for the
//! whole read-modify-write, and notifications are published while it is still
//! held so per-key ordering matches storage order. Anomaly recording takes the
//! already-locked state by reference and never locks again.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::{EngineStats, EventBus, RetentionManager, RetentionReport, Scheduler};
use crate::analysis::{AggregatedData, AggregationWindow, Aggregator, Anomaly, AnomalyDetector, Severity};
use crate::config::Config;
use crate::sensors::{DeviceRegistry, DeviceStatus, EdgeDevice, SensorReading, SensorType};
use crate::store::{AggregateHistory, AnomalyLog, HistoryKey, ReadingBuffer};

/// location -> sensor type -> window -> aggregate
pub type AggregatedMetrics = BTreeMap<String, BTreeMap<SensorType, BTreeMap<AggregationWindow, AggregatedData>>>;

#[derive(Debug, Default)]
struct EngineState {
    devices: DeviceRegistry,
    buffer: ReadingBuffer,
    history: AggregateHistory,
    anomalies: AnomalyLog,

    readings_ingested: u64,
    aggregates_produced: u64,
    anomalies_emitted: u64,
    last_aggregation: Option<DateTime<Utc>>,
    last_retention: Option<DateTime<Utc>>,
}

/// Edge-to-fog aggregation and anomaly engine
pub struct Engine {
    config: Arc<Config>,
    state: Mutex<EngineState>,
    event_bus: Arc<EventBus>,
    aggregator: Aggregator,
    detector: AnomalyDetector,
    retention: RetentionManager,
    start_time: Instant,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        Self::with_event_bus(config, Arc::new(EventBus::new()))
    }

    pub fn with_event_bus(config: Config, event_bus: Arc<EventBus>) -> Self {
        let detector = AnomalyDetector::new(config.anomaly.clone());
        let retention = RetentionManager::new(config.retention.clone());

        Self {
            config: Arc::new(config),
            state: Mutex::new(EngineState::default()),
            event_bus,
            aggregator: Aggregator::new(),
            detector,
            retention,
            start_time: Instant::now(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    // --- Device registry ---

    /// Insert or overwrite a device entry, marking it online with a full battery
    pub fn register_device(
        &self,
        device_id: &str,
        device_type: &str,
        location: &str,
        capabilities: &[SensorType],
        address: Option<&str>,
    ) {
        let mut state = self.state.lock();
        let event = state.devices.register(device_id, device_type, location, capabilities, address, Utc::now());
        self.event_bus.publish_device(event);
        info!("Registered edge device: {} at {}", device_id, location);
    }

    /// Update liveness for a known device. Unknown ids are ignored.
    pub fn update_device_status(&self, device_id: &str, status: DeviceStatus, battery_level: Option<f64>) {
        let mut state = self.state.lock();
        Self::apply_status(&mut state, &self.event_bus, device_id, status, battery_level, Utc::now());
    }

    fn apply_status(
        state: &mut EngineState,
        event_bus: &EventBus,
        device_id: &str,
        status: DeviceStatus,
        battery_level: Option<f64>,
        now: DateTime<Utc>,
    ) {
        match state.devices.update_status(device_id, status, battery_level, now) {
            Some(event) => event_bus.publish_device(event),
            None => debug!("Status update for unknown device {} ignored", device_id),
        }
    }

    // --- Ingestion ---

    /// Buffer a reading, mark its device online and run the immediate range
    /// check before returning. Returns the anomaly raised, if any.
    pub fn submit_reading(&self, reading: SensorReading) -> Option<Anomaly> {
        let reading = reading.normalized();
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let now = Utc::now();

        debug!(
            "Added reading: {} at {}: {}",
            reading.sensor_type, reading.location, reading.value
        );

        state.buffer.push(reading.clone());
        state.readings_ingested += 1;

        Self::apply_status(
            state,
            &self.event_bus,
            &reading.device_id,
            DeviceStatus::Online,
            reading.battery_level,
            now,
        );

        let anomaly = self.detector.check_reading(&reading, now)?;
        Self::record_anomaly(state, &self.event_bus, anomaly.clone());
        Some(anomaly)
    }

    /// Append then notify. Called with the engine lock already held.
    fn record_anomaly(state: &mut EngineState, event_bus: &EventBus, anomaly: Anomaly) {
        match anomaly.severity {
            Severity::Info => info!("Anomaly detected: {}", anomaly.message),
            _ => warn!("Anomaly detected: {}", anomaly.message),
        }

        let stored = state.anomalies.push(anomaly).clone();
        state.anomalies_emitted += 1;
        event_bus.publish_anomaly(stored);
    }

    // --- Aggregation ---

    /// Aggregation tick using the current time
    pub fn run_aggregation(&self) -> usize {
        self.run_aggregation_at(Utc::now())
    }

    /// Aggregate every buffered key over every window relative to `now`.
    ///
    /// Each aggregate is stored, published and checked against its history
    /// before the next key/window pair is evaluated. Returns the number of
    /// aggregates produced.
    pub fn run_aggregation_at(&self, now: DateTime<Utc>) -> usize {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let mut produced = 0;
        let mut raised = 0;

        for key in state.buffer.keys() {
            for window in AggregationWindow::ALL {
                let Some(readings) = state.buffer.get(key.sensor_type, &key.location) else {
                    continue;
                };
                let Some(aggregate) = self.aggregator.aggregate(key.sensor_type, &key.location, readings, window, now) else {
                    continue;
                };

                let history = state.history.push(aggregate.clone());
                let anomalies = self.detector.check_aggregate(&aggregate, history);

                state.aggregates_produced += 1;
                produced += 1;
                self.event_bus.publish_aggregate(aggregate);

                for anomaly in anomalies {
                    Self::record_anomaly(state, &self.event_bus, anomaly);
                    raised += 1;
                }
            }
        }

        state.last_aggregation = Some(now);
        debug!(
            "Aggregation pass: {} aggregates, {} anomalies across {} keys",
            produced,
            raised,
            state.buffer.key_count()
        );
        produced
    }

    // --- Retention ---

    /// Retention tick using the current time
    pub fn run_retention(&self) -> RetentionReport {
        self.run_retention_at(Utc::now())
    }

    pub fn run_retention_at(&self, now: DateTime<Utc>) -> RetentionReport {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let report = self.retention.prune(&mut state.buffer, &mut state.history, &mut state.anomalies, now);
        state.last_retention = Some(now);

        debug!(
            "Cleaned up {} readings, {} aggregates and {} anomalies",
            report.readings_removed, report.aggregates_removed, report.anomalies_removed
        );
        report
    }

    // --- Queries ---

    /// Live aggregates over the dashboard windows, computed from the buffer.
    ///
    /// Without a location filter every registered device location and every
    /// buffered location is reported. Sensor types with no data in any window
    /// are left out; a location with no data maps to an empty table.
    pub fn get_aggregated_metrics(&self, sensor_type: Option<SensorType>, location: Option<&str>) -> AggregatedMetrics {
        let state = self.state.lock();
        let now = Utc::now();

        let locations: BTreeSet<String> = match location {
            Some(loc) => BTreeSet::from([loc.to_string()]),
            None => state.devices.locations().into_iter().chain(state.buffer.locations()).collect(),
        };
        let sensor_types: Vec<SensorType> = match sensor_type {
            Some(t) => vec![t],
            None => SensorType::ALL.to_vec(),
        };

        let mut metrics = AggregatedMetrics::new();
        for loc in locations {
            let by_type = metrics.entry(loc.clone()).or_default();

            for &s_type in &sensor_types {
                let Some(readings) = state.buffer.get(s_type, &loc) else {
                    continue;
                };

                let windows: BTreeMap<AggregationWindow, AggregatedData> = self
                    .config
                    .aggregation
                    .dashboard_windows
                    .iter()
                    .filter_map(|&w| {
                        self.aggregator
                            .aggregate(s_type, &loc, readings, w, now)
                            .map(|agg| (w, agg))
                    })
                    .collect();

                if !windows.is_empty() {
                    by_type.insert(s_type, windows);
                }
            }
        }

        metrics
    }

    /// Snapshot of every registered device
    pub fn get_device_status(&self) -> Vec<EdgeDevice> {
        self.state.lock().devices.list_devices()
    }

    /// The `limit` most recent anomalies, newest first
    pub fn get_recent_anomalies(&self, limit: usize) -> Vec<Anomaly> {
        self.state.lock().anomalies.recent(limit)
    }

    /// Stored aggregate sequence for one key, oldest first
    pub fn aggregate_history(&self, sensor_type: SensorType, location: &str, window: AggregationWindow) -> Vec<AggregatedData> {
        let key = HistoryKey::new(sensor_type, location, window);
        self.state
            .lock()
            .history
            .get(&key)
            .map(<[AggregatedData]>::to_vec)
            .unwrap_or_default()
    }

    /// Buffered raw readings for one key, in submission order
    pub fn readings(&self, sensor_type: SensorType, location: &str) -> Vec<SensorReading> {
        self.state
            .lock()
            .buffer
            .get(sensor_type, location)
            .map(<[SensorReading]>::to_vec)
            .unwrap_or_default()
    }

    pub fn stats(&self) -> EngineStats {
        let state = self.state.lock();
        EngineStats {
            readings_ingested: state.readings_ingested,
            aggregates_produced: state.aggregates_produced,
            anomalies_emitted: state.anomalies_emitted,
            devices: state.devices.len(),
            buffered_readings: state.buffer.len(),
            stored_aggregates: state.history.len(),
            stored_anomalies: state.anomalies.len(),
            uptime_seconds: self.uptime(),
            last_aggregation: state.last_aggregation,
            last_retention: state.last_retention,
        }
    }

    pub fn uptime(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    // --- Scheduling ---

    /// Register the aggregation and retention ticks with a scheduler
    pub async fn schedule(self: &Arc<Self>, scheduler: &Scheduler) {
        let engine = Arc::clone(self);
        scheduler
            .add_task("aggregation", self.config.aggregation.interval(), move || {
                engine.run_aggregation();
            })
            .await;

        let engine = Arc::clone(self);
        scheduler
            .add_task("retention", self.config.retention.interval(), move || {
                engine.run_retention();
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnomalyType;
    use crate::core::EventPayload;
    use crate::sensors::DeviceChange;
    use chrono::Duration;

    fn engine() -> Engine {
        Engine::new(Config::default())
    }

    fn reading(sensor_type: SensorType, value: f64, location: &str) -> SensorReading {
        SensorReading::new("node", sensor_type, value, location)
    }

    #[test]
    fn test_register_device_twice_updates_in_place() {
        let engine = engine();
        engine.register_device("node", "Sensor Node", "north_wing", &[SensorType::Humidity], None);
        engine.register_device("node", "Sensor Node", "south_wing", &[SensorType::Humidity], None);

        let devices = engine.get_device_status();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].location, "south_wing");
    }

    #[test]
    fn test_submit_marks_device_online() {
        let engine = engine();
        engine.register_device("node", "Sensor Node", "north_wing", &[SensorType::Humidity], None);
        engine.update_device_status("node", DeviceStatus::Offline, Some(80.0));

        engine.submit_reading(reading(SensorType::Humidity, 55.0, "north_wing").with_battery(61.0));

        let device = &engine.get_device_status()[0];
        assert_eq!(device.status, DeviceStatus::Online);
        assert_eq!(device.battery_level, 61.0);
    }

    #[test]
    fn test_unregistered_device_readings_are_still_buffered() {
        let engine = engine();
        engine.submit_reading(reading(SensorType::Humidity, 55.0, "north_wing"));

        assert!(engine.get_device_status().is_empty());
        assert_eq!(engine.readings(SensorType::Humidity, "north_wing").len(), 1);
    }

    #[test]
    fn test_out_of_range_reading_is_recorded() {
        let engine = engine();
        let mut anomalies = engine.event_bus().subscribe_anomalies();

        let raised = engine.submit_reading(reading(SensorType::Temperature, 50.0, "north_wing"));
        assert!(raised.is_some());
        assert!(engine.submit_reading(reading(SensorType::Humidity, 55.0, "north_wing")).is_none());

        let recent = engine.get_recent_anomalies(10);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].severity, Severity::Critical);
        assert_eq!(recent[0].anomaly_type, AnomalyType::OutOfRange);

        let published = anomalies.try_recv().unwrap();
        assert_eq!(published.anomaly_id, recent[0].anomaly_id);
        assert!(anomalies.try_recv().is_err());
    }

    #[test]
    fn test_submitted_quality_is_bounded() {
        let engine = engine();
        let now = Utc::now();

        let mut heavy = reading(SensorType::Humidity, 40.0, "north_wing").at(now);
        heavy.quality = 5.0;
        engine.submit_reading(heavy);

        // Transport path: a raw quality that never went through the builder
        let mut negative = reading(SensorType::Humidity, 60.0, "north_wing").at(now);
        negative.quality = -5.0;
        let decoded: SensorReading = serde_json::from_str(&negative.to_json().unwrap()).unwrap();
        engine.submit_reading(decoded);

        let stored: Vec<f64> = engine
            .readings(SensorType::Humidity, "north_wing")
            .iter()
            .map(|r| r.quality)
            .collect();
        assert_eq!(stored, vec![1.0, 0.0]);

        engine.run_aggregation_at(now);
        let agg = &engine.aggregate_history(SensorType::Humidity, "north_wing", AggregationWindow::OneMinute)[0];
        assert_eq!(agg.quality_score, 0.5);
        assert_eq!(agg.average, 40.0);
    }

    #[test]
    fn test_aggregation_covers_every_window() {
        let engine = engine();
        let now = Utc::now();
        for _ in 0..4 {
            engine.submit_reading(reading(SensorType::Humidity, 50.0, "north_wing").at(now - Duration::seconds(5)));
        }

        assert_eq!(engine.run_aggregation_at(now), 4);

        for window in AggregationWindow::ALL {
            let history = engine.aggregate_history(SensorType::Humidity, "north_wing", window);
            assert_eq!(history.len(), 1);
            assert_eq!(history[0].average, 50.0);
            assert_eq!(history[0].count, 4);
            assert_eq!(history[0].std_dev, 0.0);
            assert_eq!(history[0].timestamp, now);
        }
        assert!(engine.get_recent_anomalies(10).is_empty());
    }

    #[test]
    fn test_aggregation_skips_empty_windows() {
        let engine = engine();
        let now = Utc::now();
        engine.submit_reading(reading(SensorType::Humidity, 50.0, "north_wing").at(now - Duration::minutes(10)));

        // Only the 15min and 1h windows contain the reading
        assert_eq!(engine.run_aggregation_at(now), 2);
        assert!(engine
            .aggregate_history(SensorType::Humidity, "north_wing", AggregationWindow::OneMinute)
            .is_empty());
    }

    #[test]
    fn test_aggregation_publishes_before_anomalies() {
        let engine = engine();
        let mut events = engine.event_bus().subscribe_events();
        let now = Utc::now();

        // Wide spread in one window triggers high variance
        engine.submit_reading(reading(SensorType::Humidity, 40.0, "north_wing").at(now));
        engine.submit_reading(reading(SensorType::Humidity, 75.0, "north_wing").at(now));
        while events.try_recv().is_ok() {}

        engine.run_aggregation_at(now);

        let first = events.try_recv().unwrap();
        let second = events.try_recv().unwrap();
        assert!(matches!(first.payload, EventPayload::Aggregate(_)));
        match second.payload {
            EventPayload::Anomaly(a) => assert_eq!(a.anomaly_type, AnomalyType::HighVariance),
            other => panic!("expected anomaly, got {:?}", other),
        }
    }

    #[test]
    fn test_trend_over_successive_ticks() {
        let engine = engine();
        let start = Utc::now() - Duration::hours(1);

        // One reading per tick, each only visible to the 1min window of its tick
        for (i, v) in [21.0, 22.0, 23.0, 24.0, 25.0].iter().enumerate() {
            let tick = start + Duration::minutes(2 * i as i64);
            engine.submit_reading(reading(SensorType::Temperature, *v, "north_wing").at(tick));
            engine.run_aggregation_at(tick);
        }

        let trends: Vec<Anomaly> = engine
            .get_recent_anomalies(100)
            .into_iter()
            .filter(|a| a.anomaly_type == AnomalyType::SustainedTrend)
            .collect();

        assert!(!trends.is_empty());
        assert!(trends.iter().all(|a| a.message == "Sustained increasing trend in temperature"));
        assert_eq!(
            engine.aggregate_history(SensorType::Temperature, "north_wing", AggregationWindow::OneMinute).len(),
            5
        );
    }

    #[test]
    fn test_retention_prunes_state() {
        let engine = engine();
        let now = Utc::now();

        let old_tick = now - Duration::hours(25);

        engine.submit_reading(reading(SensorType::Humidity, 50.0, "north_wing").at(old_tick));
        engine.submit_reading(reading(SensorType::Humidity, 50.0, "north_wing").at(now - Duration::hours(3)));
        engine.submit_reading(reading(SensorType::Humidity, 50.0, "north_wing").at(now - Duration::minutes(30)));

        // Old tick sees only the first reading; the current tick only the last
        assert_eq!(engine.run_aggregation_at(old_tick), 4);
        assert_eq!(engine.run_aggregation_at(now), 1);

        let report = engine.run_retention_at(now);

        assert_eq!(report.readings_removed, 2);
        assert_eq!(report.aggregates_removed, 4);
        assert_eq!(engine.readings(SensorType::Humidity, "north_wing").len(), 1);

        let hourly = engine.aggregate_history(SensorType::Humidity, "north_wing", AggregationWindow::OneHour);
        assert_eq!(hourly.len(), 1);
        assert_eq!(hourly[0].timestamp, now);
        assert_eq!(engine.stats().last_retention, Some(now));
    }

    #[test]
    fn test_metrics_for_locations() {
        let engine = engine();
        engine.register_device("soil", "Soil Node", "herb_garden", &[SensorType::SoilPh], None);
        engine.submit_reading(reading(SensorType::Humidity, 55.0, "north_wing"));

        let metrics = engine.get_aggregated_metrics(None, None);
        assert_eq!(metrics.len(), 2);
        assert!(metrics["herb_garden"].is_empty());

        let humidity = &metrics["north_wing"][&SensorType::Humidity];
        let windows: Vec<AggregationWindow> = humidity.keys().copied().collect();
        assert_eq!(
            windows,
            vec![AggregationWindow::OneMinute, AggregationWindow::FiveMinutes, AggregationWindow::FifteenMinutes]
        );
        assert_eq!(humidity[&AggregationWindow::OneMinute].count, 1);

        // Live metrics do not touch stored history
        assert_eq!(engine.stats().stored_aggregates, 0);
    }

    #[test]
    fn test_metrics_filters() {
        let engine = engine();
        engine.submit_reading(reading(SensorType::Humidity, 55.0, "north_wing"));
        engine.submit_reading(reading(SensorType::Temperature, 25.0, "north_wing"));
        engine.submit_reading(reading(SensorType::Temperature, 25.0, "south_wing"));

        let metrics = engine.get_aggregated_metrics(Some(SensorType::Temperature), Some("north_wing"));
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics["north_wing"].len(), 1);
        assert!(metrics["north_wing"].contains_key(&SensorType::Temperature));

        let absent = engine.get_aggregated_metrics(None, Some("greenhouse_9"));
        assert!(absent["greenhouse_9"].is_empty());
    }

    #[test]
    fn test_device_events_are_published() {
        let engine = engine();
        let mut devices = engine.event_bus().subscribe_devices();

        engine.register_device("node", "Sensor Node", "north_wing", &[SensorType::Humidity], None);
        engine.update_device_status("node", DeviceStatus::Offline, None);
        engine.update_device_status("ghost", DeviceStatus::Offline, None);

        assert!(matches!(devices.try_recv().unwrap().change, DeviceChange::Registered { .. }));
        assert!(matches!(
            devices.try_recv().unwrap().change,
            DeviceChange::StatusChanged { status: DeviceStatus::Offline, .. }
        ));
        assert!(devices.try_recv().is_err());
    }

    #[test]
    fn test_stats() {
        let engine = engine();
        let now = Utc::now();
        engine.register_device("node", "Sensor Node", "north_wing", &[SensorType::Temperature], None);
        engine.submit_reading(reading(SensorType::Temperature, 50.0, "north_wing").at(now));
        engine.run_aggregation_at(now);

        let stats = engine.stats();
        assert_eq!(stats.readings_ingested, 1);
        assert_eq!(stats.devices, 1);
        assert_eq!(stats.buffered_readings, 1);
        assert_eq!(stats.aggregates_produced, 4);
        assert_eq!(stats.stored_aggregates, 4);
        assert_eq!(stats.anomalies_emitted, 1);
        assert_eq!(stats.last_aggregation, Some(now));
    }
}
