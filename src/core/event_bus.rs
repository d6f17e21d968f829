// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fogbarn

//! Event bus for outbound notifications
//!
//! Every subscriber owns an unbounded queue, so a slow consumer never misses a
//! notification and sees each topic in publish order. Receivers that have been
//! dropped are pruned on the next publish.

use std::sync::atomic::{AtomicU64, Ordering};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::analysis::{AggregatedData, Anomaly};
use crate::sensors::DeviceEvent;

/// Event types in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    Aggregate,
    Anomaly,
    DeviceStatus,
}

/// Generic event wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    Aggregate(AggregatedData),
    Anomaly(Anomaly),
    Device(DeviceEvent),
}

/// One fan-out channel
struct Topic<T> {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<T>>>,
}

impl<T: Clone> Topic<T> {
    fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    fn publish(&self, item: &T) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(item.clone()).is_ok());
        subscribers.len()
    }

    fn len(&self) -> usize {
        self.subscribers.lock().iter().filter(|tx| !tx.is_closed()).count()
    }
}

/// Central event bus for pub/sub communication
pub struct EventBus {
    aggregate_topic: Topic<AggregatedData>,
    anomaly_topic: Topic<Anomaly>,
    device_topic: Topic<DeviceEvent>,
    event_topic: Topic<Event>,
    event_counter: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            aggregate_topic: Topic::new(),
            anomaly_topic: Topic::new(),
            device_topic: Topic::new(),
            event_topic: Topic::new(),
            event_counter: AtomicU64::new(0),
        }
    }

    pub fn publish_aggregate(&self, aggregate: AggregatedData) {
        self.aggregate_topic.publish(&aggregate);
        self.publish_event(EventType::Aggregate, EventPayload::Aggregate(aggregate));
    }

    pub fn publish_anomaly(&self, anomaly: Anomaly) {
        self.anomaly_topic.publish(&anomaly);
        self.publish_event(EventType::Anomaly, EventPayload::Anomaly(anomaly));
    }

    pub fn publish_device(&self, event: DeviceEvent) {
        self.device_topic.publish(&event);
        self.publish_event(EventType::DeviceStatus, EventPayload::Device(event));
    }

    fn publish_event(&self, event_type: EventType, payload: EventPayload) {
        let id = self.event_counter.fetch_add(1, Ordering::Relaxed);
        let event = Event {
            id,
            event_type,
            timestamp: Utc::now(),
            payload,
        };
        self.event_topic.publish(&event);
    }

    pub fn subscribe_aggregates(&self) -> mpsc::UnboundedReceiver<AggregatedData> {
        self.aggregate_topic.subscribe()
    }

    pub fn subscribe_anomalies(&self) -> mpsc::UnboundedReceiver<Anomaly> {
        self.anomaly_topic.subscribe()
    }

    pub fn subscribe_devices(&self) -> mpsc::UnboundedReceiver<DeviceEvent> {
        self.device_topic.subscribe()
    }

    pub fn subscribe_events(&self) -> mpsc::UnboundedReceiver<Event> {
        self.event_topic.subscribe()
    }

    /// Live subscribers across all topics
    pub fn subscriber_count(&self) -> usize {
        self.aggregate_topic.len()
            + self.anomaly_topic.len()
            + self.device_topic.len()
            + self.event_topic.len()
    }

    /// Number of events published so far
    pub fn published(&self) -> u64 {
        self.event_counter.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
