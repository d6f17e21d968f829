// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fogbarn

//! Task scheduler for timed operations
//!
//! Each task runs on its own tokio task and its body completes before the next
//! tick is awaited, so a task never overlaps itself. Missed ticks are skipped
//! rather than replayed in a burst.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

type TaskFn = Arc<dyn Fn() + Send + Sync + 'static>;

/// Shortest period a task may tick at; zero periods are raised to this
const MIN_PERIOD: Duration = Duration::from_millis(1);

struct ScheduledTask {
    name: String,
    interval: Duration,
    task: TaskFn,
    enabled: Arc<AtomicBool>,
}

pub struct Scheduler {
    tasks: Arc<RwLock<HashMap<String, ScheduledTask>>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn add_task<F>(&self, name: &str, interval: Duration, task: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        if interval < MIN_PERIOD {
            warn!("Task '{}' interval {:?} raised to {:?}", name, interval, MIN_PERIOD);
        }
        let interval = interval.max(MIN_PERIOD);

        let mut tasks = self.tasks.write().await;
        tasks.insert(
            name.to_string(),
            ScheduledTask {
                name: name.to_string(),
                interval,
                task: Arc::new(task),
                enabled: Arc::new(AtomicBool::new(true)),
            },
        );
        debug!("Scheduled task '{}' with interval {:?}", name, interval);
    }

    pub async fn remove_task(&self, name: &str) {
        let mut tasks = self.tasks.write().await;
        tasks.remove(name);
    }

    /// Pause or resume a task. Takes effect on the task's next tick.
    pub async fn enable_task(&self, name: &str, enabled: bool) {
        let tasks = self.tasks.read().await;
        if let Some(task) = tasks.get(name) {
            task.enabled.store(enabled, Ordering::SeqCst);
        }
    }

    pub async fn task_names(&self) -> Vec<String> {
        let tasks = self.tasks.read().await;
        let mut names: Vec<String> = tasks.keys().cloned().collect();
        names.sort();
        names
    }

    /// Spawn every registered task. The first run of each task happens one
    /// full interval after start. Tasks stop when `shutdown` fires.
    pub async fn start(&self, shutdown: &broadcast::Sender<()>) -> Vec<JoinHandle<()>> {
        let tasks = self.tasks.read().await;
        let mut handles = Vec::with_capacity(tasks.len());

        for scheduled in tasks.values() {
            let name = scheduled.name.clone();
            let period = scheduled.interval;
            let task = Arc::clone(&scheduled.task);
            let enabled = Arc::clone(&scheduled.enabled);
            let mut shutdown_rx = shutdown.subscribe();

            handles.push(tokio::spawn(async move {
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                info!("Task '{}' running every {:?}", name, period);

                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            if enabled.load(Ordering::SeqCst) {
                                task();
                            }
                        }
                        _ = shutdown_rx.recv() => {
                            info!("Task '{}' shutting down...", name);
                            break;
                        }
                    }
                }
            }));
        }

        handles
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
