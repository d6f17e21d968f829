//! Anomaly history, newest last

use crate::analysis::Anomaly;

#[derive(Debug, Default)]
pub struct AnomalyLog {
    anomalies: Vec<Anomaly>,
}

impl AnomalyLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, anomaly: Anomaly) -> &Anomaly {
        self.anomalies.push(anomaly);
        &self.anomalies[self.anomalies.len() - 1]
    }

    /// Up to `limit` anomalies, newest first
    pub fn recent(&self, limit: usize) -> Vec<Anomaly> {
        let mut recent: Vec<Anomaly> = self.anomalies.iter().rev().cloned().collect();
        // Stable sort keeps later-appended entries first among equal timestamps
        recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        recent.truncate(limit);
        recent
    }

    pub fn all(&self) -> &[Anomaly] {
        &self.anomalies
    }

    pub fn len(&self) -> usize {
        self.anomalies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anomalies.is_empty()
    }

    /// Keep only the `max` most recent anomalies. Returns how many were dropped.
    pub fn truncate_to_recent(&mut self, max: usize) -> usize {
        if self.anomalies.len() <= max {
            return 0;
        }

        let dropped = self.anomalies.len() - max;
        let mut kept = self.recent(max);
        kept.reverse();
        self.anomalies = kept;
        dropped
    }
}
