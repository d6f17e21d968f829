//! In-memory stores - raw reading buffer, aggregate history and anomaly log
//!
//! None of these types lock internally. They live inside the engine state and
//! are only touched while the engine lock is held.

mod buffer;
mod history;
mod anomalies;

pub use buffer::{BufferKey, ReadingBuffer};
pub use history::{AggregateHistory, HistoryKey};
pub use anomalies::AnomalyLog;
