//! Analysis module - window statistics, aggregation and anomaly rules

mod statistics;
mod aggregation;
mod anomaly;

pub use statistics::*;
pub use aggregation::*;
pub use anomaly::*;
