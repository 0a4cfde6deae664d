//! Metrics: bounded, decaying signals tracked across a conversation.

mod manager;
mod metric;
mod snapshot;

pub use manager::{MetricDeltas, MetricsManager, DEFAULT_TREND_WINDOW};
pub use metric::{Metric, MetricDefinition};
pub use snapshot::MetricsSnapshot;
