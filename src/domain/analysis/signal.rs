//! Metric signals produced by turn analyzers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::metrics::{MetricDeltas, MetricsSnapshot};

/// How an analyzer wants a metric to move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MetricSignal {
    /// Add this amount to the metric.
    Delta(f64),
    /// Move the metric to this value.
    Absolute(f64),
}

impl MetricSignal {
    /// Converts the signal into a delta against the pre-turn value.
    pub fn as_delta(self, current: f64) -> f64 {
        match self {
            MetricSignal::Delta(delta) => delta,
            MetricSignal::Absolute(value) => value - current,
        }
    }
}

/// Signals emitted by one analyzer for one turn, keyed by metric id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalyzerOutput {
    signals: BTreeMap<String, MetricSignal>,
}

impl AnalyzerOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delta(mut self, metric: impl Into<String>, delta: f64) -> Self {
        self.signals.insert(metric.into(), MetricSignal::Delta(delta));
        self
    }

    pub fn with_absolute(mut self, metric: impl Into<String>, value: f64) -> Self {
        self.signals.insert(metric.into(), MetricSignal::Absolute(value));
        self
    }

    pub fn insert(&mut self, metric: impl Into<String>, signal: MetricSignal) {
        self.signals.insert(metric.into(), signal);
    }

    pub fn get(&self, metric: &str) -> Option<MetricSignal> {
        self.signals.get(metric).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, MetricSignal)> {
        self.signals.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

/// Sums analyzer outputs into one set of deltas.
///
/// Absolute signals are normalized against the snapshot taken before the
/// turn, so the order analyzers run in does not change the result. Absolute
/// signals for metrics missing from that snapshot are dropped, as are
/// non-finite values.
#[derive(Debug, Clone)]
pub struct DeltaAccumulator<'a> {
    baseline: &'a MetricsSnapshot,
    deltas: MetricDeltas,
}

impl<'a> DeltaAccumulator<'a> {
    pub fn new(baseline: &'a MetricsSnapshot) -> Self {
        Self {
            baseline,
            deltas: MetricDeltas::new(),
        }
    }

    pub fn add(&mut self, output: &AnalyzerOutput) {
        for (metric, signal) in output.iter() {
            let delta = match signal {
                MetricSignal::Delta(delta) => delta,
                MetricSignal::Absolute(_) => match self.baseline.get(metric) {
                    Some(current) => signal.as_delta(current),
                    None => {
                        tracing::debug!(metric = %metric, "Dropping absolute signal for unregistered metric");
                        continue;
                    }
                },
            };
            if !delta.is_finite() {
                continue;
            }
            *self.deltas.entry(metric.to_string()).or_insert(0.0) += delta;
        }
    }

    pub fn into_deltas(self) -> MetricDeltas {
        self.deltas
    }
}
