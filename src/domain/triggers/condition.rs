//! Closed predicate language over metric values.

use serde::{Deserialize, Serialize};

use crate::domain::metrics::MetricsSnapshot;

/// Comparison between a metric value and a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl ComparisonOp {
    pub fn apply(self, value: f64, threshold: f64) -> bool {
        match self {
            ComparisonOp::Lt => value < threshold,
            ComparisonOp::Le => value <= threshold,
            ComparisonOp::Gt => value > threshold,
            ComparisonOp::Ge => value >= threshold,
            ComparisonOp::Eq => (value - threshold).abs() < f64::EPSILON,
            ComparisonOp::Ne => (value - threshold).abs() >= f64::EPSILON,
        }
    }
}

/// Predicate evaluated against a metrics snapshot.
///
/// In configuration:
///
/// ```yaml
/// condition:
///   type: all
///   conditions:
///     - { type: compare, metric: trust, op: lt, threshold: 20 }
///     - { type: compare, metric: frustration, op: gt, threshold: 80 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerCondition {
    Compare {
        metric: String,
        op: ComparisonOp,
        threshold: f64,
    },
    All {
        conditions: Vec<TriggerCondition>,
    },
    Any {
        conditions: Vec<TriggerCondition>,
    },
    Not {
        condition: Box<TriggerCondition>,
    },
}

impl TriggerCondition {
    pub fn compare(metric: impl Into<String>, op: ComparisonOp, threshold: f64) -> Self {
        TriggerCondition::Compare {
            metric: metric.into(),
            op,
            threshold,
        }
    }

    /// Evaluates the predicate. A comparison on a metric absent from the
    /// snapshot is false.
    pub fn evaluate(&self, metrics: &MetricsSnapshot) -> bool {
        match self {
            TriggerCondition::Compare {
                metric,
                op,
                threshold,
            } => metrics
                .get(metric)
                .map(|value| op.apply(value, *threshold))
                .unwrap_or(false),
            TriggerCondition::All { conditions } => conditions.iter().all(|c| c.evaluate(metrics)),
            TriggerCondition::Any { conditions } => conditions.iter().any(|c| c.evaluate(metrics)),
            TriggerCondition::Not { condition } => !condition.evaluate(metrics),
        }
    }

    /// Every metric id the predicate reads.
    pub fn referenced_metrics(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_metrics(&mut out);
        out
    }

    fn collect_metrics<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            TriggerCondition::Compare { metric, .. } => out.push(metric),
            TriggerCondition::All { conditions } | TriggerCondition::Any { conditions } => {
                for condition in conditions {
                    condition.collect_metrics(out);
                }
            }
            TriggerCondition::Not { condition } => condition.collect_metrics(out),
        }
    }
}
