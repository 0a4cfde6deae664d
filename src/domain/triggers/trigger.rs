//! Named actions fired when metrics cross configured thresholds.

use serde::{Deserialize, Serialize};

use crate::domain::metrics::MetricsSnapshot;

use super::TriggerCondition;

/// A predicate plus the action it fires and the message shown to the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub condition: TriggerCondition,
    pub action: String,
    pub message: String,
}

impl Trigger {
    pub fn new(condition: TriggerCondition, action: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            condition,
            action: action.into(),
            message: message.into(),
        }
    }

    pub fn is_fired(&self, metrics: &MetricsSnapshot) -> bool {
        self.condition.evaluate(metrics)
    }
}

/// First trigger, in declaration order, whose condition holds.
pub fn first_fired<'a>(triggers: &'a [Trigger], metrics: &MetricsSnapshot) -> Option<&'a Trigger> {
    triggers.iter().find(|t| t.is_fired(metrics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::triggers::ComparisonOp;

    #[test]
    fn first_matching_trigger_wins() {
        let triggers = vec![
            Trigger::new(
                TriggerCondition::compare("trust", ComparisonOp::Gt, 90.0),
                "close",
                "Ready to close",
            ),
            Trigger::new(
                TriggerCondition::compare("trust", ComparisonOp::Lt, 20.0),
                "escalate",
                "Trust collapsed",
            ),
            Trigger::new(
                TriggerCondition::compare("trust", ComparisonOp::Lt, 30.0),
                "warn",
                "Trust falling",
            ),
        ];
        let metrics = MetricsSnapshot::new().with("trust", 10.0);
        assert_eq!(first_fired(&triggers, &metrics).map(|t| t.action.as_str()), Some("escalate"));
    }

    #[test]
    fn no_trigger_fires_on_quiet_metrics() {
        let triggers = vec![Trigger::new(
            TriggerCondition::compare("trust", ComparisonOp::Lt, 20.0),
            "escalate",
            "Trust collapsed",
        )];
        let metrics = MetricsSnapshot::new().with("trust", 50.0);
        assert!(first_fired(&triggers, &metrics).is_none());
    }
}
