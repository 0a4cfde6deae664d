//! A named conversation phase with per-metric acceptance ranges.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::foundation::DomainError;
use crate::domain::metrics::MetricsSnapshot;

/// Acceptance interval for one metric.
///
/// Written in configuration as a two-element list: `trust: [40, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct ConditionRange {
    pub min: f64,
    pub max: f64,
}

impl ConditionRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Normalized position of `value` inside the range, clamped to [0, 1].
    ///
    /// A zero-width range scores 1 at or above its bound and 0 below it.
    pub fn score(&self, value: f64) -> f64 {
        let width = self.max - self.min;
        if width.abs() < f64::EPSILON {
            return if value >= self.min { 1.0 } else { 0.0 };
        }
        ((value - self.min) / width).clamp(0.0, 1.0)
    }

    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

impl From<[f64; 2]> for ConditionRange {
    fn from([min, max]: [f64; 2]) -> Self {
        Self { min, max }
    }
}

impl From<ConditionRange> for [f64; 2] {
    fn from(range: ConditionRange) -> Self {
        [range.min, range.max]
    }
}

/// Static definition of a stage, as it appears in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDefinition {
    pub id: String,
    #[serde(default)]
    pub conditions: BTreeMap<String, ConditionRange>,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub custom_responses: BTreeMap<String, String>,
}

impl StageDefinition {
    /// Creates a definition with no conditions.
    pub fn new(id: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            conditions: BTreeMap::new(),
            instructions: instructions.into(),
            custom_responses: BTreeMap::new(),
        }
    }

    /// Adds an acceptance range for a metric.
    pub fn with_condition(mut self, metric: impl Into<String>, min: f64, max: f64) -> Self {
        self.conditions.insert(metric.into(), ConditionRange::new(min, max));
        self
    }

    /// Adds a keyed canned response.
    pub fn with_response(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.custom_responses.insert(key.into(), text.into());
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.id.trim().is_empty() {
            return Err(DomainError::empty_field("stage.id"));
        }
        for (metric, range) in &self.conditions {
            if !(range.min.is_finite() && range.max.is_finite()) || range.min > range.max {
                return Err(DomainError::invalid_condition(
                    &self.id, metric, range.min, range.max,
                ));
            }
        }
        Ok(())
    }
}

/// A conversation phase.
///
/// Conditions only change through [`adjust_conditions`](Stage::adjust_conditions).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stage {
    id: String,
    conditions: BTreeMap<String, ConditionRange>,
    instructions: String,
    custom_responses: BTreeMap<String, String>,
}

impl Stage {
    pub fn new(definition: &StageDefinition) -> Result<Self, DomainError> {
        definition.validate()?;
        Ok(Self {
            id: definition.id.clone(),
            conditions: definition.conditions.clone(),
            instructions: definition.instructions.clone(),
            custom_responses: definition.custom_responses.clone(),
        })
    }

    /// Soft fit of this stage to a metrics snapshot.
    ///
    /// Mean of the per-metric range scores over metrics present both in the
    /// conditions and the snapshot; 0.0 when there is no overlap.
    pub fn check_conditions(&self, metrics: &MetricsSnapshot) -> f64 {
        let scores: Vec<f64> = self
            .conditions
            .iter()
            .filter_map(|(id, range)| metrics.get(id).map(|value| range.score(value)))
            .collect();

        if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        }
    }

    /// Custom response for `key`, falling back to the stage instructions.
    pub fn response_for(&self, key: &str) -> &str {
        self.custom_responses
            .get(key)
            .map(String::as_str)
            .unwrap_or(self.instructions.as_str())
    }

    /// Shifts each condition interval toward the observed value of its metric.
    ///
    /// Each interval keeps its width and moves by `rate * (value - midpoint)`.
    /// `rate` is clamped to [0, 1]; metrics missing from the snapshot are left
    /// alone.
    pub fn adjust_conditions(&mut self, metrics: &MetricsSnapshot, rate: f64) {
        let rate = rate.clamp(0.0, 1.0);
        if rate == 0.0 {
            return;
        }
        for (id, range) in self.conditions.iter_mut() {
            if let Some(value) = metrics.get(id) {
                let offset = rate * (value - range.midpoint());
                range.min += offset;
                range.max += offset;
            }
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn conditions(&self) -> &BTreeMap<String, ConditionRange> {
        &self.conditions
    }

    pub fn condition(&self, metric: &str) -> Option<ConditionRange> {
        self.conditions.get(metric).copied()
    }

    pub fn custom_responses(&self) -> &BTreeMap<String, String> {
        &self.custom_responses
    }
}
