//! A single bounded, decaying metric.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::DomainError;

/// Static definition of a metric, as it appears in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDefinition {
    /// Unique metric identifier.
    pub id: String,
    /// Lower bound (inclusive).
    pub min: f64,
    /// Upper bound (inclusive).
    pub max: f64,
    /// Starting value; must lie within the bounds.
    pub initial: f64,
    /// Per-update retention factor in (0, 1].
    #[serde(default = "default_decay_factor")]
    pub decay_factor: f64,
}

impl MetricDefinition {
    /// Creates a definition with the default decay factor.
    pub fn new(id: impl Into<String>, min: f64, max: f64, initial: f64) -> Self {
        Self {
            id: id.into(),
            min,
            max,
            initial,
            decay_factor: default_decay_factor(),
        }
    }

    /// Sets the decay factor.
    pub fn with_decay_factor(mut self, decay_factor: f64) -> Self {
        self.decay_factor = decay_factor;
        self
    }

    /// Checks bounds, initial value and decay factor.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.id.trim().is_empty() {
            return Err(DomainError::empty_field("metric.id"));
        }
        if !(self.min.is_finite() && self.max.is_finite()) || self.min >= self.max {
            return Err(DomainError::invalid_bounds(&self.id, self.min, self.max));
        }
        if !(self.min..=self.max).contains(&self.initial) {
            return Err(DomainError::InitialOutOfRange {
                metric: self.id.clone(),
                value: self.initial,
                min: self.min,
                max: self.max,
            });
        }
        if !(self.decay_factor > 0.0 && self.decay_factor <= 1.0) {
            return Err(DomainError::InvalidDecayFactor {
                metric: self.id.clone(),
                value: self.decay_factor,
            });
        }
        Ok(())
    }
}

fn default_decay_factor() -> f64 {
    0.95
}

/// A bounded scalar signal that decays toward zero between reinforcements.
///
/// `min <= value <= max` holds after every operation. The history starts with
/// the initial value and grows by one entry per update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    id: String,
    min: f64,
    max: f64,
    value: f64,
    decay_factor: f64,
    history: Vec<f64>,
}

impl Metric {
    /// Builds a metric from a validated definition.
    pub fn new(definition: &MetricDefinition) -> Result<Self, DomainError> {
        definition.validate()?;
        Ok(Self {
            id: definition.id.clone(),
            min: definition.min,
            max: definition.max,
            value: definition.initial,
            decay_factor: definition.decay_factor,
            history: vec![definition.initial],
        })
    }

    /// Applies one turn of decay plus `delta`, clamped to the bounds.
    ///
    /// A non-finite delta is treated as zero so the metric still decays.
    pub fn update(&mut self, delta: f64) -> f64 {
        let delta = if delta.is_finite() { delta } else { 0.0 };
        let next = self.value * self.decay_factor + delta;
        self.value = next.clamp(self.min, self.max);
        self.history.push(self.value);
        self.value
    }

    /// Least-squares slope over the last `window` history points.
    ///
    /// Returns 0.0 when fewer than two points are available.
    pub fn trend(&self, window: usize) -> f64 {
        let start = self.history.len().saturating_sub(window);
        least_squares_slope(&self.history[start..])
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn decay_factor(&self) -> f64 {
        self.decay_factor
    }

    /// All recorded values, oldest first.
    pub fn history(&self) -> &[f64] {
        &self.history
    }
}

fn least_squares_slope(points: &[f64]) -> f64 {
    let n = points.len();
    if n < 2 {
        return 0.0;
    }

    let mean_x = (n - 1) as f64 / 2.0;
    let mean_y = points.iter().sum::<f64>() / n as f64;

    let (numerator, denominator) = points.iter().enumerate().fold(
        (0.0, 0.0),
        |(num, den), (i, &y)| {
            let dx = i as f64 - mean_x;
            (num + dx * (y - mean_y), den + dx * dx)
        },
    );

    numerator / denominator
}
