//! Owns the named collection of metrics for one session.

use std::collections::{BTreeMap, HashMap};

use crate::domain::foundation::DomainError;

use super::{Metric, MetricDefinition, MetricsSnapshot};

/// Per-turn metric changes, keyed by metric id.
pub type MetricDeltas = BTreeMap<String, f64>;

/// Default number of history points used for trend estimation.
pub const DEFAULT_TREND_WINDOW: usize = 5;

/// Named, ordered collection of [`Metric`]s.
#[derive(Debug, Clone, Default)]
pub struct MetricsManager {
    metrics: Vec<Metric>,
    index: HashMap<String, usize>,
}

impl MetricsManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a manager from definitions, failing on the first invalid or
    /// duplicate entry.
    pub fn from_definitions<'a>(
        definitions: impl IntoIterator<Item = &'a MetricDefinition>,
    ) -> Result<Self, DomainError> {
        let mut manager = Self::new();
        for definition in definitions {
            manager.register(definition)?;
        }
        Ok(manager)
    }

    /// Registers a new metric at runtime.
    pub fn register(&mut self, definition: &MetricDefinition) -> Result<(), DomainError> {
        if self.index.contains_key(&definition.id) {
            return Err(DomainError::DuplicateMetric(definition.id.clone()));
        }
        let metric = Metric::new(definition)?;
        self.index.insert(definition.id.clone(), self.metrics.len());
        self.metrics.push(metric);
        Ok(())
    }

    /// Applies a delta to one metric.
    ///
    /// Unknown ids are ignored and reported through the return value: analyzers
    /// may emit signals for metrics the active configuration does not track.
    pub fn update(&mut self, metric_id: &str, delta: f64) -> bool {
        match self.index.get(metric_id) {
            Some(&i) => {
                self.metrics[i].update(delta);
                true
            }
            None => {
                tracing::debug!(metric = metric_id, delta, "Ignoring update for unknown metric");
                false
            }
        }
    }

    /// Advances every registered metric by one turn.
    ///
    /// Metrics missing from `deltas` get a zero delta, so they still decay.
    /// Returns how many entries of `deltas` matched a known metric; the rest
    /// are ignored.
    pub fn update_all(&mut self, deltas: &MetricDeltas) -> usize {
        for metric in &mut self.metrics {
            let delta = deltas.get(metric.id()).copied().unwrap_or(0.0);
            metric.update(delta);
        }

        let mut matched = 0;
        for (id, delta) in deltas {
            if self.index.contains_key(id) {
                matched += 1;
            } else {
                tracing::debug!(metric = %id, delta, "Ignoring update for unknown metric");
            }
        }
        matched
    }

    /// Copy of every current value, in registration order.
    pub fn get_metrics_state(&self) -> MetricsSnapshot {
        self.metrics.iter().map(|m| (m.id(), m.value())).collect()
    }

    /// Least-squares slope of the last `window` values of a metric; 0.0 for
    /// unknown ids or short histories.
    pub fn get_trend(&self, metric_id: &str, window: usize) -> f64 {
        self.get(metric_id).map_or(0.0, |m| m.trend(window))
    }

    /// Trend of every metric over the same window.
    pub fn get_trends(&self, window: usize) -> MetricsSnapshot {
        self.metrics.iter().map(|m| (m.id(), m.trend(window))).collect()
    }

    pub fn get(&self, metric_id: &str) -> Option<&Metric> {
        self.index.get(metric_id).map(|&i| &self.metrics[i])
    }

    pub fn value(&self, metric_id: &str) -> Option<f64> {
        self.get(metric_id).map(Metric::value)
    }

    pub fn contains(&self, metric_id: &str) -> bool {
        self.index.contains_key(metric_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Metric> {
        self.metrics.iter()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> MetricsManager {
        MetricsManager::from_definitions(&[
            MetricDefinition::new("interest", 0.0, 100.0, 30.0).with_decay_factor(1.0),
            MetricDefinition::new("trust", 0.0, 100.0, 50.0).with_decay_factor(0.5),
        ])
        .unwrap()
    }

    mod construction {
        use super::*;

        #[test]
        fn rejects_duplicate_ids() {
            let result = MetricsManager::from_definitions(&[
                MetricDefinition::new("trust", 0.0, 1.0, 0.5),
                MetricDefinition::new("trust", 0.0, 1.0, 0.5),
            ]);
            assert_eq!(result.unwrap_err(), DomainError::DuplicateMetric("trust".into()));
        }

        #[test]
        fn rejects_invalid_definition() {
            let result =
                MetricsManager::from_definitions(&[MetricDefinition::new("trust", 1.0, 0.0, 0.5)]);
            assert!(result.is_err());
        }

        #[test]
        fn register_adds_metric_at_runtime() {
            let mut m = manager();
            m.register(&MetricDefinition::new("urgency", 0.0, 10.0, 0.0)).unwrap();
            assert_eq!(m.len(), 3);
            assert_eq!(m.value("urgency"), Some(0.0));
        }

        #[test]
        fn register_rejects_existing_id() {
            let mut m = manager();
            assert!(m.register(&MetricDefinition::new("trust", 0.0, 1.0, 0.0)).is_err());
        }
    }

    mod updates {
        use super::*;

        #[test]
        fn update_known_metric_returns_true() {
            let mut m = manager();
            assert!(m.update("interest", 5.0));
            assert_eq!(m.value("interest"), Some(35.0));
        }

        #[test]
        fn update_unknown_metric_is_a_no_op() {
            let mut m = manager();
            let before = m.get_metrics_state();
            assert!(!m.update("does_not_exist", 5.0));
            assert_eq!(m.get_metrics_state(), before);
        }

        #[test]
        fn update_all_counts_matched_metrics() {
            let mut m = manager();
            let deltas: MetricDeltas = [
                ("interest".to_string(), 1.0),
                ("ghost".to_string(), 1.0),
            ]
            .into_iter()
            .collect();
            assert_eq!(m.update_all(&deltas), 1);
        }

        #[test]
        fn update_all_decays_metrics_without_a_delta() {
            let mut m = manager();
            let deltas: MetricDeltas = [("interest".to_string(), 1.0)].into_iter().collect();
            m.update_all(&deltas);
            m.update_all(&deltas);

            assert_eq!(m.value("interest"), Some(32.0));
            assert_eq!(m.value("trust"), Some(12.5));
            assert_eq!(m.get("trust").unwrap().history().len(), 3);
        }

        #[test]
        fn update_all_with_no_deltas_still_advances_every_metric() {
            let mut m = manager();
            m.update_all(&MetricDeltas::new());
            assert_eq!(m.value("trust"), Some(25.0));
            assert_eq!(m.get("interest").unwrap().history().len(), 2);
        }
    }

    mod snapshots {
        use super::*;

        #[test]
        fn state_follows_registration_order() {
            let ids: Vec<String> = manager()
                .get_metrics_state()
                .ids()
                .map(str::to_string)
                .collect();
            assert_eq!(ids, vec!["interest", "trust"]);
        }

        #[test]
        fn state_is_a_detached_copy() {
            let mut m = manager();
            let snapshot = m.get_metrics_state();
            m.update("interest", 10.0);
            assert_eq!(snapshot.get("interest"), Some(30.0));
        }

        #[test]
        fn trend_of_unknown_metric_is_zero() {
            assert_eq!(manager().get_trend("ghost", 5), 0.0);
        }

        #[test]
        fn trends_cover_every_metric() {
            let mut m = manager();
            m.update("interest", 10.0);
            let trends = m.get_trends(DEFAULT_TREND_WINDOW);
            assert_eq!(trends.len(), 2);
            assert!((trends.get("interest").unwrap() - 10.0).abs() < 1e-9);
        }
    }
}
