//! Read-only copies of metric state.

use serde::ser::{Serialize, Serializer};

/// Ordered `metric id -> value` copy, detached from the live metrics.
///
/// Iteration follows metric registration order. Serializes as a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    readings: Vec<(String, f64)>,
}

impl MetricsSnapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a value, replacing an existing reading with the same id.
    pub fn insert(&mut self, id: impl Into<String>, value: f64) {
        let id = id.into();
        match self.readings.iter_mut().find(|(existing, _)| *existing == id) {
            Some((_, slot)) => *slot = value,
            None => self.readings.push((id, value)),
        }
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, id: impl Into<String>, value: f64) -> Self {
        self.insert(id, value);
        self
    }

    pub fn get(&self, id: &str) -> Option<f64> {
        self.readings
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, value)| *value)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.readings.iter().map(|(id, value)| (id.as_str(), *value))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.readings.iter().map(|(id, _)| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for MetricsSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for (id, value) in iter {
            snapshot.insert(id, value);
        }
        snapshot
    }
}

impl Serialize for MetricsSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}
