//! Ordered collection of stages with best-fit selection.

use crate::domain::foundation::DomainError;
use crate::domain::metrics::MetricsSnapshot;

use super::{Stage, StageDefinition};

/// Non-empty, ordered set of [`Stage`]s with unique ids.
///
/// Order matters only as a tie-break: when two stages score the same, the
/// earlier one wins.
#[derive(Debug, Clone)]
pub struct StageManager {
    stages: Vec<Stage>,
}

impl StageManager {
    /// Builds the manager, failing on an empty list, an invalid definition or
    /// a duplicate id.
    pub fn from_definitions<'a>(
        definitions: impl IntoIterator<Item = &'a StageDefinition>,
    ) -> Result<Self, DomainError> {
        let mut stages: Vec<Stage> = Vec::new();
        for definition in definitions {
            if stages.iter().any(|s| s.id() == definition.id) {
                return Err(DomainError::DuplicateStage(definition.id.clone()));
            }
            stages.push(Stage::new(definition)?);
        }

        if stages.is_empty() {
            return Err(DomainError::NoStages);
        }

        Ok(Self { stages })
    }

    /// Index and score of the best-fitting stage for `metrics`.
    pub fn best_match(&self, metrics: &MetricsSnapshot) -> (usize, f64) {
        let mut best = (0, self.stages[0].check_conditions(metrics));
        for (i, stage) in self.stages.iter().enumerate().skip(1) {
            let score = stage.check_conditions(metrics);
            if score > best.1 {
                best = (i, score);
            }
        }
        best
    }

    /// The stage whose conditions best fit `metrics`.
    pub fn get_current_stage(&self, metrics: &MetricsSnapshot) -> &Stage {
        let (index, _) = self.best_match(metrics);
        &self.stages[index]
    }

    /// Appends a stage and returns its index.
    ///
    /// A live [`StageTransitionEngine`](crate::domain::transition::StageTransitionEngine)
    /// must grow its transition matrix to match; use its `add_stage` instead
    /// of calling this directly.
    pub fn add_custom_stage(&mut self, definition: &StageDefinition) -> Result<usize, DomainError> {
        if self.index_of(&definition.id).is_some() {
            return Err(DomainError::DuplicateStage(definition.id.clone()));
        }
        self.stages.push(Stage::new(definition)?);
        Ok(self.stages.len() - 1)
    }

    pub fn index_of(&self, stage_id: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.id() == stage_id)
    }

    pub fn get(&self, index: usize) -> Option<&Stage> {
        self.stages.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Stage> {
        self.stages.get_mut(index)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Always false: a manager holds at least one stage.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
