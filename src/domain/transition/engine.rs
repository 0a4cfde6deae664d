//! Stage-transition engine.
//!
//! Combines the metrics and stage managers with a learned transition matrix.
//! Each update nominates the best-fitting stage for the new metrics; the move
//! is committed only with the probability recorded in the matrix, so the
//! engine resists abrupt jumps until reinforcement accumulates.
//!
//! The transition semantics (uniform prior, fixed increment, renormalize) are
//! a heuristic carried over as a behavioral contract. They are not derived
//! from Bayesian inference and should not be read as calibrated probabilities.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::VecDeque;

use crate::domain::foundation::DomainError;
use crate::domain::metrics::{MetricDefinition, MetricDeltas, MetricsManager, MetricsSnapshot};
use crate::domain::stages::{Stage, StageDefinition, StageManager};

use super::{
    ConversationContext, EngineError, TransitionExplanation, TransitionMatrix, Turn,
    REINFORCEMENT_INCREMENT,
};

/// Number of turns kept in the conversation history.
pub const HISTORY_LIMIT: usize = 5;

/// Scale applied to the success score in [`StageTransitionEngine::learn_from_success`].
pub const LEARNING_RATE: f64 = 0.1;

/// What happened to the active stage during one update.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransitionOutcome {
    /// The best-fitting stage is already active.
    Stayed { stage: String },
    /// A different stage fit better but the draw did not clear its probability.
    Held {
        current: String,
        candidate: String,
        probability: f64,
    },
    /// The active stage moved.
    Transitioned {
        from: String,
        to: String,
        probability: f64,
    },
}

impl TransitionOutcome {
    pub fn is_transition(&self) -> bool {
        matches!(self, TransitionOutcome::Transitioned { .. })
    }
}

/// Stage-transition state machine for one conversation session.
///
/// Not synchronized: mutate from a single task, or wrap in a mutex when an
/// engine must be shared.
#[derive(Debug, Clone)]
pub struct StageTransitionEngine {
    metrics: MetricsManager,
    stages: StageManager,
    current: usize,
    last_transition: Option<(usize, usize)>,
    history: VecDeque<Turn>,
    matrix: TransitionMatrix,
    rng: StdRng,
}

impl StageTransitionEngine {
    /// Creates an engine with a uniform prior and an entropy-seeded RNG.
    ///
    /// The initial stage is the best fit for the initial metric values.
    pub fn new(metrics: MetricsManager, stages: StageManager) -> Self {
        let (current, _) = stages.best_match(&metrics.get_metrics_state());
        let matrix = TransitionMatrix::uniform(stages.len());
        Self {
            metrics,
            stages,
            current,
            last_transition: None,
            history: VecDeque::with_capacity(HISTORY_LIMIT),
            matrix,
            rng: StdRng::from_entropy(),
        }
    }

    /// Reseeds the transition RNG for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Starts the session in a named stage instead of the best fit.
    pub fn with_initial_stage(mut self, stage_id: &str) -> Result<Self, EngineError> {
        self.current = self
            .stages
            .index_of(stage_id)
            .ok_or_else(|| DomainError::UnknownStage(stage_id.to_string()))?;
        Ok(self)
    }

    /// Replaces the transition prior. The matrix must match the stage count.
    pub fn with_transition_matrix(mut self, matrix: TransitionMatrix) -> Result<Self, EngineError> {
        if matrix.size() != self.stages.len() {
            return Err(EngineError::DimensionMismatch {
                expected: self.stages.len(),
                rows: matrix.size(),
            });
        }
        self.matrix = matrix;
        Ok(self)
    }

    /// Applies one turn: metric deltas, history, and a possible stage move.
    pub fn update(&mut self, deltas: &MetricDeltas, user_text: &str, ai_text: &str) -> TransitionOutcome {
        self.metrics.update_all(deltas);

        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(Turn::new(user_text, ai_text));

        self.last_transition = None;
        let (candidate, _) = self.stages.best_match(&self.metrics.get_metrics_state());
        let current_id = self.stage_id(self.current);

        if candidate == self.current {
            return TransitionOutcome::Stayed { stage: current_id };
        }

        let probability = self.matrix.probability(self.current, candidate);
        let draw: f64 = self.rng.gen();

        if draw < probability {
            let from = self.current;
            self.current = candidate;
            self.matrix.reinforce(from, candidate, REINFORCEMENT_INCREMENT);
            self.last_transition = Some((from, candidate));
            tracing::debug!(from = %current_id, to = %self.stage_id(candidate), probability, "Stage transition committed");
            TransitionOutcome::Transitioned {
                from: current_id,
                to: self.stage_id(candidate),
                probability,
            }
        } else {
            tracing::debug!(current = %current_id, candidate = %self.stage_id(candidate), probability, draw, "Stage transition held");
            TransitionOutcome::Held {
                current: current_id,
                candidate: self.stage_id(candidate),
                probability,
            }
        }
    }

    /// Nudges the current stage's conditions toward the current metrics.
    ///
    /// Best-effort heuristic for external feedback: `success_score` is
    /// clamped to [0, 1] and scaled by [`LEARNING_RATE`]. It is not a
    /// calibrated learning rule.
    pub fn learn_from_success(&mut self, success_score: f64) {
        let rate = LEARNING_RATE * success_score.clamp(0.0, 1.0);
        let snapshot = self.metrics.get_metrics_state();
        if let Some(stage) = self.stages.get_mut(self.current) {
            stage.adjust_conditions(&snapshot, rate);
        }
    }

    /// Owned snapshot of stage, metrics and recent history.
    ///
    /// `knowledge` is left empty; retrieval happens outside the engine.
    pub fn get_context(&self) -> ConversationContext {
        let stage = self.current_stage();
        ConversationContext {
            current_stage_id: stage.id().to_string(),
            instructions: stage.instructions().to_string(),
            metrics: self.metrics.get_metrics_state(),
            history: self.history.iter().cloned().collect(),
            knowledge: Vec::new(),
        }
    }

    /// Explains the current stage in terms of the metrics.
    pub fn explain(&self) -> TransitionExplanation {
        let metrics = self.metrics.get_metrics_state();
        TransitionExplanation {
            current_stage: self.current_stage().id().to_string(),
            transitioned_from: self.last_transition.map(|(from, _)| self.stage_id(from)),
            stage_score: self.current_stage().check_conditions(&metrics),
            metrics,
        }
    }

    /// Adds a stage mid-session and grows the transition matrix to match.
    pub fn add_stage(&mut self, definition: &StageDefinition) -> Result<usize, EngineError> {
        let index = self.stages.add_custom_stage(definition)?;
        self.matrix.grow();
        Ok(index)
    }

    /// Registers a custom metric mid-session.
    pub fn register_metric(&mut self, definition: &MetricDefinition) -> Result<(), EngineError> {
        self.metrics.register(definition)?;
        Ok(())
    }

    pub fn current_stage(&self) -> &Stage {
        &self.stages.stages()[self.current]
    }

    pub fn get_metrics_state(&self) -> MetricsSnapshot {
        self.metrics.get_metrics_state()
    }

    pub fn metrics(&self) -> &MetricsManager {
        &self.metrics
    }

    pub fn stages(&self) -> &StageManager {
        &self.stages
    }

    pub fn transition_matrix(&self) -> &TransitionMatrix {
        &self.matrix
    }

    pub fn history(&self) -> impl Iterator<Item = &Turn> {
        self.history.iter()
    }

    fn stage_id(&self, index: usize) -> String {
        self.stages.stages()[index].id().to_string()
    }
}
