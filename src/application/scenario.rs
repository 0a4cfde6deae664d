//! Scripted scenarios, run one per task.
//!
//! A scenario is a list of operator lines paired with canned AI replies.
//! Running several of them against one configuration is how persona setups
//! are compared: each scenario gets its own engine, so results only differ
//! through the scripts and seeds.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::adapters::generation::ScriptedGenerator;
use crate::config::{ConfigError, SimulationConfig};
use crate::domain::foundation::SessionId;
use crate::domain::metrics::MetricsSnapshot;
use crate::ports::{NullObserver, SimulationObserver};

use super::{SessionBuilder, SimulationError, TurnOutcome, TurnRecord};

/// One scripted exchange.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ScriptedTurn {
    /// Operator line
    pub user: String,
    /// Canned AI reply for this turn
    pub ai: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Scenario {
    pub name: String,

    /// Overrides `simulation.seed` for this run
    #[serde(default)]
    pub seed: Option<u64>,

    pub turns: Vec<ScriptedTurn>,
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            seed: None,
            turns: Vec::new(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_turn(mut self, user: impl Into<String>, ai: impl Into<String>) -> Self {
        self.turns.push(ScriptedTurn {
            user: user.into(),
            ai: ai.into(),
        });
        self
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }
}

/// What happened when a scenario ran.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub session_id: SessionId,
    pub records: Vec<TurnRecord>,
    pub final_stage: String,
    pub final_metrics: MetricsSnapshot,
    /// Outcome of the last turn that ran
    pub final_outcome: Option<TurnOutcome>,
    /// Set when a turn failed and the scenario stopped early
    pub error: Option<String>,
}

impl ScenarioReport {
    /// True when the run ended on a terminal outcome rather than running out
    /// of script.
    pub fn ended(&self) -> bool {
        self.final_outcome.as_ref().is_some_and(TurnOutcome::is_terminal)
    }
}

/// Runs scenarios against one shared, read-only configuration.
#[derive(Clone)]
pub struct ScenarioRunner {
    config: Arc<SimulationConfig>,
    observer: Arc<dyn SimulationObserver>,
}

impl ScenarioRunner {
    pub fn new(config: Arc<SimulationConfig>) -> Self {
        Self {
            config,
            observer: Arc::new(NullObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SimulationObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Plays one scenario until its script runs out, a terminal outcome, or
    /// a generation failure.
    ///
    /// # Errors
    ///
    /// Only session construction fails the call; a failing turn is recorded
    /// in [`ScenarioReport::error`].
    pub async fn run_one(&self, scenario: &Scenario) -> Result<ScenarioReport, SimulationError> {
        let generator = ScriptedGenerator::from_replies(scenario.turns.iter().map(|t| t.ai.clone()));
        let mut session = SessionBuilder::new(&self.config)
            .seed(scenario.seed)
            .observer(self.observer.clone())
            .build(Arc::new(generator))?;

        let mut records = Vec::with_capacity(scenario.turns.len());
        let mut error = None;

        for turn in &scenario.turns {
            match session.run_turn(&turn.user).await {
                Ok(record) => {
                    let terminal = record.outcome.is_terminal();
                    records.push(record);
                    if terminal {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(scenario = %scenario.name, error = %e, "Scenario stopped early");
                    error = Some(e.to_string());
                    break;
                }
            }
        }

        let engine = session.engine();
        Ok(ScenarioReport {
            name: scenario.name.clone(),
            session_id: session.session_id(),
            final_outcome: records.last().map(|r| r.outcome.clone()),
            records,
            final_stage: engine.current_stage().id().to_string(),
            final_metrics: engine.get_metrics_state(),
            error,
        })
    }

    /// Runs every scenario on its own task. Results keep the input order.
    pub async fn run_all(&self, scenarios: Vec<Scenario>) -> Vec<Result<ScenarioReport, SimulationError>> {
        let handles = scenarios.into_iter().map(|scenario| {
            let runner = self.clone();
            tokio::spawn(async move { runner.run_one(&scenario).await })
        });

        join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.unwrap_or_else(|e| Err(SimulationError::TaskFailed(e.to_string()))))
            .collect()
    }
}
