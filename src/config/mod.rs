//! Simulation configuration module
//!
//! A simulation is described by one file (YAML, JSON or TOML) holding the
//! metrics, stages, triggers and run policy. [`SimulationConfig::load`]
//! layers environment variables with the `DIALOGUE_STAGES` prefix on top of
//! the file; nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use dialogue_stages::config::SimulationConfig;
//!
//! let config = SimulationConfig::load("sales_call.yaml").expect("Failed to load configuration");
//! println!("{} stages, {} metrics", config.stages.len(), config.metrics.len());
//! ```

mod analyzers;
mod error;
mod knowledge;
mod llm;
mod simulation;

pub use analyzers::{AnalyzersConfig, CustomMetricConfig};
pub use error::{ConfigError, ValidationError};
pub use knowledge::{KnowledgeConfig, KnowledgeEntryConfig};
pub use llm::{LlmConfig, LlmProvider};
pub use simulation::SimulationSettings;

use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use crate::domain::foundation::DomainError;
use crate::domain::metrics::MetricDefinition;
use crate::domain::stages::StageDefinition;
use crate::domain::triggers::Trigger;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "DIALOGUE_STAGES";

/// Root simulation configuration
///
/// Immutable once loaded; every session built from it gets its own copies of
/// the metric and stage state.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Persona instructions sent with every prompt
    #[serde(default)]
    pub global_instructions: String,

    pub metrics: Vec<MetricDefinition>,

    pub stages: Vec<StageDefinition>,

    /// Stage to start in; best fit for the initial metrics when absent
    #[serde(default)]
    pub initial_stage: Option<String>,

    /// Checked in order after every turn; the first match fires
    #[serde(default)]
    pub triggers: Vec<Trigger>,

    #[serde(default)]
    pub simulation: SimulationSettings,

    #[serde(default)]
    pub analyzers: AnalyzersConfig,

    /// Background passages matched against the operator's text
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Only needed when replies come from an LLM
    #[serde(default)]
    pub llm: Option<LlmConfig>,
}

impl SimulationConfig {
    /// Load configuration from a file plus environment overrides
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads the file at `path`, format chosen by extension
    /// 3. Applies `DIALOGUE_STAGES__SECTION__KEY` environment variables
    /// 4. Validates the result
    ///
    /// # Environment Variable Format
    ///
    /// - `DIALOGUE_STAGES__SIMULATION__MAX_TURNS=30` -> `simulation.max_turns = 30`
    /// - `DIALOGUE_STAGES__LLM__API_KEY=...` -> `llm.api_key = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or parsed, or if
    /// validation fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config: SimulationConfig = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::default().prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a YAML document, without environment overrides.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` on the first invalid value.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.metrics.is_empty() {
            return Err(ValidationError::NoMetrics);
        }
        let mut metric_ids = HashSet::new();
        for metric in &self.metrics {
            metric.validate()?;
            if !metric_ids.insert(metric.id.as_str()) {
                return Err(DomainError::DuplicateMetric(metric.id.clone()).into());
            }
        }

        if self.stages.is_empty() {
            return Err(ValidationError::NoStages);
        }
        let mut stage_ids = HashSet::new();
        for stage in &self.stages {
            stage.validate()?;
            if !stage_ids.insert(stage.id.as_str()) {
                return Err(DomainError::DuplicateStage(stage.id.clone()).into());
            }
        }

        if let Some(initial) = &self.initial_stage {
            if !stage_ids.contains(initial.as_str()) {
                return Err(ValidationError::UnknownInitialStage(initial.clone()));
            }
        }

        self.simulation.validate()?;
        self.analyzers.validate()?;
        self.knowledge.validate()?;
        if let Some(llm) = &self.llm {
            llm.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::io::Write;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const SALES_CALL: &str = r#"
global_instructions: You are a skeptical CTO evaluating a training vendor.
metrics:
  - { id: trust, min: 0, max: 100, initial: 30 }
  - { id: interest, min: 0, max: 100, initial: 20, decay_factor: 0.9 }
stages:
  - id: rapport
    conditions: { trust: [0, 40] }
    instructions: Be guarded and brief.
  - id: discovery
    conditions: { trust: [40, 100], interest: [0, 60] }
    instructions: Share your team's pain points.
    custom_responses:
      pricing: Ask for a ballpark before going further.
triggers:
  - condition: { type: compare, metric: trust, op: lt, threshold: 5 }
    action: hang_up
    message: The client ended the call.
simulation:
  max_turns: 12
  end_phrases: [goodbye, "talk soon"]
analyzers:
  sentiment_scale: 10
  custom_metrics:
    - { metric: interest, keywords: [demo, pricing], weight: 5, max: 10 }
knowledge:
  top_k: 2
  entries:
    - topic: ROI
      text: Teams usually see payback within two quarters.
      keywords: [budget, payback]
"#;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_full_document() {
        let config = SimulationConfig::from_yaml_str(SALES_CALL).unwrap();

        assert_eq!(config.metrics.len(), 2);
        assert_eq!(config.metrics[0].decay_factor, 0.95);
        assert_eq!(config.metrics[1].decay_factor, 0.9);
        assert_eq!(config.stages[1].custom_responses["pricing"], "Ask for a ballpark before going further.");
        assert_eq!(config.triggers[0].action, "hang_up");
        assert_eq!(config.simulation.max_turns, 12);
        assert_eq!(config.simulation.end_phrases, vec!["goodbye", "talk soon"]);
        assert_eq!(config.analyzers.sentiment_scale, 10.0);
        assert_eq!(config.analyzers.custom_metrics[0].weight, 5.0);
        assert_eq!(config.knowledge.top_k, 2);
        assert_eq!(config.knowledge.entries[0].keywords, vec!["budget", "payback"]);
        assert!(config.llm.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let file = write_temp(SALES_CALL);

        let config = SimulationConfig::load(file.path()).unwrap();
        assert_eq!(config.stages[0].id, "rapport");
        assert_eq!(config.simulation.max_turns, 12);
    }

    #[test]
    fn test_environment_overrides_file() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let file = write_temp(SALES_CALL);

        env::set_var("DIALOGUE_STAGES__SIMULATION__MAX_TURNS", "3");
        let result = SimulationConfig::load(file.path());
        env::remove_var("DIALOGUE_STAGES__SIMULATION__MAX_TURNS");

        assert_eq!(result.unwrap().simulation.max_turns, 3);
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let result = SimulationConfig::load("/nonexistent/simulation.yaml");
        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }

    mod validation {
        use super::*;

        fn parsed() -> SimulationConfig {
            serde_yaml::from_str(SALES_CALL).unwrap()
        }

        #[test]
        fn test_requires_metrics_and_stages() {
            let mut config = parsed();
            config.metrics.clear();
            assert_eq!(config.validate(), Err(ValidationError::NoMetrics));

            let mut config = parsed();
            config.stages.clear();
            assert_eq!(config.validate(), Err(ValidationError::NoStages));
        }

        #[test]
        fn test_rejects_duplicate_ids() {
            let mut config = parsed();
            config.metrics.push(config.metrics[0].clone());
            assert_eq!(
                config.validate(),
                Err(ValidationError::Domain(DomainError::DuplicateMetric("trust".into())))
            );

            let mut config = parsed();
            config.stages.push(config.stages[0].clone());
            assert_eq!(
                config.validate(),
                Err(ValidationError::Domain(DomainError::DuplicateStage("rapport".into())))
            );
        }

        #[test]
        fn test_rejects_bad_metric_bounds() {
            let mut config = parsed();
            config.metrics[0].min = 200.0;
            assert!(matches!(config.validate(), Err(ValidationError::Domain(_))));
        }

        #[test]
        fn test_initial_stage_must_exist() {
            let mut config = parsed();
            config.initial_stage = Some("closing".into());
            assert_eq!(
                config.validate(),
                Err(ValidationError::UnknownInitialStage("closing".into()))
            );

            config.initial_stage = Some("discovery".into());
            assert!(config.validate().is_ok());
        }

        #[test]
        fn test_llm_section_validated_when_present() {
            let mut config = parsed();
            config.llm = Some(LlmConfig::default());
            assert_eq!(config.validate(), Err(ValidationError::MissingRequired("llm.api_key")));
        }

        #[test]
        fn test_knowledge_section_validated() {
            let mut config = parsed();
            config.knowledge.entries[0].text.clear();
            assert_eq!(config.validate(), Err(ValidationError::IncompleteKnowledgeEntry(0)));
        }

        #[test]
        fn test_from_yaml_str_reports_validation_failure() {
            let yaml = SALES_CALL.replace("max_turns: 12", "max_turns: 0");
            assert!(matches!(
                SimulationConfig::from_yaml_str(&yaml),
                Err(ConfigError::ValidationFailed(ValidationError::InvalidMaxTurns))
            ));
        }
    }
}
