//! Wiring a validated [`SimulationConfig`] into a runnable session.

use std::sync::Arc;

use crate::adapters::ai::{AnthropicProvider, MockAIProvider, OpenAIProvider};
use crate::adapters::analyzers::{
    ConversationFlowAnalyzer, KeywordMetricAnalyzer, LongTermTrendAnalyzer, SentimentAnalyzer,
    TopicCoherenceAnalyzer,
};
use crate::adapters::generation::LlmResponseGenerator;
use crate::config::{AnalyzersConfig, LlmConfig, LlmProvider, SimulationConfig, ValidationError};
use crate::domain::foundation::SessionId;
use crate::domain::metrics::MetricsManager;
use crate::domain::stages::StageManager;
use crate::domain::transition::StageTransitionEngine;
use crate::ports::{AIProvider, NullObserver, ResponseGenerator, SimulationObserver, TurnAnalyzer};

use super::{SimulationError, TurnOrchestrator};

/// Fresh engine for one session: own metric values, own stage conditions.
///
/// `seed` overrides `simulation.seed`; with neither, the RNG is seeded from
/// entropy.
pub fn build_engine(config: &SimulationConfig, seed: Option<u64>) -> Result<StageTransitionEngine, SimulationError> {
    let metrics = MetricsManager::from_definitions(&config.metrics)?;
    let stages = StageManager::from_definitions(&config.stages)?;
    let mut engine = StageTransitionEngine::new(metrics, stages);

    if let Some(stage_id) = config.initial_stage.as_deref() {
        engine = engine.with_initial_stage(stage_id)?;
    }
    if let Some(seed) = seed.or(config.simulation.seed) {
        engine = engine.with_seed(seed);
    }
    Ok(engine)
}

/// Analyzer pipeline in a fixed order: sentiment, topic coherence, custom
/// metrics, long-term trends, conversation flow.
pub fn build_analyzers(config: &AnalyzersConfig) -> Result<Vec<Box<dyn TurnAnalyzer>>, ValidationError> {
    let mut analyzers: Vec<Box<dyn TurnAnalyzer>> = Vec::new();

    if config.sentiment {
        analyzers.push(Box::new(SentimentAnalyzer::new().with_scale(config.sentiment_scale)));
    }
    if config.topic_coherence {
        analyzers.push(Box::new(TopicCoherenceAnalyzer::new()));
    }
    if !config.custom_metrics.is_empty() {
        let rules = config
            .custom_metrics
            .iter()
            .map(|metric| metric.to_rule())
            .collect::<Result<Vec<_>, _>>()?;
        analyzers.push(Box::new(KeywordMetricAnalyzer::new(rules)));
    }
    if let Some(window) = config.long_term_window {
        analyzers.push(Box::new(LongTermTrendAnalyzer::new(window)));
    }
    if config.conversation_flow {
        analyzers.push(Box::new(ConversationFlowAnalyzer::default()));
    }

    Ok(analyzers)
}

/// Reply generator backed by the configured LLM.
pub fn llm_generator(
    config: &SimulationConfig,
    session_id: SessionId,
) -> Result<Arc<dyn ResponseGenerator>, SimulationError> {
    let llm = config
        .llm
        .as_ref()
        .ok_or(ValidationError::MissingRequired("llm"))?;

    match llm.provider {
        LlmProvider::Mock => Ok(Arc::new(configure(
            LlmResponseGenerator::new(MockAIProvider::new(), config.global_instructions.as_str()),
            llm,
            session_id,
        ))),
        LlmProvider::Anthropic => {
            let provider = AnthropicProvider::new(llm.to_anthropic_config()?)?;
            Ok(Arc::new(configure(
                LlmResponseGenerator::new(provider, config.global_instructions.as_str()),
                llm,
                session_id,
            )))
        }
        LlmProvider::OpenAI | LlmProvider::Ollama => {
            let provider = OpenAIProvider::new(llm.to_openai_config())?;
            Ok(Arc::new(configure(
                LlmResponseGenerator::new(provider, config.global_instructions.as_str()),
                llm,
                session_id,
            )))
        }
    }
}

fn configure<P: AIProvider>(
    generator: LlmResponseGenerator<P>,
    llm: &LlmConfig,
    session_id: SessionId,
) -> LlmResponseGenerator<P> {
    let mut generator = generator.with_session_id(session_id);
    if let Some(max_tokens) = llm.max_tokens {
        generator = generator.with_max_tokens(max_tokens);
    }
    if let Some(temperature) = llm.temperature {
        generator = generator.with_temperature(temperature);
    }
    generator
}

/// Builds [`TurnOrchestrator`]s from a shared configuration.
///
/// Every `build` call produces an independent session; nothing mutable is
/// shared between them.
pub struct SessionBuilder<'a> {
    config: &'a SimulationConfig,
    session_id: SessionId,
    seed: Option<u64>,
    observer: Arc<dyn SimulationObserver>,
}

impl<'a> SessionBuilder<'a> {
    pub fn new(config: &'a SimulationConfig) -> Self {
        Self {
            config,
            session_id: SessionId::new(),
            seed: None,
            observer: Arc::new(NullObserver),
        }
    }

    pub fn session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn SimulationObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Session whose replies come from `generator`.
    pub fn build(self, generator: Arc<dyn ResponseGenerator>) -> Result<TurnOrchestrator, SimulationError> {
        let engine = build_engine(self.config, self.seed)?;
        let analyzers = build_analyzers(&self.config.analyzers)?;

        tracing::debug!(
            session_id = %self.session_id,
            stage = %engine.current_stage().id(),
            analyzers = analyzers.len(),
            knowledge_entries = self.config.knowledge.entries.len(),
            "Session created"
        );

        let mut orchestrator = TurnOrchestrator::new(engine, generator, &self.config.simulation)
            .with_session_id(self.session_id)
            .with_analyzers(analyzers)
            .with_triggers(self.config.triggers.clone())
            .with_observer(self.observer);
        if !self.config.knowledge.is_empty() {
            orchestrator = orchestrator.with_retriever(Arc::new(self.config.knowledge.to_retriever()));
        }
        Ok(orchestrator)
    }

    /// Session whose replies come from the configured `llm` section.
    pub fn build_with_llm(self) -> Result<TurnOrchestrator, SimulationError> {
        let generator = llm_generator(self.config, self.session_id)?;
        self.build(generator)
    }
}
