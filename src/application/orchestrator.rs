//! Turn orchestration: one operator utterance in, one outcome out.

use chrono::Utc;
use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::config::SimulationSettings;
use crate::domain::analysis::DeltaAccumulator;
use crate::domain::foundation::SessionId;
use crate::domain::metrics::MetricDeltas;
use crate::domain::transition::{StageTransitionEngine, TransitionOutcome};
use crate::domain::triggers::{first_fired, Trigger};
use crate::ports::{
    AnalysisInput, AnalyzerError, EndReason, GenerationError, KnowledgeRetriever, NullObserver,
    ResponseGenerator, RetrievalError, SimulationEvent, SimulationEventKind, SimulationObserver, TurnAnalyzer,
};

use super::{SimulationError, TurnOutcome, TurnRecord, CONVERSATION_ENDED_MARKER};

/// Drives one conversation session.
///
/// Each call to [`run_interaction`](Self::run_interaction) retrieves
/// knowledge for the operator's text, generates the AI reply, runs the
/// analyzers, updates the engine, then checks triggers and
/// end phrases. Calls on one session are strictly sequential (`&mut self`).
pub struct TurnOrchestrator {
    session_id: SessionId,
    engine: StageTransitionEngine,
    generator: Arc<dyn ResponseGenerator>,
    analyzers: Vec<Box<dyn TurnAnalyzer>>,
    retriever: Option<Arc<dyn KnowledgeRetriever>>,
    triggers: Vec<Trigger>,
    max_turns: u32,
    end_phrases: Vec<String>,
    turn_timeout: Duration,
    analyzer_timeout: Duration,
    observer: Arc<dyn SimulationObserver>,
    turn_count: u32,
}

impl TurnOrchestrator {
    pub fn new(
        engine: StageTransitionEngine,
        generator: Arc<dyn ResponseGenerator>,
        settings: &SimulationSettings,
    ) -> Self {
        Self {
            session_id: SessionId::new(),
            engine,
            generator,
            analyzers: Vec::new(),
            retriever: None,
            triggers: Vec::new(),
            max_turns: settings.max_turns,
            end_phrases: settings
                .end_phrases
                .iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
            turn_timeout: settings.turn_timeout(),
            analyzer_timeout: settings.analyzer_timeout(),
            observer: Arc::new(NullObserver),
            turn_count: 0,
        }
    }

    pub fn with_session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn with_analyzer(mut self, analyzer: Box<dyn TurnAnalyzer>) -> Self {
        self.analyzers.push(analyzer);
        self
    }

    pub fn with_analyzers(mut self, analyzers: impl IntoIterator<Item = Box<dyn TurnAnalyzer>>) -> Self {
        self.analyzers.extend(analyzers);
        self
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn KnowledgeRetriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn with_triggers(mut self, triggers: Vec<Trigger>) -> Self {
        self.triggers = triggers;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn SimulationObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Runs one turn and returns its outcome.
    pub async fn run_interaction(&mut self, user_text: &str) -> Result<TurnOutcome, SimulationError> {
        self.run_turn(user_text).await.map(|record| record.outcome)
    }

    /// Runs one turn and returns the full record of it.
    ///
    /// The turn counter advances on every call, including calls that fail.
    pub async fn run_turn(&mut self, user_text: &str) -> Result<TurnRecord, SimulationError> {
        self.turn_count += 1;
        let turn = self.turn_count;

        if turn > self.max_turns {
            self.emit(turn, SimulationEventKind::ConversationEnded {
                reason: EndReason::MaxTurns,
            });
            return Ok(self.record(turn, user_text, None, None, TurnOutcome::MaxTurnsReached));
        }

        self.emit(turn, SimulationEventKind::TurnStarted {
            user_text: user_text.to_string(),
        });

        let mut context = self.engine.get_context();
        context.knowledge =
            Self::retrieve_knowledge(self.retriever.as_ref(), self.analyzer_timeout, &self.session_id, turn, user_text)
                .await;
        let ai_text = match timeout(self.turn_timeout, self.generator.generate(&context, user_text)).await {
            Ok(Ok(text)) => text,
            Ok(Err(source)) => return Err(self.generation_failed(turn, source)),
            Err(_) => {
                let source = GenerationError::Timeout {
                    timeout_ms: self.turn_timeout.as_millis() as u64,
                };
                return Err(self.generation_failed(turn, source));
            }
        };
        self.emit(turn, SimulationEventKind::ReplyGenerated {
            ai_text: ai_text.clone(),
        });

        let input = AnalysisInput {
            turn,
            user_text: user_text.to_string(),
            ai_text: ai_text.clone(),
            stage_id: context.current_stage_id,
            metrics: context.metrics,
        };
        let (deltas, failures) = run_analyzers(&mut self.analyzers, &input, self.analyzer_timeout).await;
        for (analyzer, error) in failures {
            tracing::warn!(
                session_id = %self.session_id,
                turn,
                analyzer = %analyzer,
                error = %error,
                "Analyzer failed, contribution dropped"
            );
            self.emit(turn, SimulationEventKind::AnalyzerFailed {
                analyzer,
                error: error.to_string(),
            });
        }

        let transition = self.engine.update(&deltas, user_text, &ai_text);
        self.emit(turn, SimulationEventKind::StageEvaluated {
            outcome: transition.clone(),
        });

        let outcome = self.decide(turn, &ai_text);
        Ok(self.record(turn, user_text, Some(ai_text), Some(transition), outcome))
    }

    /// Passages for the prompt. Failures are logged and leave the list empty.
    async fn retrieve_knowledge(
        retriever: Option<&Arc<dyn KnowledgeRetriever>>,
        analyzer_timeout: Duration,
        session_id: &SessionId,
        turn: u32,
        user_text: &str,
    ) -> Vec<String> {
        let Some(retriever) = retriever else {
            return Vec::new();
        };
        let result = match timeout(analyzer_timeout, retriever.retrieve(user_text)).await {
            Ok(result) => result,
            Err(_) => Err(RetrievalError::Timeout {
                timeout_ms: analyzer_timeout.as_millis() as u64,
            }),
        };
        match result {
            Ok(passages) => {
                tracing::debug!(session_id = %session_id, turn, passages = passages.len(), "Knowledge retrieved");
                passages
            }
            Err(error) => {
                tracing::warn!(
                    session_id = %session_id,
                    turn,
                    error = %error,
                    "Knowledge retrieval failed, replying without it"
                );
                Vec::new()
            }
        }
    }

    /// Trigger first, then end phrase, then a plain reply.
    fn decide(&self, turn: u32, ai_text: &str) -> TurnOutcome {
        let metrics = self.engine.get_metrics_state();
        if let Some(trigger) = first_fired(&self.triggers, &metrics) {
            self.emit(turn, SimulationEventKind::TriggerFired {
                action: trigger.action.clone(),
                message: trigger.message.clone(),
            });
            return TurnOutcome::Triggered {
                action: trigger.action.clone(),
                message: trigger.message.clone(),
            };
        }

        if self.contains_end_phrase(ai_text) {
            self.emit(turn, SimulationEventKind::ConversationEnded {
                reason: EndReason::EndPhrase,
            });
            return TurnOutcome::Ended {
                reply: format!("{}{}", ai_text, CONVERSATION_ENDED_MARKER),
            };
        }

        TurnOutcome::Reply {
            text: ai_text.to_string(),
        }
    }

    fn contains_end_phrase(&self, ai_text: &str) -> bool {
        let lowered = ai_text.to_lowercase();
        self.end_phrases.iter().any(|phrase| lowered.contains(phrase.as_str()))
    }

    fn generation_failed(&self, turn: u32, source: GenerationError) -> SimulationError {
        self.emit(turn, SimulationEventKind::GenerationFailed {
            error: source.to_string(),
        });
        SimulationError::Generation { turn, source }
    }

    fn record(
        &self,
        turn: u32,
        user_text: &str,
        ai_text: Option<String>,
        transition: Option<TransitionOutcome>,
        outcome: TurnOutcome,
    ) -> TurnRecord {
        TurnRecord {
            session_id: self.session_id,
            turn,
            timestamp: Utc::now(),
            user_text: user_text.to_string(),
            ai_text,
            stage: self.engine.current_stage().id().to_string(),
            transition,
            metrics: self.engine.get_metrics_state(),
            outcome,
        }
    }

    fn emit(&self, turn: u32, kind: SimulationEventKind) {
        self.observer
            .on_event(&SimulationEvent::new(self.session_id, turn, kind));
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Calls made so far, including rejected and failed ones.
    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn max_turns(&self) -> u32 {
        self.max_turns
    }

    pub fn engine(&self) -> &StageTransitionEngine {
        &self.engine
    }

    /// Mutable engine access between turns (feedback, dynamic stages).
    pub fn engine_mut(&mut self) -> &mut StageTransitionEngine {
        &mut self.engine
    }
}

/// Runs every analyzer against the same pre-turn input and sums the signals.
///
/// Analyzers run concurrently, each under its own timeout. A failure, panic
/// or timeout drops only that analyzer's contribution.
async fn run_analyzers(
    analyzers: &mut [Box<dyn TurnAnalyzer>],
    input: &AnalysisInput,
    budget: Duration,
) -> (MetricDeltas, Vec<(String, AnalyzerError)>) {
    let results = join_all(analyzers.iter_mut().map(|analyzer| async move {
        let name = analyzer.name().to_string();
        let call = AssertUnwindSafe(analyzer.analyze(input)).catch_unwind();
        let result = match timeout(budget, call).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(AnalyzerError::failed(name.as_str(), "analyzer panicked")),
            Err(_) => Err(AnalyzerError::timeout(name.as_str(), budget.as_millis() as u64)),
        };
        (name, result)
    }))
    .await;

    let mut accumulator = DeltaAccumulator::new(&input.metrics);
    let mut failures = Vec::new();
    for (name, result) in results {
        match result {
            Ok(output) => accumulator.add(&output),
            Err(error) => failures.push((name, error)),
        }
    }
    (accumulator.into_deltas(), failures)
}
