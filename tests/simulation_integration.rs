//! Integration tests for full simulated conversations.
//!
//! These tests verify the end-to-end flow:
//! 1. Configuration is loaded from a file and validated
//! 2. A session is wired from it (engine, analyzers, triggers)
//! 3. Scripted turns drive metrics, stage transitions, triggers and end phrases
//! 4. Turn records serialize for transcript export
//!
//! Uses scripted replies so no LLM is involved.

use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;

use dialogue_stages::adapters::generation::ScriptedGenerator;
use dialogue_stages::adapters::observers::RecordingObserver;
use dialogue_stages::application::{
    build_analyzers, build_engine, Scenario, ScenarioRunner, SimulationError, TurnOrchestrator,
    TurnOutcome,
};
use dialogue_stages::config::SimulationConfig;
use dialogue_stages::domain::stages::StageDefinition;
use dialogue_stages::domain::transition::{TransitionMatrix, TransitionOutcome};
use dialogue_stages::ports::{GenerationError, SimulationEventKind};

// =============================================================================
// Test Infrastructure
// =============================================================================

const SALES_CALL: &str = r#"
global_instructions: You are a busy operations director taking a cold call.
metrics:
  - id: trust
    min: 0
    max: 100
    initial: 50
    decay_factor: 1.0
  - id: interest
    min: 0
    max: 100
    initial: 0
    decay_factor: 1.0
stages:
  - id: opening
    instructions: Be polite but guarded.
    conditions:
      trust: [0, 100]
  - id: demo
    instructions: Ask pointed questions about the product.
    conditions:
      interest: [0, 100]
triggers:
  - condition:
      type: compare
      metric: interest
      op: ge
      threshold: 90
    action: close
    message: Ready to buy.
simulation:
  max_turns: 10
  end_phrases: ["goodbye"]
analyzers:
  sentiment: true
  topic_coherence: true
  long_term_window: 3
  custom_metrics:
    - metric: interest
      keywords: [demo, pricing]
      weight: 30
      max: 60
"#;

fn write_config(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("sales_call.yaml");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(SALES_CALL.as_bytes()).unwrap();
    path
}

/// Session whose stage changes commit whenever a better stage exists.
fn decisive_session(
    config: &SimulationConfig,
    replies: &[&str],
    observer: &RecordingObserver,
) -> (TurnOrchestrator, ScriptedGenerator) {
    let matrix = TransitionMatrix::from_rows(vec![vec![0.0, 1.0], vec![1.0, 0.0]]).unwrap();
    let engine = build_engine(config, Some(9))
        .unwrap()
        .with_transition_matrix(matrix)
        .unwrap();
    let generator = ScriptedGenerator::from_replies(replies.iter().copied());
    let session = TurnOrchestrator::new(engine, Arc::new(generator.clone()), &config.simulation)
        .with_analyzers(build_analyzers(&config.analyzers).unwrap())
        .with_triggers(config.triggers.clone())
        .with_observer(Arc::new(observer.clone()));
    (session, generator)
}

// =============================================================================
// Full Session
// =============================================================================

#[tokio::test]
async fn scripted_sales_call_runs_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let config = SimulationConfig::load(write_config(&dir)).unwrap();
    let observer = RecordingObserver::new();
    let (mut session, generator) = decisive_session(
        &config,
        &["Hi.", "Sure, show me the demo.", "Good pricing.", "Great, goodbye!"],
        &observer,
    );

    // Turn 1: nothing moves.
    let first = session.run_turn("Hello there").await.unwrap();
    assert_eq!(first.stage, "opening");
    assert_eq!(first.outcome, TurnOutcome::Reply { text: "Hi.".into() });
    assert!(matches!(first.transition, Some(TransitionOutcome::Stayed { .. })));

    // Turn 2: two keywords push interest to 60 and the demo stage wins.
    let second = session.run_turn("Can I show you a demo of our pricing?").await.unwrap();
    assert_eq!(second.metrics.get("interest"), Some(60.0));
    assert_eq!(second.stage, "demo");
    assert_eq!(
        second.transition,
        Some(TransitionOutcome::Transitioned {
            from: "opening".into(),
            to: "demo".into(),
            probability: 1.0,
        })
    );
    assert_eq!(session.engine().explain().transitioned_from.as_deref(), Some("opening"));

    // Turn 3: interest reaches 90 and the trigger fires without ending the call.
    let third = session.run_turn("The pricing is flexible").await.unwrap();
    assert_eq!(
        third.outcome,
        TurnOutcome::Triggered {
            action: "close".into(),
            message: "Ready to buy.".into()
        }
    );
    assert!(!third.outcome.is_terminal());

    // Turn 4: interest is still 90, so the trigger outranks the end phrase.
    let fourth = session.run_turn("Thanks").await.unwrap();
    assert_eq!(fourth.metrics.get("interest"), Some(90.0));
    assert_eq!(
        fourth.outcome,
        TurnOutcome::Triggered {
            action: "close".into(),
            message: "Ready to buy.".into()
        }
    );

    assert_eq!(generator.call_count().await, 4);
    let calls = generator.calls().await;
    assert_eq!(calls[1].stage_id, "opening");
    assert_eq!(calls[2].stage_id, "demo");
    assert_eq!(session.engine().history().count(), 4);

    let kinds = observer.kinds();
    assert!(kinds.contains(&SimulationEventKind::TriggerFired {
        action: "close".into(),
        message: "Ready to buy.".into(),
    }));
    assert!(!kinds
        .iter()
        .any(|k| matches!(k, SimulationEventKind::ConversationEnded { .. })));
}

#[tokio::test]
async fn end_phrase_closes_the_call_when_no_trigger_holds() {
    let config = SimulationConfig::from_yaml_str(SALES_CALL).unwrap();
    let observer = RecordingObserver::new();
    let (mut session, _) = decisive_session(&config, &["Not today. Goodbye!"], &observer);

    let record = session.run_turn("Can I call you back?").await.unwrap();

    assert_eq!(
        record.outcome,
        TurnOutcome::Ended {
            reply: "Not today. Goodbye!\nConversation ended.".into()
        }
    );
    assert!(record.outcome.is_terminal());
    assert!(observer
        .kinds()
        .iter()
        .any(|k| matches!(k, SimulationEventKind::ConversationEnded { .. })));
}

#[tokio::test]
async fn turn_records_serialize_as_json_lines() {
    let config = SimulationConfig::from_yaml_str(SALES_CALL).unwrap();
    let observer = RecordingObserver::new();
    let (mut session, _) = decisive_session(&config, &["Hello."], &observer);

    let record = session.run_turn("Hi").await.unwrap();
    let line = record.to_json_line().unwrap();
    let value: serde_json::Value = serde_json::from_str(&line).unwrap();

    assert_eq!(value["turn"], 1);
    assert_eq!(value["stage"], "opening");
    assert_eq!(value["outcome"]["kind"], "reply");
    assert_eq!(value["metrics"]["trust"], 50.0);
    assert_eq!(value["session_id"], session.session_id().to_string());
}

#[tokio::test]
async fn generator_failure_mid_session_keeps_earlier_state() {
    let config = SimulationConfig::from_yaml_str(SALES_CALL).unwrap();
    let observer = RecordingObserver::new();
    let (mut session, generator) = decisive_session(&config, &["Sure, a demo."], &observer);
    generator.push_error(GenerationError::failed("upstream 503")).await;

    session.run_turn("Let me show you a demo").await.unwrap();
    let before = session.engine().get_context();

    let err = session.run_turn("And the pricing").await.unwrap_err();

    assert!(matches!(err, SimulationError::Generation { turn: 2, .. }));
    assert_eq!(session.engine().get_context(), before);
}

#[tokio::test]
async fn stages_added_mid_session_take_part_in_transitions() {
    let config = SimulationConfig::from_yaml_str(SALES_CALL).unwrap();
    let observer = RecordingObserver::new();
    let (mut session, _) = decisive_session(&config, &["ok", "ok"], &observer);

    session.run_turn("hello").await.unwrap();
    let index = session
        .engine_mut()
        .add_stage(&StageDefinition::new("objection", "Push back on cost").with_condition("trust", 0.0, 40.0))
        .unwrap();

    assert_eq!(index, 2);
    assert_eq!(session.engine().stages().len(), 3);
    assert!(session.engine().transition_matrix().is_row_stochastic(1e-9));
    session.run_turn("hello again").await.unwrap();
}

// =============================================================================
// Parallel Scenarios
// =============================================================================

#[tokio::test]
async fn parallel_scenarios_are_independent() {
    let config = Arc::new(SimulationConfig::from_yaml_str(SALES_CALL).unwrap());
    let observer = RecordingObserver::new();
    let runner = ScenarioRunner::new(config).with_observer(Arc::new(observer.clone()));

    let scenarios: Vec<Scenario> = (0..8)
        .map(|i| {
            let mut scenario = Scenario::new(format!("run-{i}")).with_seed(i);
            for _ in 0..i {
                scenario = scenario.with_turn("Here is a demo", "Interesting.");
            }
            scenario.with_turn("Thanks for your time", "Goodbye.")
        })
        .collect();

    let reports = runner.run_all(scenarios).await;

    assert_eq!(reports.len(), 8);
    for (i, report) in reports.iter().enumerate() {
        let report = report.as_ref().unwrap();
        assert_eq!(report.name, format!("run-{i}"));
        assert!(report.error.is_none());
        assert_eq!(report.records.len(), i + 1);

        // Keyword hits are the only interest source; decay is disabled.
        let expected_interest = (i as f64 * 30.0).min(100.0);
        assert_eq!(report.final_metrics.get("interest"), Some(expected_interest));

        // Once interest reaches 90 the trigger outranks the end phrase.
        if expected_interest >= 90.0 {
            assert!(matches!(report.final_outcome, Some(TurnOutcome::Triggered { .. })));
        } else {
            assert!(report.ended(), "{} did not end", report.name);
        }
    }

    let sessions: HashSet<_> = observer.events().iter().map(|e| e.session_id).collect();
    assert_eq!(sessions.len(), 8);
}
