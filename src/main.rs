//! Dialogue Stages CLI
//!
//! Runs one simulated conversation from a configuration file, either
//! against a scripted scenario or interactively against the configured LLM.

use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dialogue_stages::adapters::generation::ScriptedGenerator;
use dialogue_stages::adapters::observers::TracingObserver;
use dialogue_stages::application::{Scenario, SessionBuilder, SimulationError, TurnOrchestrator, TurnRecord};
use dialogue_stages::config::{ConfigError, SimulationConfig};

#[derive(Parser)]
#[command(name = "dialogue-stages")]
#[command(about = "Stage-tracking conversation simulator", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one conversation
    Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Simulation configuration file (YAML, JSON or TOML)
    #[arg(short, long, env = "DIALOGUE_STAGES_CONFIG")]
    config: PathBuf,

    /// Seed for stage transitions
    #[arg(long)]
    seed: Option<u64>,

    /// Scenario file with scripted operator lines and AI replies
    #[arg(long)]
    script: Option<PathBuf>,

    /// Write one JSON record per turn to this file
    #[arg(long)]
    transcript: Option<PathBuf>,

    /// Enable JSON logging
    #[arg(long)]
    json_logs: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize turn record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Destination for per-turn JSON lines.
struct Transcript(Option<BufWriter<File>>);

impl Transcript {
    fn open(path: Option<&PathBuf>) -> Result<Self, CliError> {
        Ok(Self(path.map(File::create).transpose()?.map(BufWriter::new)))
    }

    fn write(&mut self, record: &TurnRecord) -> Result<(), CliError> {
        if let Some(out) = self.0.as_mut() {
            writeln!(out, "{}", record.to_json_line()?)?;
            out.flush()?;
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let Command::Run(args) = cli.command;

    init_tracing(args.json_logs);

    let result = run(args).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "Simulation aborted");
    }
    result
}

fn init_tracing(json: bool) {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(args: RunArgs) -> Result<(), CliError> {
    let config = SimulationConfig::load(&args.config)?;
    let mut transcript = Transcript::open(args.transcript.as_ref())?;
    let builder = SessionBuilder::new(&config).observer(Arc::new(TracingObserver));

    match &args.script {
        Some(path) => {
            let scenario = Scenario::load(path)?;
            tracing::info!(scenario = %scenario.name, turns = scenario.turns.len(), "Running scripted scenario");

            let generator = ScriptedGenerator::from_replies(scenario.turns.iter().map(|t| t.ai.clone()));
            let mut session = builder
                .seed(args.seed.or(scenario.seed))
                .build(Arc::new(generator))?;

            for turn in &scenario.turns {
                println!("> {}", turn.user);
                if !play_turn(&mut session, &turn.user, &mut transcript).await? {
                    break;
                }
            }
        }
        None => {
            let mut session = builder.seed(args.seed).build_with_llm()?;
            let mut lines = BufReader::new(tokio::io::stdin()).lines();

            while let Some(line) = lines.next_line().await? {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if !play_turn(&mut session, line, &mut transcript).await? {
                    break;
                }
            }
        }
    }

    Ok(())
}

/// Runs one turn and prints its outcome. Returns false once the
/// conversation is over.
async fn play_turn(
    session: &mut TurnOrchestrator,
    user_text: &str,
    transcript: &mut Transcript,
) -> Result<bool, CliError> {
    let record = session.run_turn(user_text).await?;
    transcript.write(&record)?;

    println!("[{}] {}", record.stage, record.outcome.text());
    Ok(!record.outcome.is_terminal())
}
