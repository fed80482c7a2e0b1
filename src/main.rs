use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use tracing::info;

use pulse_core::activity::ActivityEvent;
use pulse_core::client::InferenceClient;
use pulse_core::request::{AnalysisRequest, TriggerReason};
use pulse_engine::{AnalysisConfig, AnalysisOrchestrator, InsightService};
use pulse_llm::{CommandClient, HttpChatClient};
use pulse_settings::{InferenceBackend, InferenceSettings, PulseSettings};
use pulse_store::{Database, HistoryConfig, InsightHistoryStore, KeyValueStore, SqliteKvStore};
use pulse_telemetry::{init_telemetry, TelemetryConfig};

#[derive(Parser)]
#[command(name = "pulse", version, about = "Strategic insights from development activity")]
struct Cli {
    /// Settings file (default: ~/.pulse/settings.json)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyse a batch of activity events and record the insight.
    Analyze {
        /// Newline-delimited JSON events, or `-` for stdin.
        #[arg(long)]
        events: PathBuf,
        /// manual, autosave or other.
        #[arg(long, default_value = "manual")]
        reason: TriggerReason,
        /// Objective for this run; repeatable. Overrides configured objectives.
        #[arg(long = "objective")]
        objectives: Vec<String>,
    },
    /// Print recent insights, most recent first.
    History {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Print the sanitized export snapshot.
    Export,
    /// Delete all stored insights and telemetry.
    Clear,
    /// Show the configured backend and inference health.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.settings {
        Some(path) => pulse_settings::load_settings_from_path(path),
        None => pulse_settings::load_settings(),
    }
    .context("failed to load settings")?;

    let telemetry = TelemetryConfig::from_level_str(&settings.logging.level, settings.logging.json);
    if let Err(e) = init_telemetry(&telemetry) {
        eprintln!("pulse: {e}");
    }

    let service = build_service(&settings)?;

    match cli.command {
        Command::Analyze {
            events,
            reason,
            objectives,
        } => {
            let request = AnalysisRequest::new(read_events(&events)?, reason).with_objectives(objectives);
            let insight = service.analyze(&request).await;
            print_json(&insight)?;
        }
        Command::History { limit } => {
            let history: Vec<_> = service.store().history().into_iter().take(limit).collect();
            print_json(&history)?;
        }
        Command::Export => print_json(&service.store().export_snapshot())?,
        Command::Clear => {
            let removed = service.store().history_count();
            service.store().clear_history();
            info!(removed, "history cleared");
        }
        Command::Status => {
            let store = service.store();
            let orchestrator = service.orchestrator();
            print_json(&serde_json::json!({
                "backend": settings.inference.backend,
                "client": orchestrator.client_name(),
                "inference": orchestrator.status(),
                "historyCount": store.history_count(),
                "telemetryCount": store.telemetry_history().len(),
                "databasePath": settings.storage.resolved_database_path(),
            }))?;
        }
    }

    Ok(())
}

fn build_service(settings: &PulseSettings) -> anyhow::Result<InsightService> {
    let db_path = settings.storage.resolved_database_path();
    let db = Database::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    let kv: Arc<dyn KeyValueStore> = Arc::new(SqliteKvStore::new(db));

    let store = InsightHistoryStore::new(
        HistoryConfig {
            max_history_items: settings.history.max_history_items,
            max_telemetry_items: settings.history.max_telemetry_items,
        },
        Some(kv),
    );

    let orchestrator = AnalysisOrchestrator::new(AnalysisConfig {
        max_recent_lines: settings.analysis.max_recent_lines,
        fallback_confidence_base: settings.analysis.fallback_confidence_base,
        timeout: Duration::from_millis(settings.analysis.timeout_ms),
    });
    orchestrator.update_objectives(settings.analysis.objectives.clone());
    orchestrator.update_system_prompt(settings.analysis.system_prompt.clone());
    orchestrator.attach_client(build_client(&settings.inference)?);

    Ok(InsightService::new(Arc::new(orchestrator), Arc::new(store)))
}

fn build_client(inference: &InferenceSettings) -> anyhow::Result<Option<Arc<dyn InferenceClient>>> {
    let client: Arc<dyn InferenceClient> = match inference.backend {
        InferenceBackend::None => return Ok(None),
        InferenceBackend::Http => {
            let http = &inference.http;
            let api_key = http
                .api_key_env
                .as_deref()
                .and_then(|name| std::env::var(name).ok())
                .filter(|key| !key.is_empty())
                .map(SecretString::from);
            Arc::new(HttpChatClient::new(&http.base_url, http.model.clone(), api_key)?)
        }
        InferenceBackend::Command => {
            let command = &inference.command;
            if command.program.trim().is_empty() {
                bail!("inference.command.program must be set when backend is \"command\"");
            }
            Arc::new(CommandClient::new(command.program.clone(), command.args.clone()))
        }
    };
    Ok(Some(client))
}

fn read_events(path: &Path) -> anyhow::Result<Vec<ActivityEvent>> {
    let reader: Box<dyn BufRead> = if path == Path::new("-") {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        Box::new(BufReader::new(file))
    };

    let mut events = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event: ActivityEvent = serde_json::from_str(&line)
            .with_context(|| format!("invalid event on line {}", index + 1))?;
        events.push(event);
    }
    Ok(events)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
