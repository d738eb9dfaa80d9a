//! Ultron binary entry point.

use std::io::BufRead;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use ultron::cli::Cli;
use ultron::config::AppConfig;
use ultron::error::{ConfigError, UltronError};
use ultron::gateway::TurtleGateway;
use ultron::orchestrator::{load_or_seed, Orchestrator, RunOutcome};
use ultron::provider::create_backend;

/// Exit status when stopped by Ctrl-C before the task finished.
const EXIT_CANCELLED: i32 = 130;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(RunOutcome::Completed { .. }) => {}
        Ok(RunOutcome::Cancelled) => std::process::exit(EXIT_CANCELLED),
        Err(e) => {
            error!(category = %e.category(), error = %e, "startup failed");
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<RunOutcome, UltronError> {
    let app = AppConfig::load(&cli.config)?;
    let log_dir = app.runtime.log_dir.clone();
    let log_path = ultron::logging::init(&log_dir, app.debug || cli.debug)
        .map_err(|source| ConfigError::Write { path: log_dir, source })?;
    info!(config = %cli.config.display(), log = %log_path.display(), "Starting Ultron");

    let config = app.resolve(cli.backend)?;
    info!(backend = %config.backend.kind, model = %config.backend.model, "initializing AI backend");
    let backend = create_backend(&config.backend)?;
    let gateway = TurtleGateway::new(&config.gateway).map_err(ConfigError::HttpClient)?;
    info!(url = gateway.url(), "turtle gateway ready");

    let store = load_or_seed(
        &config.loop_settings.history_path,
        &config.system_prompt,
        config.initial_task.as_deref(),
    );

    let cancel = CancellationToken::new();
    spawn_shutdown_listener(cancel.clone());

    let mut orchestrator = Orchestrator::new(
        Arc::from(backend),
        Arc::new(gateway),
        store,
        config.loop_settings.clone(),
    )
    .with_cancellation(cancel);

    if cli.interactive {
        orchestrator = orchestrator.with_operator_input(spawn_stdin_reader());
        info!("interactive mode: type commands for the model and press enter");
    }

    let outcome = orchestrator.run().await;
    if let RunOutcome::Completed { transcript } = &outcome {
        info!(messages = transcript.len(), "task finished");
    }
    Ok(outcome)
}

fn spawn_shutdown_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown signal received");
                cancel.cancel();
            }
            Err(e) => warn!(error = %e, "failed to listen for shutdown signal"),
        }
    });
}

/// Forward stdin lines to the loop from a plain thread, since a blocked
/// stdin read must not hold up runtime shutdown.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "stdin closed");
                    break;
                }
            }
        }
    });
    rx
}
