//! Host binary for the Entropy Engine.
//!
//! Wires the state store, clock, operator controls and journal together,
//! runs the tick loop in a background task and reads operator commands
//! from stdin. Command responses are JSON lines on stdout; logs go to
//! stderr.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `entropy-config.yaml` (or the path given as
//!    the first argument)
//! 2. Initialize structured logging (tracing)
//! 3. Build the state store and subscribe the journal
//! 4. Create operator state and the clock
//! 5. Run the simulation loop and the command loop until one ends
//! 6. Log the result

mod command;
mod error;
mod journal;

use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use entropy_core::clock::{FixedStepClock, MonotonicClock, TickSource};
use entropy_core::config::EngineConfig;
use entropy_core::operator::OperatorState;
use entropy_core::runner;
use entropy_core::store::StateStore;
use serde_json::json;
use tokio::io::{AsyncBufReadExt as _, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::command::{Command, HELP};
use crate::error::EngineError;
use crate::journal::{Journal, SharedJournal, StatusLogger};

/// Default config file, relative to the working directory.
const CONFIG_FILE: &str = "entropy-config.yaml";

/// Whether the command loop should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if configuration, clock setup or stdio fails.
#[tokio::main]
#[allow(clippy::too_many_lines)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, config_source) = load_config()?;

    // 2. Initialize structured logging. RUST_LOG wins over the config level.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);
    if config.logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(
        source = %config_source,
        world_name = %config.world.name,
        seed = config.world.seed,
        collapse_interval_secs = config.dynamics.collapse_interval_secs,
        tick_interval_ms = config.operator.tick_interval_ms,
        "Configuration loaded"
    );

    // 3. Build the store and its journal.
    let store = Arc::new(StateStore::from_config(&config));
    let journal = Journal::shared(&config.journal);
    store.subscribe(Box::new(Arc::clone(&journal)));

    // 4. Operator state and clock.
    let operator = Arc::new(OperatorState::new(
        config.operator.tick_interval_ms,
        &config.simulation,
    ));
    let clock = build_clock(config.operator.fixed_step_secs)?;
    info!(
        max_ticks = operator.max_ticks(),
        max_real_time_seconds = operator.max_real_time_seconds(),
        max_cycles = operator.max_cycles(),
        fixed_step_secs = config.operator.fixed_step_secs,
        "Operator state initialized"
    );

    // 5. Run.
    let mut simulation = {
        let store = Arc::clone(&store);
        let operator = Arc::clone(&operator);
        let mut clock = clock;
        let mut callback = StatusLogger::new(config.logging.status_interval_ticks);
        tokio::spawn(async move {
            runner::run_simulation(&store, clock.as_mut(), &operator, &mut callback).await
        })
    };

    {
        let operator = Arc::clone(&operator);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, stopping");
                operator.request_stop();
            }
        });
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let result = loop {
        tokio::select! {
            joined = &mut simulation => break joined.map_err(EngineError::from)?,
            line = lines.next_line(), if stdin_open => {
                match line.map_err(EngineError::from)? {
                    Some(line) => {
                        if handle_line(&line, &store, &operator, &journal).await? == Flow::Quit {
                            operator.request_stop();
                            stdin_open = false;
                        }
                    }
                    None => {
                        info!("stdin closed; running until a bound or interrupt");
                        stdin_open = false;
                    }
                }
            }
        }
    };

    // 6. Log results.
    runner::log_simulation_end(&result);
    let journal = journal::lock(&journal);
    info!(
        collapses = journal.history().total(),
        average_peak_entropy = journal.history().average_peak_entropy(),
        events_retained = journal.events().len(),
        "entropy-engine shutdown complete"
    );

    Ok(())
}

/// Load configuration from the path in the first argument, or from
/// `entropy-config.yaml` in the working directory, or fall back to
/// defaults if that file does not exist.
fn load_config() -> Result<(EngineConfig, String), EngineError> {
    let explicit = std::env::args().nth(1).map(PathBuf::from);
    let path = explicit
        .clone()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));

    if explicit.is_some() || path.exists() {
        let config = EngineConfig::from_file(&path)?;
        Ok((config, path.display().to_string()))
    } else {
        let mut config = EngineConfig::default();
        config.world.apply_env_overrides();
        Ok((config, String::from("defaults")))
    }
}

/// Fixed-step clock when configured, wall clock otherwise.
fn build_clock(fixed_step_secs: Option<f64>) -> Result<Box<dyn TickSource>, EngineError> {
    Ok(match fixed_step_secs {
        Some(step) => Box::new(FixedStepClock::new(step)?),
        None => Box::new(MonotonicClock::new()),
    })
}

/// Parse and execute one command line, printing its response.
async fn handle_line(
    line: &str,
    store: &StateStore,
    operator: &OperatorState,
    journal: &SharedJournal,
) -> Result<Flow, EngineError> {
    let command = match Command::parse(line) {
        Ok(Some(command)) => command,
        Ok(None) => return Ok(Flow::Continue),
        Err(e) => {
            warn!(error = %e, input = line, "Rejected command");
            emit(&json!({ "error": e.to_string() }))?;
            return Ok(Flow::Continue);
        }
    };

    let response = match command {
        Command::Inject(amount) => {
            store.inject_entropy(amount);
            json!({ "entropy": store.read().entropy })
        }
        Command::Spawn => json!({ "pattern_id": store.spawn_pattern() }),
        Command::Task(label) => json!({ "task_id": store.add_task(&label) }),
        Command::Complete(id) => {
            let completed = store.complete_task(id);
            if !completed {
                warn!(%id, "No open task with that id");
            }
            json!({ "completed": completed, "entropy": store.read().entropy })
        }
        Command::Collapse => {
            store.force_collapse();
            json!({ "evolution_cycle": store.read().evolution_cycle })
        }
        Command::Reboot => {
            store.reboot();
            json!({ "evolution_cycle": store.read().evolution_cycle })
        }
        Command::Pause => {
            operator.pause();
            json!({ "paused": true })
        }
        Command::Resume => {
            operator.resume();
            json!({ "paused": false })
        }
        Command::Speed(ms) => match operator.set_tick_interval_ms(ms) {
            Some(previous) => json!({ "tick_interval_ms": ms, "previous": previous }),
            None => {
                warn!(requested_ms = ms, "Tick interval rejected");
                json!({ "error": format!("tick interval {ms} ms is below the minimum") })
            }
        },
        Command::Status => {
            let state = store.read();
            let status = operator.status(state.evolution_cycle, state.entropy).await;
            json!({ "status": status, "state": state.as_ref() })
        }
        Command::History => journal::lock(journal).history_json(),
        Command::Events => journal::lock(journal).events_json(),
        Command::Help => json!({ "help": HELP }),
        Command::Quit => {
            emit(&json!({ "quit": true }))?;
            return Ok(Flow::Quit);
        }
    };

    emit(&response)?;
    Ok(Flow::Continue)
}

/// Write one JSON line to stdout.
fn emit(value: &serde_json::Value) -> Result<(), EngineError> {
    let mut out = std::io::stdout().lock();
    writeln!(out, "{value}")?;
    out.flush()?;
    Ok(())
}
