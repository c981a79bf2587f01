//! Collapse history and event log shared between the store and the
//! command loop, plus the periodic status line.

use std::sync::{Arc, Mutex, PoisonError};

use entropy_core::config::JournalConfig;
use entropy_core::events::EventLog;
use entropy_core::history::CollapseHistory;
use entropy_core::runner::TickCallback;
use entropy_core::store::{Mutation, StateListener};
use entropy_core::tick::TickReport;
use entropy_types::SystemState;
use serde_json::{Value, json};
use tracing::info;

/// Collapse history and event log fed by one store subscription.
#[derive(Debug, Clone)]
pub struct Journal {
    history: CollapseHistory,
    events: EventLog,
}

/// Journal shared between the store (writer) and the command loop (reader).
pub type SharedJournal = Arc<Mutex<Journal>>;

impl Journal {
    /// Create an empty journal sized from config.
    pub fn new(config: &JournalConfig) -> Self {
        Self {
            history: CollapseHistory::new(config.history_capacity),
            events: EventLog::new(config.event_capacity),
        }
    }

    /// Wrap a new journal for sharing.
    pub fn shared(config: &JournalConfig) -> SharedJournal {
        Arc::new(Mutex::new(Self::new(config)))
    }

    /// The collapse history.
    pub const fn history(&self) -> &CollapseHistory {
        &self.history
    }

    /// The event log.
    pub const fn events(&self) -> &EventLog {
        &self.events
    }

    /// JSON rendering of the collapse history for the `history` command.
    pub fn history_json(&self) -> Value {
        json!({
            "total": self.history.total(),
            "average_peak_entropy": self.history.average_peak_entropy(),
            "records": self.history.records().collect::<Vec<_>>(),
        })
    }

    /// JSON rendering of the event log for the `events` command.
    pub fn events_json(&self) -> Value {
        json!({ "events": self.events.events().collect::<Vec<_>>() })
    }
}

impl StateListener for Journal {
    fn on_change(&mut self, mutation: &Mutation, previous: &SystemState, current: &SystemState) {
        self.history.on_change(mutation, previous, current);
        self.events.on_change(mutation, previous, current);
    }
}

/// Lock a shared journal, recovering from poison.
pub fn lock(journal: &SharedJournal) -> std::sync::MutexGuard<'_, Journal> {
    journal.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Tick callback that logs a status line every `interval` ticks.
#[derive(Debug)]
pub struct StatusLogger {
    interval: u64,
    ticks: u64,
}

impl StatusLogger {
    /// Log every `interval` ticks; 0 disables the status line.
    pub const fn new(interval: u64) -> Self {
        Self { interval, ticks: 0 }
    }
}

impl TickCallback for StatusLogger {
    fn on_tick(&mut self, _report: &TickReport, state: &SystemState) {
        self.ticks = self.ticks.saturating_add(1);
        if self.ticks.checked_rem(self.interval) != Some(0) {
            return;
        }
        info!(
            tick = self.ticks,
            cycle = state.evolution_cycle,
            entropy = state.entropy,
            countdown = state.collapse_countdown,
            glitch = state.glitch_intensity,
            patterns = state.patterns.len(),
            open_tasks = state.open_task_count(),
            "Status"
        );
    }
}
