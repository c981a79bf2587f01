//! Event log: human-readable notices derived from consecutive states.
//!
//! Events are detected by comparing the state before and after each
//! mutation, so the log never needs a hook inside the pipeline.

use std::collections::VecDeque;

use chrono::Utc;
use entropy_types::{EventId, EventKind, SystemEvent, SystemState};
use tracing::warn;

use crate::store::{Mutation, StateListener};

/// Width of one entropy band; crossing into a higher band can raise an event.
const ENTROPY_BAND: f64 = 25.0;

/// Lowest entropy at which a band crossing is reported as rising.
const RISING_THRESHOLD: f64 = 50.0;

/// Lowest entropy at which a band crossing is reported as critical.
const CRITICAL_THRESHOLD: f64 = 75.0;

/// Bounded log of system events, newest first.
#[derive(Debug, Clone)]
pub struct EventLog {
    events: VecDeque<SystemEvent>,
    capacity: usize,
}

impl EventLog {
    /// Create an empty log keeping at most `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Retained events, newest first.
    pub fn events(&self) -> impl Iterator<Item = &SystemEvent> {
        self.events.iter()
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Record an event at the front, evicting the oldest beyond capacity.
    pub fn push(&mut self, kind: EventKind, message: String) {
        if self.capacity == 0 {
            return;
        }
        self.events.push_front(SystemEvent {
            id: EventId::new(),
            kind,
            message,
            at: Utc::now(),
        });
        self.events.truncate(self.capacity);
    }

    /// Record the events of one transition so they read in detection order
    /// above everything older.
    pub fn push_batch(&mut self, batch: Vec<(EventKind, String)>) {
        for (kind, message) in batch.into_iter().rev() {
            self.push(kind, message);
        }
    }
}

impl StateListener for EventLog {
    fn on_change(&mut self, mutation: &Mutation, previous: &SystemState, current: &SystemState) {
        let batch = detect_events(mutation, previous, current);
        for (_, message) in batch.iter().filter(|(kind, _)| *kind == EventKind::Warning) {
            warn!(%message, "System warning");
        }
        self.push_batch(batch);
    }
}

/// Events implied by one state transition, oldest first.
pub fn detect_events(
    mutation: &Mutation,
    previous: &SystemState,
    current: &SystemState,
) -> Vec<(EventKind, String)> {
    let mut found = Vec::new();

    let failed = match mutation {
        Mutation::Tick(report) => report.tasks_failed,
        _ => 0,
    };
    if failed > 0 {
        let labels: Vec<&str> = current
            .tasks
            .iter()
            .filter(|task| {
                task.stability <= 0.0
                    && previous
                        .task(task.id)
                        .is_some_and(|before| before.stability > 0.0)
            })
            .map(|task| task.label.as_str())
            .collect();
        if labels.is_empty() {
            found.push((
                EventKind::Warning,
                format!("{failed} task(s) destabilized"),
            ));
        } else {
            for label in labels {
                found.push((EventKind::Warning, format!("Task destabilized: {label}")));
            }
        }
    }

    if current.evolution_cycle > previous.evolution_cycle {
        let cause = mutation
            .collapse_cause()
            .map_or_else(String::new, |cause| format!(" ({cause})"));
        found.push((
            EventKind::Collapse,
            format!(
                "System collapse{cause}. Resetting to new state (cycle {})",
                current.evolution_cycle
            ),
        ));
        return found;
    }

    let band_before = (previous.entropy / ENTROPY_BAND).floor();
    let band_after = (current.entropy / ENTROPY_BAND).floor();
    if band_after > band_before {
        if current.entropy >= CRITICAL_THRESHOLD {
            found.push((
                EventKind::Warning,
                format!(
                    "Critical entropy reached: {:.1}%. Collapse imminent",
                    current.entropy
                ),
            ));
        } else if current.entropy >= RISING_THRESHOLD {
            found.push((
                EventKind::EntropyRising,
                format!(
                    "Entropy increasing: {:.1}%. System becoming unstable",
                    current.entropy
                ),
            ));
        }
    }

    if current.patterns.len() > previous.patterns.len() {
        found.push((
            EventKind::PatternEmerged,
            format!("New pattern emerged. Total patterns: {}", current.patterns.len()),
        ));
    }

    found
}
