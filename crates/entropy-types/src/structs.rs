//! Core entity structs: the [`SystemState`] root value and the metrics,
//! patterns and tasks it owns, plus the journal records derived from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{CollapseCause, EventKind, MetricKind, PatternType};
use crate::ids::{EventId, PatternId, TaskId};

// ---------------------------------------------------------------------------
// Metric
// ---------------------------------------------------------------------------

/// One of the fixed system metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Metric {
    /// Stable identity; survives collapses.
    pub id: MetricKind,
    /// Human-readable label; survives collapses.
    pub label: String,
    /// Current value, always within 0-100.
    pub value: f64,
    /// Signed per-frame bias applied every tick.
    pub drift: f64,
    /// Scale of the entropy-weighted random perturbation.
    pub volatility: f64,
}

impl Metric {
    /// Build a metric with the session-start values for `kind`.
    pub fn initial(kind: MetricKind) -> Self {
        Self {
            id: kind,
            label: kind.label().to_owned(),
            value: kind.initial_value(),
            drift: kind.initial_drift(),
            volatility: kind.volatility(),
        }
    }

    /// The full metric set at session start, in display order.
    pub fn initial_set() -> Vec<Self> {
        MetricKind::ALL.into_iter().map(Self::initial).collect()
    }
}

// ---------------------------------------------------------------------------
// Pattern
// ---------------------------------------------------------------------------

/// A transient entity standing in for emergent activity.
///
/// `x`, `y`, `intensity` and `lifespan` are hints for presentation only; the
/// simulation removes a pattern once its `age` reaches the fixed expiry
/// window, whatever its `lifespan`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Pattern {
    /// Unique identifier.
    pub id: PatternId,
    /// Horizontal spatial hint in 0-1.
    pub x: f64,
    /// Vertical spatial hint in 0-1.
    pub y: f64,
    /// Display intensity in 0-1.
    pub intensity: f64,
    /// Seconds since spawn.
    pub age: f64,
    /// Display lifespan hint, 30-80.
    pub lifespan: f64,
    /// Pattern classification.
    #[serde(rename = "type")]
    pub pattern_type: PatternType,
    /// Load contribution hint, 1-5.
    pub load: f64,
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A user-created work item whose stability decays every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Task {
    /// Unique identifier.
    pub id: TaskId,
    /// Free-form label supplied by the caller.
    pub label: String,
    /// Remaining stability, 0-100.
    pub stability: f64,
    /// Whether the task has been completed.
    pub is_completed: bool,
    /// Per-frame stability loss while incomplete, 0.1-0.3.
    pub decay_rate: f64,
}

// ---------------------------------------------------------------------------
// SystemState
// ---------------------------------------------------------------------------

/// The single root value of the simulation.
///
/// Every tick and every action produces a new `SystemState`; nothing holds
/// a mutable reference into a published one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SystemState {
    /// Global instability, 0-100.
    pub entropy: f64,
    /// Seconds until a countdown collapse, never negative.
    pub collapse_countdown: f64,
    /// Number of completed collapses. Never decreases.
    pub evolution_cycle: u64,
    /// Derived distortion signal, 0-1.
    pub glitch_intensity: f64,
    /// The fixed metric set, in stable order.
    pub metrics: Vec<Metric>,
    /// Live patterns, in spawn order.
    pub patterns: Vec<Pattern>,
    /// Tasks, in creation order.
    pub tasks: Vec<Task>,
}

impl SystemState {
    /// The state at session start: zero entropy, a full countdown, cycle 0
    /// and the initial metric set.
    pub fn new(collapse_interval_secs: f64) -> Self {
        Self {
            entropy: 0.0,
            collapse_countdown: collapse_interval_secs.max(0.0),
            evolution_cycle: 0,
            glitch_intensity: 0.0,
            metrics: Metric::initial_set(),
            patterns: Vec::new(),
            tasks: Vec::new(),
        }
    }

    /// Look up a metric by identity.
    pub fn metric(&self, kind: MetricKind) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.id == kind)
    }

    /// Look up a task by id.
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Look up a pattern by id.
    pub fn pattern(&self, id: PatternId) -> Option<&Pattern> {
        self.patterns.iter().find(|p| p.id == id)
    }

    /// Number of tasks not yet completed.
    pub fn open_task_count(&self) -> usize {
        self.tasks.iter().filter(|t| !t.is_completed).count()
    }
}

// ---------------------------------------------------------------------------
// Journal records
// ---------------------------------------------------------------------------

/// One finished evolution cycle, recorded when it collapsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CollapseRecord {
    /// The cycle that ended.
    pub cycle: u64,
    /// Highest entropy observed during that cycle.
    pub peak_entropy: f64,
    /// What triggered the collapse.
    pub cause: CollapseCause,
    /// Wall-clock time of the collapse.
    pub collapsed_at: DateTime<Utc>,
}

/// An entry in the human-readable system event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SystemEvent {
    /// Unique identifier.
    pub id: EventId,
    /// Event category.
    pub kind: EventKind,
    /// Message shown to the operator.
    pub message: String,
    /// Wall-clock time the event was observed.
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_has_initial_values() {
        let state = SystemState::new(60.0);
        assert!(state.entropy.abs() < f64::EPSILON);
        assert!((state.collapse_countdown - 60.0).abs() < f64::EPSILON);
        assert_eq!(state.evolution_cycle, 0);
        assert!(state.patterns.is_empty());
        assert!(state.tasks.is_empty());
        let ids: Vec<MetricKind> = state.metrics.iter().map(|m| m.id).collect();
        assert_eq!(ids, MetricKind::ALL.to_vec());
    }

    #[test]
    fn metric_lookup_by_kind() {
        let state = SystemState::new(60.0);
        let load = state.metric(MetricKind::Load);
        assert_eq!(load.map(|m| m.label.as_str()), Some("Processing Load"));
    }

    #[test]
    fn pattern_type_field_is_renamed() {
        let pattern = Pattern {
            id: PatternId::new(),
            x: 0.5,
            y: 0.5,
            intensity: 0.2,
            age: 0.0,
            lifespan: 40.0,
            pattern_type: PatternType::Surge,
            load: 2.0,
        };
        let value = serde_json::to_value(&pattern).unwrap_or_default();
        assert_eq!(value.get("type").and_then(|v| v.as_str()), Some("SURGE"));
    }
}
