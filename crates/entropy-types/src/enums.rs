//! Enumeration types for the Entropy Engine simulation.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Identity of one of the fixed system metrics.
///
/// Exactly these four metrics exist in every evolution cycle. A collapse
/// re-randomizes their numeric fields but never adds, removes, or reorders
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum MetricKind {
    /// Overall system stability; dragged down by entropy.
    Stability,
    /// Tracks the number of live patterns rather than drifting freely.
    Patterns,
    /// Data coherence; drifts on its own bias only.
    Coherence,
    /// Processing load; rises with live patterns and tasks.
    Load,
}

impl MetricKind {
    /// All metric identities in display order.
    pub const ALL: [Self; 4] = [Self::Stability, Self::Patterns, Self::Coherence, Self::Load];

    /// Stable string identifier used by consumers.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stability => "stability",
            Self::Patterns => "patterns",
            Self::Coherence => "coherence",
            Self::Load => "load",
        }
    }

    /// Human-readable label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Stability => "System Stability",
            Self::Patterns => "Active Patterns",
            Self::Coherence => "Data Coherence",
            Self::Load => "Processing Load",
        }
    }

    /// Value at session start, before the first collapse.
    pub const fn initial_value(self) -> f64 {
        match self {
            Self::Stability => 100.0,
            Self::Patterns => 0.0,
            Self::Coherence => 95.0,
            Self::Load => 42.0,
        }
    }

    /// Per-frame drift bias at session start.
    pub const fn initial_drift(self) -> f64 {
        match self {
            Self::Stability => -0.1,
            Self::Patterns => 0.2,
            Self::Coherence => -0.05,
            Self::Load => 0.15,
        }
    }

    /// Scale of the entropy-weighted random perturbation. Never re-randomized.
    pub const fn volatility(self) -> f64 {
        match self {
            Self::Stability => 5.0,
            Self::Patterns => 10.0,
            Self::Coherence => 3.0,
            Self::Load => 8.0,
        }
    }
}

impl core::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

/// Classification of a spawned pattern. Purely descriptive for consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum PatternType {
    /// An unexplained deviation.
    Anomaly,
    /// A short, sharp excursion.
    Spike,
    /// A slow wander away from baseline.
    Drift,
    /// A sustained burst of activity.
    Surge,
}

impl PatternType {
    /// All pattern types, in the order used for uniform random selection.
    pub const ALL: [Self; 4] = [Self::Anomaly, Self::Spike, Self::Drift, Self::Surge];

    /// Select a pattern type by index, wrapping out-of-range indices.
    pub const fn from_index(index: usize) -> Self {
        match index % Self::ALL.len() {
            0 => Self::Anomaly,
            1 => Self::Spike,
            2 => Self::Drift,
            _ => Self::Surge,
        }
    }

    /// Upper-case wire name (`ANOMALY`, `SPIKE`, ...).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Anomaly => "ANOMALY",
            Self::Spike => "SPIKE",
            Self::Drift => "DRIFT",
            Self::Surge => "SURGE",
        }
    }
}

impl core::fmt::Display for PatternType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Collapse
// ---------------------------------------------------------------------------

/// Why a collapse happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum CollapseCause {
    /// Entropy reached the maximum during accumulation.
    EntropySaturation,
    /// The collapse countdown ran out.
    Countdown,
    /// An external caller forced the collapse.
    Forced,
}

impl core::fmt::Display for CollapseCause {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::EntropySaturation => "entropy saturation",
            Self::Countdown => "countdown expired",
            Self::Forced => "forced",
        })
    }
}

// ---------------------------------------------------------------------------
// Event log
// ---------------------------------------------------------------------------

/// Category of an entry in the system event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EventKind {
    /// The system collapsed into a new cycle.
    Collapse,
    /// The live pattern count grew.
    PatternEmerged,
    /// Entropy crossed into a higher band at or above 50.
    EntropyRising,
    /// Collapse is imminent or a task destabilized.
    Warning,
}
