//! Collapse controller.
//!
//! A two-phase machine: the system is [`Phase::Running`] until the
//! termination predicate holds, at which point it is [`Phase::Collapsing`]
//! for the remainder of that tick and the whole state is replaced by a
//! freshly randomized one. The next tick starts `Running` in the new cycle.
//!
//! The predicate is evaluated once per tick after entropy accumulation; an
//! external force-collapse bypasses it entirely.

use entropy_types::{CollapseCause, SystemState};
use rand::Rng;

use crate::config::DynamicsConfig;
use crate::spawn;

/// Entropy ceiling; reaching it triggers a collapse.
pub const MAX_ENTROPY: f64 = 100.0;

/// Glitch intensity published on the first state of a new cycle.
pub const COLLAPSE_GLITCH: f64 = 1.0;

/// Controller phase for the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Keep running the pipeline.
    Running,
    /// Replace the state and skip the remaining stages.
    Collapsing(CollapseCause),
}

/// Evaluate the termination predicate.
///
/// Either condition alone is sufficient. When both hold, saturation is
/// reported since it is the more specific signal.
pub fn evaluate(countdown_secs: f64, entropy: f64) -> Phase {
    if entropy >= MAX_ENTROPY {
        Phase::Collapsing(CollapseCause::EntropySaturation)
    } else if countdown_secs <= 0.0 {
        Phase::Collapsing(CollapseCause::Countdown)
    } else {
        Phase::Running
    }
}

/// Build the first state of the next evolution cycle.
///
/// Patterns and tasks are discarded, entropy returns to 0, the countdown is
/// refilled and every metric keeps its identity but gets a new random value
/// and drift.
pub fn collapse<R: Rng + ?Sized>(
    prev: &SystemState,
    dynamics: &DynamicsConfig,
    rng: &mut R,
) -> SystemState {
    SystemState {
        entropy: 0.0,
        collapse_countdown: dynamics.collapse_interval_secs,
        evolution_cycle: prev.evolution_cycle.saturating_add(1),
        glitch_intensity: COLLAPSE_GLITCH,
        metrics: prev
            .metrics
            .iter()
            .map(|metric| spawn::reseed_metric(metric, rng))
            .collect(),
        patterns: Vec::new(),
        tasks: Vec::new(),
    }
}
