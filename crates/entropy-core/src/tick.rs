//! Tick cycle: the fixed five-stage update pipeline.
//!
//! Each tick runs these stages against the prior state, in order:
//!
//! 1. **Task decay** -- open tasks lose `decay_rate` per frame; a task whose
//!    stability crosses to 0 this tick costs a one-time entropy penalty.
//!    Completed tasks fade at a fixed rate and are pruned at 0.
//!
//! 2. **Entropy accumulation** -- passive growth plus this tick's penalties,
//!    capped at the maximum.
//!
//! 3. **Collapse check** -- the countdown runs down; if it is spent or
//!    entropy is saturated the [collapse controller](crate::collapse)
//!    replaces the state and the tick ends here.
//!
//! 4. **Metric drift** -- bias, entropy-weighted noise, and the per-metric
//!    feedback couplings.
//!
//! 5. **Pattern lifecycle** -- entropy-weighted spawn roll, ageing, expiry,
//!    and the derived glitch intensity.
//!
//! Rates are defined per 1/60 s frame and scaled by `delta * 60`, so the
//! outcome depends on elapsed time rather than on how often ticks arrive.
//! Given the same prior state, delta and RNG stream the tick is
//! deterministic.

use entropy_types::{CollapseCause, Metric, MetricKind, Pattern, PatternId, SystemState, Task};
use rand::Rng;
use tracing::{debug, info};

use crate::clock::clamp_delta;
use crate::collapse::{self, MAX_ENTROPY, Phase};
use crate::config::DynamicsConfig;
use crate::spawn;

/// Frame rate the per-frame rates are expressed against.
pub const FRAMES_PER_SECOND: f64 = 60.0;

/// Entropy added when an open task's stability reaches 0.
pub const TASK_FAILURE_PENALTY: f64 = 2.0;

/// Per-frame stability loss of a completed task, whatever its decay rate.
pub const COMPLETED_TASK_FADE_RATE: f64 = 1.0;

/// Spawn probability per tick is `entropy / SPAWN_CHANCE_DIVISOR`.
const SPAWN_CHANCE_DIVISOR: f64 = 1000.0;

/// Stability metric loses `entropy * STABILITY_ENTROPY_DRAG` per tick.
const STABILITY_ENTROPY_DRAG: f64 = 0.1;

/// Load metric gains this much per live pattern per tick.
const PATTERN_LOAD_WEIGHT: f64 = 0.5;

/// Load metric gains this much per task per tick.
const TASK_LOAD_WEIGHT: f64 = 0.2;

/// Upper bound of the jitter added to the pattern-count metric.
const PATTERN_METRIC_JITTER: f64 = 10.0;

/// Upper bound of every metric value.
const METRIC_CEILING: f64 = 100.0;

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// The clamped delta the pipeline actually used.
    pub delta_secs: f64,
    /// Entropy after accumulation, before any collapse reset.
    pub accumulated_entropy: f64,
    /// Set when this tick ended in a collapse.
    pub collapse: Option<CollapseCause>,
    /// Open tasks whose stability crossed to 0 this tick.
    pub tasks_failed: u32,
    /// Completed tasks removed after fading out.
    pub tasks_pruned: u32,
    /// Pattern spawned by the entropy roll, if any.
    pub spawned: Option<PatternId>,
    /// Patterns removed for reaching the expiry age.
    pub patterns_expired: u32,
}

/// The next state and the report describing how it was reached.
#[derive(Debug, Clone)]
pub struct TickOutcome {
    /// The state after this tick.
    pub state: SystemState,
    /// What happened.
    pub report: TickReport,
}

/// Result of the task decay stage.
struct TaskDecay {
    tasks: Vec<Task>,
    failed: u32,
    pruned: u32,
}

/// Inputs to the metric coupling stage.
#[derive(Clone, Copy)]
struct MetricContext {
    entropy: f64,
    frames: f64,
    pattern_count: f64,
    task_count: f64,
}

/// Result of the pattern lifecycle stage.
struct PatternLifecycle {
    patterns: Vec<Pattern>,
    spawned: Option<PatternId>,
    expired: u32,
}

/// Execute one tick of the simulation.
///
/// `raw_delta_secs` is clamped to `[0, dynamics.max_delta_secs]` before use.
/// The prior state is never modified; the returned state replaces it.
pub fn run_tick<R: Rng + ?Sized>(
    prev: &SystemState,
    raw_delta_secs: f64,
    dynamics: &DynamicsConfig,
    rng: &mut R,
) -> TickOutcome {
    let delta_secs = clamp_delta(raw_delta_secs, dynamics.max_delta_secs);
    let frames = delta_secs * FRAMES_PER_SECOND;

    // --- Stage 1: Task decay ---
    let decay = decay_tasks(&prev.tasks, frames);
    if decay.failed > 0 {
        debug!(failed = decay.failed, "Task stability exhausted");
    }

    // --- Stage 2: Entropy accumulation ---
    let penalty = f64::from(decay.failed) * TASK_FAILURE_PENALTY;
    let entropy = accumulate_entropy(
        prev.entropy,
        dynamics.passive_entropy_growth * frames,
        penalty,
    );

    // --- Stage 3: Collapse check ---
    let countdown = (prev.collapse_countdown - delta_secs).max(0.0);
    if let Phase::Collapsing(cause) = collapse::evaluate(countdown, entropy) {
        let state = collapse::collapse(prev, dynamics, rng);
        info!(
            cycle = state.evolution_cycle,
            %cause,
            entropy,
            "System collapse"
        );
        return TickOutcome {
            state,
            report: TickReport {
                delta_secs,
                accumulated_entropy: entropy,
                collapse: Some(cause),
                tasks_failed: decay.failed,
                tasks_pruned: decay.pruned,
                spawned: None,
                patterns_expired: 0,
            },
        };
    }

    // --- Stage 4: Metric drift ---
    let ctx = MetricContext {
        entropy,
        frames,
        pattern_count: count_as_f64(prev.patterns.len()),
        task_count: count_as_f64(prev.tasks.len()),
    };
    let metrics = prev
        .metrics
        .iter()
        .map(|metric| drift_metric(metric, ctx, rng))
        .collect();

    // --- Stage 5: Pattern lifecycle ---
    let lifecycle = advance_patterns(
        &prev.patterns,
        entropy,
        delta_secs,
        dynamics.pattern_expiry_secs,
        rng,
    );
    if let Some(id) = lifecycle.spawned {
        debug!(%id, entropy, "Pattern spawned");
    }
    if lifecycle.expired > 0 {
        debug!(expired = lifecycle.expired, "Patterns expired");
    }

    TickOutcome {
        state: SystemState {
            entropy,
            collapse_countdown: countdown,
            evolution_cycle: prev.evolution_cycle,
            glitch_intensity: glitch_intensity(entropy),
            metrics,
            patterns: lifecycle.patterns,
            tasks: decay.tasks,
        },
        report: TickReport {
            delta_secs,
            accumulated_entropy: entropy,
            collapse: None,
            tasks_failed: decay.failed,
            tasks_pruned: decay.pruned,
            spawned: lifecycle.spawned,
            patterns_expired: lifecycle.expired,
        },
    }
}

/// Convex distortion response: `(entropy / 100)^2`.
pub fn glitch_intensity(entropy: f64) -> f64 {
    (entropy / MAX_ENTROPY).clamp(0.0, 1.0).powi(2)
}

/// Stage 1.
///
/// Only an open task crossing from above 0 to 0 counts as a failure, so a
/// task resting at 0 costs nothing on later ticks. Open tasks at 0 stay in
/// the list; completed tasks are removed once faded out.
fn decay_tasks(tasks: &[Task], frames: f64) -> TaskDecay {
    let mut failed: u32 = 0;
    let mut pruned: u32 = 0;
    let mut kept = Vec::with_capacity(tasks.len());

    for task in tasks {
        if task.is_completed {
            let stability = (task.stability - COMPLETED_TASK_FADE_RATE * frames).max(0.0);
            if stability <= 0.0 {
                pruned = pruned.saturating_add(1);
                continue;
            }
            kept.push(Task {
                stability,
                ..task.clone()
            });
        } else {
            let stability = (task.stability - task.decay_rate * frames).max(0.0);
            if task.stability > 0.0 && stability <= 0.0 {
                failed = failed.saturating_add(1);
            }
            kept.push(Task {
                stability,
                ..task.clone()
            });
        }
    }

    TaskDecay {
        tasks: kept,
        failed,
        pruned,
    }
}

/// Stage 2.
const fn accumulate_entropy(entropy: f64, growth: f64, penalty: f64) -> f64 {
    (entropy + growth + penalty).clamp(0.0, MAX_ENTROPY)
}

/// Stage 4, for a single metric.
fn drift_metric<R: Rng + ?Sized>(metric: &Metric, ctx: MetricContext, rng: &mut R) -> Metric {
    let entropy_factor = ctx.entropy / MAX_ENTROPY;
    let noise = (rng.random::<f64>() - 0.5) * metric.volatility * entropy_factor;
    let mut value = metric.value + metric.drift * ctx.frames + noise;

    match metric.id {
        MetricKind::Stability => value -= ctx.entropy * STABILITY_ENTROPY_DRAG,
        MetricKind::Patterns => {
            value = ctx.pattern_count + rng.random::<f64>() * PATTERN_METRIC_JITTER;
        }
        MetricKind::Load => {
            value += ctx.pattern_count * PATTERN_LOAD_WEIGHT + ctx.task_count * TASK_LOAD_WEIGHT;
        }
        MetricKind::Coherence => {}
    }

    Metric {
        value: value.clamp(0.0, METRIC_CEILING),
        ..metric.clone()
    }
}

/// Stage 5, minus the glitch derivation.
///
/// A pattern spawned this tick ages along with the rest.
fn advance_patterns<R: Rng + ?Sized>(
    patterns: &[Pattern],
    entropy: f64,
    delta_secs: f64,
    expiry_secs: f64,
    rng: &mut R,
) -> PatternLifecycle {
    let mut candidates = patterns.to_vec();

    let spawned = if rng.random::<f64>() < entropy / SPAWN_CHANCE_DIVISOR {
        let pattern = spawn::random_pattern(rng, entropy / MAX_ENTROPY);
        let id = pattern.id;
        candidates.push(pattern);
        Some(id)
    } else {
        None
    };

    let total = candidates.len();
    let survivors: Vec<Pattern> = candidates
        .into_iter()
        .map(|pattern| Pattern {
            age: pattern.age + delta_secs,
            ..pattern
        })
        .filter(|pattern| pattern.age < expiry_secs)
        .collect();
    let expired = u32::try_from(total.saturating_sub(survivors.len())).unwrap_or(u32::MAX);

    PatternLifecycle {
        patterns: survivors,
        spawned,
        expired,
    }
}

/// Lossless-enough conversion of a list length for the coupling formulas.
fn count_as_f64(count: usize) -> f64 {
    f64::from(u32::try_from(count).unwrap_or(u32::MAX))
}
