//! Randomized construction of patterns, tasks and re-seeded metrics.
//!
//! Every draw goes through the caller's RNG so a seeded store reproduces
//! the same spawns, decay rates and post-collapse metrics.

use entropy_types::{Metric, Pattern, PatternId, PatternType, Task, TaskId};
use rand::Rng;

/// Range of the display lifespan hint given to new patterns.
pub const PATTERN_LIFESPAN: core::ops::Range<f64> = 30.0..80.0;

/// Range of the load hint given to new patterns.
pub const PATTERN_LOAD: core::ops::Range<f64> = 1.0..5.0;

/// Range of the per-frame decay rate given to new tasks.
pub const TASK_DECAY_RATE: core::ops::Range<f64> = 0.1..0.3;

/// Stability of a freshly added or freshly completed task.
pub const FULL_STABILITY: f64 = 100.0;

/// Range a metric value is re-drawn from on collapse.
pub const METRIC_VALUE: core::ops::Range<f64> = 0.0..100.0;

/// Range a metric drift is re-drawn from on collapse.
pub const METRIC_DRIFT: core::ops::Range<f64> = -0.15..0.15;

/// Build a new pattern at age 0.
///
/// `intensity_scale` caps the display intensity: the pipeline passes the
/// normalized entropy, manual spawns pass 1.
pub fn random_pattern<R: Rng + ?Sized>(rng: &mut R, intensity_scale: f64) -> Pattern {
    let x = rng.random::<f64>();
    let y = rng.random::<f64>();
    let intensity = rng.random::<f64>() * intensity_scale.clamp(0.0, 1.0);
    let lifespan = rng.random_range(PATTERN_LIFESPAN);
    let pattern_type = PatternType::from_index(rng.random_range(0..PatternType::ALL.len()));
    let load = rng.random_range(PATTERN_LOAD);

    Pattern {
        id: PatternId::new(),
        x,
        y,
        intensity,
        age: 0.0,
        lifespan,
        pattern_type,
        load,
    }
}

/// Build a new, incomplete task at full stability.
pub fn new_task<R: Rng + ?Sized>(rng: &mut R, label: &str) -> Task {
    Task {
        id: TaskId::new(),
        label: label.to_owned(),
        stability: FULL_STABILITY,
        is_completed: false,
        decay_rate: rng.random_range(TASK_DECAY_RATE),
    }
}

/// Re-draw a metric's value and drift, keeping its identity and volatility.
pub fn reseed_metric<R: Rng + ?Sized>(metric: &Metric, rng: &mut R) -> Metric {
    Metric {
        value: rng.random_range(METRIC_VALUE),
        drift: rng.random_range(METRIC_DRIFT),
        ..metric.clone()
    }
}
