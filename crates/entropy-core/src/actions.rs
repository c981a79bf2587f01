//! Action API: one-shot mutations applied outside the periodic tick.
//!
//! Each action is a total function from the prior state (plus its input and
//! the RNG) to the next state. None of them fail; inputs that make no sense
//! degrade to a no-op or a clamp.

use entropy_types::{PatternId, SystemState, Task, TaskId};
use rand::Rng;

use crate::collapse::{self, MAX_ENTROPY};
use crate::config::DynamicsConfig;
use crate::spawn::{self, FULL_STABILITY};
use crate::tick::glitch_intensity;

/// Range of the multiplier applied to injected entropy.
pub const INJECTION_VARIANCE: core::ops::RangeInclusive<f64> = 0.8..=1.2;

/// Entropy added by a new task.
pub const TASK_ENTROPY_COST: f64 = 2.0;

/// Entropy removed by completing a task.
pub const TASK_COMPLETION_RELIEF: f64 = 5.0;

/// Add `amount * variance` entropy.
///
/// A non-finite amount leaves the state untouched. The result is clamped to
/// `[0, 100]`; reaching 100 here does not collapse, the next tick does.
pub fn inject_entropy<R: Rng + ?Sized>(prev: &SystemState, amount: f64, rng: &mut R) -> SystemState {
    if !amount.is_finite() {
        return prev.clone();
    }
    let variance = rng.random_range(INJECTION_VARIANCE);
    with_entropy(prev, prev.entropy + amount * variance)
}

/// Append a randomly placed pattern at full intensity scale.
pub fn spawn_pattern<R: Rng + ?Sized>(prev: &SystemState, rng: &mut R) -> (SystemState, PatternId) {
    let pattern = spawn::random_pattern(rng, 1.0);
    let id = pattern.id;
    let mut next = prev.clone();
    next.patterns.push(pattern);
    (next, id)
}

/// Append a new task and charge its entropy cost.
pub fn add_task<R: Rng + ?Sized>(prev: &SystemState, label: &str, rng: &mut R) -> (SystemState, TaskId) {
    let task = spawn::new_task(rng, label);
    let id = task.id;
    let mut next = with_entropy(prev, prev.entropy + TASK_ENTROPY_COST);
    next.tasks.push(task);
    (next, id)
}

/// Mark a task complete, refresh its stability and relieve entropy.
///
/// Returns `None` if the task does not exist or is already complete.
pub fn complete_task(prev: &SystemState, id: TaskId) -> Option<SystemState> {
    let open = prev.task(id).is_some_and(|task| !task.is_completed);
    if !open {
        return None;
    }

    let mut next = with_entropy(prev, prev.entropy - TASK_COMPLETION_RELIEF);
    next.tasks = prev
        .tasks
        .iter()
        .map(|task| {
            if task.id == id {
                Task {
                    is_completed: true,
                    stability: FULL_STABILITY,
                    ..task.clone()
                }
            } else {
                task.clone()
            }
        })
        .collect();
    Some(next)
}

/// Collapse now, whatever the countdown and entropy.
pub fn force_collapse<R: Rng + ?Sized>(
    prev: &SystemState,
    dynamics: &DynamicsConfig,
    rng: &mut R,
) -> SystemState {
    collapse::collapse(prev, dynamics, rng)
}

/// Copy of `prev` with a new (clamped) entropy and the matching glitch.
fn with_entropy(prev: &SystemState, entropy: f64) -> SystemState {
    let entropy = entropy.clamp(0.0, MAX_ENTROPY);
    SystemState {
        entropy,
        glitch_intensity: glitch_intensity(entropy),
        ..prev.clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn state_at(entropy: f64) -> SystemState {
        let mut state = SystemState::new(60.0);
        state.entropy = entropy;
        state
    }

    #[test]
    fn inject_applies_variance() {
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..200 {
            let next = inject_entropy(&state_at(50.0), 10.0, &mut rng);
            assert!((58.0..=62.0).contains(&next.entropy), "entropy {}", next.entropy);
        }
    }

    #[test]
    fn inject_caps_at_max() {
        let mut rng = SmallRng::seed_from_u64(1);
        let next = inject_entropy(&state_at(95.0), 50.0, &mut rng);
        assert!((next.entropy - MAX_ENTROPY).abs() < f64::EPSILON);
        assert!((next.glitch_intensity - 1.0).abs() < f64::EPSILON);
        // No collapse from an action alone.
        assert_eq!(next.evolution_cycle, 0);
    }

    #[test]
    fn inject_negative_floors_at_zero() {
        let mut rng = SmallRng::seed_from_u64(1);
        let next = inject_entropy(&state_at(10.0), -100.0, &mut rng);
        assert!(next.entropy.abs() < f64::EPSILON);
    }

    #[test]
    fn inject_non_finite_is_noop() {
        let mut rng = SmallRng::seed_from_u64(1);
        let prev = state_at(33.0);
        assert_eq!(inject_entropy(&prev, f64::NAN, &mut rng), prev);
        assert_eq!(inject_entropy(&prev, f64::INFINITY, &mut rng), prev);
    }

    #[test]
    fn spawn_appends_one_fresh_pattern() {
        let mut rng = SmallRng::seed_from_u64(2);
        let (next, id) = spawn_pattern(&state_at(0.0), &mut rng);
        assert_eq!(next.patterns.len(), 1);
        let pattern = next.pattern(id).unwrap();
        assert!(pattern.age.abs() < f64::EPSILON);
    }

    #[test]
    fn add_task_charges_entropy() {
        let mut rng = SmallRng::seed_from_u64(3);
        let (next, id) = add_task(&state_at(10.0), "reindex", &mut rng);
        assert!((next.entropy - 12.0).abs() < 1e-9);
        let task = next.task(id).unwrap();
        assert_eq!(task.label, "reindex");
        assert!(!task.is_completed);
    }

    #[test]
    fn complete_task_relieves_entropy() {
        let mut rng = SmallRng::seed_from_u64(4);
        let (mut state, id) = add_task(&state_at(0.0), "drain", &mut rng);
        state.entropy = 40.0;
        state.tasks[0].stability = 12.0;

        let next = complete_task(&state, id).unwrap();
        assert!((next.entropy - 35.0).abs() < 1e-9);
        let task = next.task(id).unwrap();
        assert!(task.is_completed);
        assert!((task.stability - FULL_STABILITY).abs() < f64::EPSILON);
    }

    #[test]
    fn complete_task_floors_entropy() {
        let mut rng = SmallRng::seed_from_u64(4);
        let (mut state, id) = add_task(&state_at(0.0), "drain", &mut rng);
        state.entropy = 3.0;
        let next = complete_task(&state, id).unwrap();
        assert!(next.entropy.abs() < f64::EPSILON);
    }

    #[test]
    fn complete_task_twice_is_noop() {
        let mut rng = SmallRng::seed_from_u64(5);
        let (state, id) = add_task(&state_at(20.0), "once", &mut rng);
        let done = complete_task(&state, id).unwrap();
        assert!(complete_task(&done, id).is_none());
        assert!(complete_task(&done, TaskId::new()).is_none());
    }

    #[test]
    fn force_collapse_resets() {
        let mut rng = SmallRng::seed_from_u64(6);
        let (state, _) = add_task(&state_at(70.0), "lost", &mut rng);
        let next = force_collapse(&state, &DynamicsConfig::default(), &mut rng);
        assert!(next.entropy.abs() < f64::EPSILON);
        assert!(next.tasks.is_empty());
        assert_eq!(next.evolution_cycle, 1);
    }
}
