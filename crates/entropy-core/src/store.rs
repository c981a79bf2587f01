//! State store: the single owner of the current [`SystemState`].
//!
//! Every tick and action runs under one writer lock, computes the next
//! state from the current one, and publishes it by replacement. Readers
//! never see a partially updated state: [`StateStore::read`] hands out an
//! immutable `Arc` snapshot and [`StateStore::watch`] notifies async
//! consumers of each new one.
//!
//! Synchronous [`StateListener`]s are called inside the writer lock, in
//! application order, with the mutation that produced the change. The
//! collapse history and event log hang off this hook.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use entropy_types::{CollapseCause, PatternId, SystemState, TaskId};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::watch;
use tracing::debug;

use crate::actions;
use crate::config::{DynamicsConfig, EngineConfig};
use crate::tick::{TickOutcome, TickReport, run_tick};

/// What produced a state change.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// A pipeline tick.
    Tick(TickReport),
    /// Entropy injected through the action API.
    InjectEntropy {
        /// Requested amount, before variance.
        amount: f64,
    },
    /// A pattern spawned through the action API.
    SpawnPattern {
        /// The new pattern.
        id: PatternId,
    },
    /// A task added through the action API.
    AddTask {
        /// The new task.
        id: TaskId,
    },
    /// A task marked complete.
    CompleteTask {
        /// The completed task.
        id: TaskId,
    },
    /// An explicit collapse (`force_collapse` or `reboot`).
    ForceCollapse,
    /// A caller-supplied transform passed to [`StateStore::apply`].
    Custom {
        /// Free-form description for listeners and logs.
        label: String,
    },
}

impl Mutation {
    /// The collapse cause if this mutation started a new cycle.
    pub const fn collapse_cause(&self) -> Option<CollapseCause> {
        match self {
            Self::Tick(report) => report.collapse,
            Self::ForceCollapse => Some(CollapseCause::Forced),
            _ => None,
        }
    }
}

/// Synchronous observer of every state change.
pub trait StateListener: Send {
    /// Called once per committed mutation with the state before and after.
    fn on_change(&mut self, mutation: &Mutation, previous: &SystemState, current: &SystemState);
}

impl<T: StateListener> StateListener for Arc<Mutex<T>> {
    fn on_change(&mut self, mutation: &Mutation, previous: &SystemState, current: &SystemState) {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .on_change(mutation, previous, current);
    }
}

/// Everything only the writer may touch.
struct Writer {
    rng: StdRng,
    listeners: Vec<Box<dyn StateListener>>,
}

/// Owner of the simulation state.
pub struct StateStore {
    writer: Mutex<Writer>,
    tx: watch::Sender<Arc<SystemState>>,
    dynamics: DynamicsConfig,
}

impl StateStore {
    /// Create a store holding `initial`.
    ///
    /// With a seed the RNG stream (and so the whole run, given the same
    /// deltas and actions) is reproducible; without one it is OS-seeded.
    pub fn new(initial: SystemState, dynamics: DynamicsConfig, seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self {
            writer: Mutex::new(Writer {
                rng,
                listeners: Vec::new(),
            }),
            tx,
            dynamics,
        }
    }

    /// Create a store in the initial state described by `config`.
    pub fn from_config(config: &EngineConfig) -> Self {
        let dynamics = config.dynamics.clone();
        Self::new(
            SystemState::new(dynamics.collapse_interval_secs),
            dynamics,
            config.world.seed,
        )
    }

    /// Current snapshot.
    pub fn read(&self) -> Arc<SystemState> {
        Arc::clone(&self.tx.borrow())
    }

    /// Async subscription to state replacements.
    pub fn watch(&self) -> watch::Receiver<Arc<SystemState>> {
        self.tx.subscribe()
    }

    /// Register a synchronous listener for every subsequent mutation.
    pub fn subscribe(&self, listener: Box<dyn StateListener>) {
        self.lock().listeners.push(listener);
    }

    /// Apply an arbitrary transform under the writer lock.
    ///
    /// The transform receives the current state and the store's RNG and
    /// returns the replacement. Listeners see it as `mutation`.
    pub fn apply<F>(&self, mutation: &Mutation, transform: F)
    where
        F: FnOnce(&SystemState, &mut StdRng) -> SystemState,
    {
        let mut writer = self.lock();
        let prev = self.read();
        let next = transform(&prev, &mut writer.rng);
        self.commit(&mut writer, mutation, next);
    }

    /// Run one pipeline tick with the given raw delta.
    pub fn tick(&self, raw_delta_secs: f64) -> TickReport {
        let mut writer = self.lock();
        let prev = self.read();
        let TickOutcome { state, report } =
            run_tick(&prev, raw_delta_secs, &self.dynamics, &mut writer.rng);
        self.commit(&mut writer, &Mutation::Tick(report.clone()), state);
        report
    }

    /// Inject entropy (with variance). Non-finite amounts are ignored.
    pub fn inject_entropy(&self, amount: f64) {
        if !amount.is_finite() {
            debug!(amount, "Ignoring non-finite entropy injection");
            return;
        }
        let mut writer = self.lock();
        let prev = self.read();
        let next = actions::inject_entropy(&prev, amount, &mut writer.rng);
        debug!(amount, entropy = next.entropy, "Entropy injected");
        self.commit(&mut writer, &Mutation::InjectEntropy { amount }, next);
    }

    /// Spawn a pattern outside the entropy roll.
    pub fn spawn_pattern(&self) -> PatternId {
        let mut writer = self.lock();
        let prev = self.read();
        let (next, id) = actions::spawn_pattern(&prev, &mut writer.rng);
        debug!(%id, "Pattern spawned manually");
        self.commit(&mut writer, &Mutation::SpawnPattern { id }, next);
        id
    }

    /// Add a task with the given label.
    pub fn add_task(&self, label: &str) -> TaskId {
        let mut writer = self.lock();
        let prev = self.read();
        let (next, id) = actions::add_task(&prev, label, &mut writer.rng);
        debug!(%id, label, entropy = next.entropy, "Task added");
        self.commit(&mut writer, &Mutation::AddTask { id }, next);
        id
    }

    /// Complete a task. Returns `false` (and changes nothing) if the task
    /// is unknown or already complete.
    pub fn complete_task(&self, id: TaskId) -> bool {
        let mut writer = self.lock();
        let prev = self.read();
        let Some(next) = actions::complete_task(&prev, id) else {
            debug!(%id, "Complete ignored: no open task with that id");
            return false;
        };
        debug!(%id, entropy = next.entropy, "Task completed");
        self.commit(&mut writer, &Mutation::CompleteTask { id }, next);
        true
    }

    /// Collapse immediately.
    pub fn force_collapse(&self) {
        let mut writer = self.lock();
        let prev = self.read();
        let next = actions::force_collapse(&prev, &self.dynamics, &mut writer.rng);
        debug!(cycle = next.evolution_cycle, "Forced collapse");
        self.commit(&mut writer, &Mutation::ForceCollapse, next);
    }

    /// Same as [`force_collapse`](Self::force_collapse).
    pub fn reboot(&self) {
        self.force_collapse();
    }

    fn lock(&self) -> MutexGuard<'_, Writer> {
        // Every commit replaces the whole state, so a panic mid-write
        // cannot leave it torn.
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn commit(&self, writer: &mut Writer, mutation: &Mutation, next: SystemState) {
        let next = Arc::new(next);
        let previous = self.tx.send_replace(Arc::clone(&next));
        for listener in &mut writer.listeners {
            listener.on_change(mutation, &previous, &next);
        }
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("StateStore")
            .field("entropy", &state.entropy)
            .field("evolution_cycle", &state.evolution_cycle)
            .field("dynamics", &self.dynamics)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn store(seed: u64) -> StateStore {
        let dynamics = DynamicsConfig::default();
        StateStore::new(
            SystemState::new(dynamics.collapse_interval_secs),
            dynamics,
            Some(seed),
        )
    }

    /// Records every mutation it sees.
    #[derive(Default)]
    struct Recorder {
        seen: Vec<Mutation>,
        cycles: Vec<(u64, u64)>,
    }

    impl StateListener for Recorder {
        fn on_change(&mut self, mutation: &Mutation, previous: &SystemState, current: &SystemState) {
            self.seen.push(mutation.clone());
            self.cycles
                .push((previous.evolution_cycle, current.evolution_cycle));
        }
    }

    #[test]
    fn read_returns_initial_state() {
        let store = store(1);
        let state = store.read();
        assert!(state.entropy.abs() < f64::EPSILON);
        assert_eq!(state.evolution_cycle, 0);
    }

    #[test]
    fn snapshots_are_immutable() {
        let store = store(1);
        let before = store.read();
        store.add_task("x");
        assert!(before.tasks.is_empty());
        assert_eq!(store.read().tasks.len(), 1);
    }

    #[test]
    fn listeners_see_mutations_in_order() {
        let store = store(2);
        let recorder = Arc::new(Mutex::new(Recorder::default()));
        store.subscribe(Box::new(Arc::clone(&recorder)));

        let id = store.add_task("first");
        store.tick(0.1);
        store.complete_task(id);
        store.force_collapse();

        let recorder = recorder.lock().unwrap();
        assert_eq!(recorder.seen.len(), 4);
        assert_eq!(recorder.seen[0], Mutation::AddTask { id });
        assert!(matches!(recorder.seen[1], Mutation::Tick(_)));
        assert_eq!(recorder.seen[2], Mutation::CompleteTask { id });
        assert_eq!(recorder.seen[3], Mutation::ForceCollapse);
        assert_eq!(recorder.cycles[3], (0, 1));
    }

    #[test]
    fn noop_complete_does_not_notify() {
        let store = store(3);
        let recorder = Arc::new(Mutex::new(Recorder::default()));
        store.subscribe(Box::new(Arc::clone(&recorder)));

        assert!(!store.complete_task(TaskId::new()));
        assert!(recorder.lock().unwrap().seen.is_empty());
    }

    #[test]
    fn inject_then_tick_observes_injected_value() {
        let store = store(4);
        store.inject_entropy(150.0);
        assert!((store.read().entropy - 100.0).abs() < f64::EPSILON);

        let report = store.tick(0.016);
        assert_eq!(report.collapse, Some(CollapseCause::EntropySaturation));
        assert_eq!(store.read().evolution_cycle, 1);
    }

    #[test]
    fn non_finite_injection_is_ignored() {
        let store = store(5);
        store.inject_entropy(f64::NAN);
        assert!(store.read().entropy.abs() < f64::EPSILON);
    }

    #[test]
    fn reboot_is_a_forced_collapse() {
        let store = store(6);
        store.add_task("gone");
        store.reboot();
        let state = store.read();
        assert_eq!(state.evolution_cycle, 1);
        assert!(state.tasks.is_empty());
    }

    #[test]
    fn apply_runs_custom_transform() {
        let store = store(7);
        store.apply(
            &Mutation::Custom {
                label: String::from("half countdown"),
            },
            |prev, _rng| SystemState {
                collapse_countdown: prev.collapse_countdown / 2.0,
                ..prev.clone()
            },
        );
        assert!((store.read().collapse_countdown - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn same_seed_same_run() {
        let a = store(99);
        let b = store(99);
        for _ in 0..3 {
            a.inject_entropy(20.0);
            b.inject_entropy(20.0);
        }
        for _ in 0..200 {
            a.tick(0.05);
            b.tick(0.05);
        }
        let (sa, sb) = (a.read(), b.read());
        assert!((sa.entropy - sb.entropy).abs() < f64::EPSILON);
        assert_eq!(sa.metrics, sb.metrics);
        assert_eq!(sa.patterns.len(), sb.patterns.len());
    }

    #[test]
    fn mutation_reports_collapse_cause() {
        assert_eq!(
            Mutation::ForceCollapse.collapse_cause(),
            Some(CollapseCause::Forced)
        );
        assert_eq!(Mutation::Tick(TickReport::default()).collapse_cause(), None);
    }

    #[tokio::test]
    async fn watch_sees_replacement() {
        let store = store(8);
        let mut rx = store.watch();
        store.add_task("watched");
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().tasks.len(), 1);
    }
}
