//! Operator control state for runtime simulation management.
//!
//! Shared atomic state used by the tick loop and whatever host drives it
//! (the stdin command reader in the engine binary). The operator can
//! pause/resume, change tick speed and request a clean shutdown without
//! stopping the process.
//!
//! # Architecture
//!
//! Control fields are atomics so the tick loop reads them without locks on
//! the hot path. Share the struct between tasks with an `Arc`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};

use crate::config::SimulationBoundsConfig;

/// Smallest accepted tick interval in milliseconds.
pub const MIN_TICK_INTERVAL_MS: u64 = 4;

/// Reason why the simulation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationEndReason {
    /// Reached the configured `max_ticks` limit.
    MaxTicksReached,
    /// Reached the configured `max_real_time_seconds` limit.
    MaxRealTimeReached,
    /// Reached the configured `max_cycles` limit.
    MaxCyclesReached,
    /// An operator issued a stop command.
    OperatorStop,
}

/// Shared operator control state.
#[derive(Debug)]
pub struct OperatorState {
    /// Whether the simulation is currently paused.
    paused: AtomicBool,

    /// Notification used to wake the tick loop when resumed.
    resume_notify: Notify,

    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Current tick interval in milliseconds (runtime-adjustable).
    tick_interval_ms: AtomicU64,

    /// Ticks completed so far.
    ticks_run: AtomicU64,

    /// Wall-clock time when the simulation started.
    started_at: DateTime<Utc>,

    /// Maximum number of ticks (0 = unlimited).
    max_ticks: u64,

    /// Maximum wall-clock seconds (0 = unlimited).
    max_real_time_seconds: u64,

    /// Evolution cycle at which to stop (0 = unlimited).
    max_cycles: u64,

    /// Reason the simulation ended, if it has.
    end_reason: Mutex<Option<SimulationEndReason>>,
}

impl OperatorState {
    /// Create a new operator state from configuration.
    ///
    /// An interval below [`MIN_TICK_INTERVAL_MS`] is raised to it.
    pub fn new(tick_interval_ms: u64, bounds: &SimulationBoundsConfig) -> Self {
        Self {
            paused: AtomicBool::new(false),
            resume_notify: Notify::new(),
            stop_requested: AtomicBool::new(false),
            tick_interval_ms: AtomicU64::new(tick_interval_ms.max(MIN_TICK_INTERVAL_MS)),
            ticks_run: AtomicU64::new(0),
            started_at: Utc::now(),
            max_ticks: bounds.max_ticks,
            max_real_time_seconds: bounds.max_real_time_seconds,
            max_cycles: bounds.max_cycles,
            end_reason: Mutex::new(None),
        }
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// Check whether the simulation is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Pause the simulation. The tick loop will sleep until resumed.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Resume the simulation and wake the tick loop.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.resume_notify.notify_one();
    }

    /// Wait until the simulation is no longer paused.
    ///
    /// Returns `true` if it actually had to wait, so the caller knows to
    /// discard the time spent paused.
    pub async fn wait_if_paused(&self) -> bool {
        let mut waited = false;
        while self.paused.load(Ordering::Acquire) {
            waited = true;
            self.resume_notify.notified().await;
        }
        waited
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Request a clean simulation stop.
    ///
    /// Also wakes a paused loop so it can observe the request.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.paused.store(false, Ordering::Release);
        self.resume_notify.notify_one();
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Record the reason the simulation ended.
    pub async fn set_end_reason(&self, reason: SimulationEndReason) {
        let mut guard = self.end_reason.lock().await;
        *guard = Some(reason);
    }

    /// Get the reason the simulation ended, if it has.
    pub async fn end_reason(&self) -> Option<SimulationEndReason> {
        *self.end_reason.lock().await
    }

    // -----------------------------------------------------------------------
    // Tick Speed
    // -----------------------------------------------------------------------

    /// Get the current tick interval in milliseconds.
    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms.load(Ordering::Acquire)
    }

    /// Set the tick interval in milliseconds.
    ///
    /// Returns the previous interval on success, or `None` if the
    /// value was rejected (below [`MIN_TICK_INTERVAL_MS`]).
    pub fn set_tick_interval_ms(&self, ms: u64) -> Option<u64> {
        if ms < MIN_TICK_INTERVAL_MS {
            return None;
        }
        let prev = self.tick_interval_ms.swap(ms, Ordering::AcqRel);
        Some(prev)
    }

    // -----------------------------------------------------------------------
    // Progress
    // -----------------------------------------------------------------------

    /// Count one completed tick and return the new total.
    pub fn record_tick(&self) -> u64 {
        self.ticks_run
            .fetch_add(1, Ordering::AcqRel)
            .saturating_add(1)
    }

    /// Ticks completed so far.
    pub fn ticks_run(&self) -> u64 {
        self.ticks_run.load(Ordering::Acquire)
    }

    // -----------------------------------------------------------------------
    // Boundaries
    // -----------------------------------------------------------------------

    /// Check whether the tick limit has been reached.
    ///
    /// Returns `true` if `max_ticks > 0` and `current_tick >= max_ticks`.
    pub const fn tick_limit_reached(&self, current_tick: u64) -> bool {
        self.max_ticks > 0 && current_tick >= self.max_ticks
    }

    /// Check whether the evolution cycle limit has been reached.
    pub const fn cycle_limit_reached(&self, evolution_cycle: u64) -> bool {
        self.max_cycles > 0 && evolution_cycle >= self.max_cycles
    }

    /// Check whether the wall-clock time limit has been reached.
    pub fn time_limit_reached(&self) -> bool {
        if self.max_real_time_seconds == 0 {
            return false;
        }
        self.elapsed_seconds() >= self.max_real_time_seconds
    }

    /// Return the wall-clock start time.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Return elapsed seconds since simulation start.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        // Negative if the wall clock stepped backwards; treat as 0.
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }

    /// Get the configured max ticks.
    pub const fn max_ticks(&self) -> u64 {
        self.max_ticks
    }

    /// Get the configured max real-time seconds.
    pub const fn max_real_time_seconds(&self) -> u64 {
        self.max_real_time_seconds
    }

    /// Get the configured max evolution cycles.
    pub const fn max_cycles(&self) -> u64 {
        self.max_cycles
    }

    /// Snapshot of the control state combined with the current cycle and
    /// entropy.
    pub async fn status(&self, evolution_cycle: u64, entropy: f64) -> SimulationStatus {
        SimulationStatus {
            tick: self.ticks_run(),
            paused: self.is_paused(),
            stop_requested: self.is_stop_requested(),
            tick_interval_ms: self.tick_interval_ms(),
            elapsed_seconds: self.elapsed_seconds(),
            evolution_cycle,
            entropy,
            max_ticks: self.max_ticks,
            max_real_time_seconds: self.max_real_time_seconds,
            max_cycles: self.max_cycles,
            end_reason: self.end_reason().await,
            started_at: self.started_at.to_rfc3339(),
        }
    }
}

/// Serializable status of the simulation for the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationStatus {
    /// Ticks completed.
    pub tick: u64,
    /// Whether the simulation is paused.
    pub paused: bool,
    /// Whether a stop has been requested.
    pub stop_requested: bool,
    /// Current tick interval in milliseconds.
    pub tick_interval_ms: u64,
    /// Elapsed wall-clock seconds since start.
    pub elapsed_seconds: u64,
    /// Current evolution cycle.
    pub evolution_cycle: u64,
    /// Current entropy.
    pub entropy: f64,
    /// Configured maximum ticks (0 = unlimited).
    pub max_ticks: u64,
    /// Configured maximum real-time seconds (0 = unlimited).
    pub max_real_time_seconds: u64,
    /// Configured maximum cycles (0 = unlimited).
    pub max_cycles: u64,
    /// The reason the simulation ended, if applicable.
    pub end_reason: Option<SimulationEndReason>,
    /// RFC 3339 timestamp of when the simulation started.
    pub started_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(max_ticks: u64, max_cycles: u64) -> SimulationBoundsConfig {
        SimulationBoundsConfig {
            max_ticks,
            max_real_time_seconds: 0,
            max_cycles,
        }
    }

    #[test]
    fn initial_state_is_not_paused() {
        let state = OperatorState::new(16, &bounds(0, 0));
        assert!(!state.is_paused());
        assert!(!state.is_stop_requested());
        assert_eq!(state.ticks_run(), 0);
    }

    #[test]
    fn pause_and_resume() {
        let state = OperatorState::new(16, &bounds(0, 0));
        state.pause();
        assert!(state.is_paused());
        state.resume();
        assert!(!state.is_paused());
    }

    #[test]
    fn stop_request_unpauses() {
        let state = OperatorState::new(16, &bounds(0, 0));
        state.pause();
        state.request_stop();
        assert!(state.is_stop_requested());
        assert!(!state.is_paused());
    }

    #[test]
    fn set_tick_interval() {
        let state = OperatorState::new(16, &bounds(0, 0));
        assert_eq!(state.set_tick_interval_ms(100), Some(16));
        assert_eq!(state.tick_interval_ms(), 100);
    }

    #[test]
    fn reject_sub_minimum_interval() {
        let state = OperatorState::new(16, &bounds(0, 0));
        assert!(state.set_tick_interval_ms(3).is_none());
        assert_eq!(state.tick_interval_ms(), 16);
        assert_eq!(state.set_tick_interval_ms(4), Some(16));
    }

    #[test]
    fn constructor_raises_tiny_interval() {
        let state = OperatorState::new(0, &bounds(0, 0));
        assert_eq!(state.tick_interval_ms(), MIN_TICK_INTERVAL_MS);
    }

    #[test]
    fn limits_zero_mean_unlimited() {
        let state = OperatorState::new(16, &bounds(0, 0));
        assert!(!state.tick_limit_reached(999_999));
        assert!(!state.cycle_limit_reached(999_999));
        assert!(!state.time_limit_reached());
    }

    #[test]
    fn tick_and_cycle_limits() {
        let state = OperatorState::new(16, &bounds(100, 3));
        assert!(!state.tick_limit_reached(99));
        assert!(state.tick_limit_reached(100));
        assert!(!state.cycle_limit_reached(2));
        assert!(state.cycle_limit_reached(3));
    }

    #[test]
    fn record_tick_counts() {
        let state = OperatorState::new(16, &bounds(0, 0));
        assert_eq!(state.record_tick(), 1);
        assert_eq!(state.record_tick(), 2);
        assert_eq!(state.ticks_run(), 2);
    }

    #[tokio::test]
    async fn wait_if_paused_returns_immediately_when_running() {
        let state = OperatorState::new(16, &bounds(0, 0));
        assert!(!state.wait_if_paused().await);
    }

    #[tokio::test]
    async fn end_reason_roundtrip() {
        let state = OperatorState::new(16, &bounds(0, 0));
        assert!(state.end_reason().await.is_none());
        state.set_end_reason(SimulationEndReason::OperatorStop).await;
        assert_eq!(
            state.end_reason().await,
            Some(SimulationEndReason::OperatorStop)
        );
        let status = state.status(4, 12.5).await;
        assert_eq!(status.evolution_cycle, 4);
        assert_eq!(status.end_reason, Some(SimulationEndReason::OperatorStop));
    }
}
