//! Simulation loop runner with operator controls.
//!
//! This module provides [`run_simulation`], the top-level async function
//! that drives the tick loop with support for:
//!
//! - **Bounded simulation**: stop after `max_ticks`, `max_real_time_seconds`
//!   or `max_cycles`
//! - **Pause/resume**: operator can halt and continue the tick loop; time
//!   spent paused is discarded rather than delivered as one huge delta
//! - **Variable tick speed**: tick interval adjustable at runtime
//! - **Operator stop**: immediate clean stop
//!
//! The runner wraps [`StateStore::tick`] and adds the control plane around
//! it. Actions issued by other tasks go straight to the store and interleave
//! with ticks in the order they take the writer lock.

use std::sync::Arc;

use entropy_types::SystemState;
use tracing::{info, warn};

use crate::clock::TickSource;
use crate::operator::{OperatorState, SimulationEndReason};
use crate::store::StateStore;
use crate::tick::TickReport;

/// Result of the simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    /// The reason the simulation ended.
    pub end_reason: SimulationEndReason,
    /// The last tick report, if any tick completed.
    pub final_report: Option<TickReport>,
    /// Total number of ticks executed.
    pub total_ticks: u64,
    /// Collapses triggered by the pipeline during this run.
    pub collapses: u64,
    /// Evolution cycle when the run ended.
    pub final_cycle: u64,
}

/// Callback invoked after each tick completes.
///
/// The callback receives the tick report and the state the tick produced.
pub trait TickCallback: Send {
    /// Called after a tick completes.
    fn on_tick(&mut self, report: &TickReport, state: &SystemState);
}

/// A no-op tick callback for testing.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _report: &TickReport, _state: &SystemState) {}
}

/// Run the simulation loop until a termination condition is met.
///
/// Each iteration: wait while paused, check for a stop request and the
/// wall-clock limit, tick the store with the clock's delta, invoke the
/// callback, check the cycle and tick limits, then sleep the tick interval.
pub async fn run_simulation(
    store: &StateStore,
    clock: &mut dyn TickSource,
    operator: &Arc<OperatorState>,
    callback: &mut dyn TickCallback,
) -> SimulationResult {
    let mut last_report: Option<TickReport> = None;
    let mut total_ticks: u64 = 0;
    let mut collapses: u64 = 0;

    info!(
        max_ticks = operator.max_ticks(),
        max_real_time_seconds = operator.max_real_time_seconds(),
        max_cycles = operator.max_cycles(),
        tick_interval_ms = operator.tick_interval_ms(),
        "Simulation starting"
    );

    clock.reset();

    loop {
        // --- Check pause ---
        if operator.is_paused() {
            info!("Simulation paused, waiting for resume...");
        }
        if operator.wait_if_paused().await {
            clock.reset();
            info!("Simulation resumed");
        }

        // --- Check stop request (before tick) ---
        let pre_tick_end = if operator.is_stop_requested() {
            info!("Operator stop requested");
            Some(SimulationEndReason::OperatorStop)
        } else if operator.time_limit_reached() {
            info!(
                max_seconds = operator.max_real_time_seconds(),
                elapsed = operator.elapsed_seconds(),
                "Real-time limit reached"
            );
            Some(SimulationEndReason::MaxRealTimeReached)
        } else {
            None
        };
        if let Some(reason) = pre_tick_end {
            operator.set_end_reason(reason).await;
            return SimulationResult {
                end_reason: reason,
                final_report: last_report,
                total_ticks,
                collapses,
                final_cycle: store.read().evolution_cycle,
            };
        }

        // --- Execute tick ---
        let report = store.tick(clock.elapsed_secs());
        let state = store.read();
        total_ticks = operator.record_tick();
        if report.collapse.is_some() {
            collapses = collapses.saturating_add(1);
        }

        // --- Notify callback ---
        callback.on_tick(&report, &state);

        // --- Check cycle limit, then tick limit (after tick) ---
        let post_tick_end = if operator.cycle_limit_reached(state.evolution_cycle) {
            info!(
                cycle = state.evolution_cycle,
                max_cycles = operator.max_cycles(),
                "Cycle limit reached"
            );
            Some(SimulationEndReason::MaxCyclesReached)
        } else if operator.tick_limit_reached(total_ticks) {
            info!(
                tick = total_ticks,
                max_ticks = operator.max_ticks(),
                "Tick limit reached"
            );
            Some(SimulationEndReason::MaxTicksReached)
        } else {
            None
        };
        if let Some(reason) = post_tick_end {
            operator.set_end_reason(reason).await;
            return SimulationResult {
                end_reason: reason,
                final_report: Some(report),
                total_ticks,
                collapses,
                final_cycle: state.evolution_cycle,
            };
        }

        last_report = Some(report);

        // --- Sleep for tick interval ---
        let interval_ms = operator.tick_interval_ms();
        if interval_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(interval_ms)).await;
        }
    }
}

/// Log the simulation end sequence.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        collapses = result.collapses,
        final_cycle = result.final_cycle,
        "Simulation ended"
    );

    if let Some(ref report) = result.final_report {
        info!(
            entropy = report.accumulated_entropy,
            delta_secs = report.delta_secs,
            collapse = ?report.collapse,
            "Final tick report"
        );
    } else {
        warn!("Simulation ended with no ticks executed");
    }
}
