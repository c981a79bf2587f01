//! Clock sources for the Entropy Engine.
//!
//! The clock is the only source of time in the simulation. It reports the
//! real (or simulated) seconds elapsed since the previous read; the update
//! pipeline is driven by that delta, never by a frame count.
//!
//! # Design Principles
//!
//! - A clock only measures. Clamping to a sane range happens in
//!   [`clamp_delta`], which the pipeline applies to every delta whatever
//!   its source.
//! - [`TickSource::reset`] discards time accumulated while ticks were not
//!   being delivered (paused runner, backgrounded host).

use std::time::Instant;

/// Errors that can occur when constructing a clock.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// A fixed step must be finite and non-negative.
    #[error("invalid fixed step: {step} (must be finite and >= 0)")]
    InvalidStep {
        /// The rejected step in seconds.
        step: f64,
    },
}

/// A source of elapsed time between ticks.
pub trait TickSource: Send {
    /// Seconds elapsed since the previous call (or since the last reset).
    fn elapsed_secs(&mut self) -> f64;

    /// Forget any time accumulated since the previous call.
    fn reset(&mut self);
}

/// Clamp a raw delta to `[0, max_secs]`.
///
/// NaN and negative deltas become 0; anything above `max_secs` is capped so
/// a long pause cannot produce an unbounded single-tick jump.
pub const fn clamp_delta(raw_secs: f64, max_secs: f64) -> f64 {
    if raw_secs.is_nan() || raw_secs <= 0.0 {
        return 0.0;
    }
    raw_secs.min(max_secs.max(0.0))
}

/// Wall-clock source backed by [`Instant`].
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    /// Instant of the previous read.
    last: Instant,
}

impl MonotonicClock {
    /// Create a clock whose first read measures from now.
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for MonotonicClock {
    fn elapsed_secs(&mut self) -> f64 {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last).as_secs_f64();
        self.last = now;
        elapsed
    }

    fn reset(&mut self) {
        self.last = Instant::now();
    }
}

/// Source that advances by the same step on every read.
///
/// Combined with a seeded store this gives fully reproducible headless runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedStepClock {
    step_secs: f64,
}

impl FixedStepClock {
    /// Create a fixed-step clock.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidStep`] if `step_secs` is negative, NaN
    /// or infinite.
    pub fn new(step_secs: f64) -> Result<Self, ClockError> {
        if !step_secs.is_finite() || step_secs < 0.0 {
            return Err(ClockError::InvalidStep { step: step_secs });
        }
        Ok(Self { step_secs })
    }
}

impl TickSource for FixedStepClock {
    fn elapsed_secs(&mut self) -> f64 {
        self.step_secs
    }

    fn reset(&mut self) {}
}

/// Hand-driven source for tests and embedding hosts that own their timer.
///
/// Time accumulates through [`advance`](Self::advance) and is drained by the
/// next read.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ManualClock {
    pending_secs: f64,
}

impl ManualClock {
    /// Create a clock with nothing pending.
    pub const fn new() -> Self {
        Self { pending_secs: 0.0 }
    }

    /// Add elapsed time to be delivered on the next read.
    pub fn advance(&mut self, secs: f64) {
        self.pending_secs += secs;
    }
}

impl TickSource for ManualClock {
    fn elapsed_secs(&mut self) -> f64 {
        core::mem::take(&mut self.pending_secs)
    }

    fn reset(&mut self) {
        self.pending_secs = 0.0;
    }
}
