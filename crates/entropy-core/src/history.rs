//! Collapse history: one record per finished evolution cycle.

use std::collections::VecDeque;

use chrono::Utc;
use entropy_types::{CollapseCause, CollapseRecord, SystemState};

use crate::store::{Mutation, StateListener};

/// Bounded, oldest-first record of past collapses.
#[derive(Debug, Clone)]
pub struct CollapseHistory {
    records: VecDeque<CollapseRecord>,
    capacity: usize,
    total: u64,
    /// Highest entropy seen so far in the running cycle.
    peak: f64,
}

impl CollapseHistory {
    /// Create an empty history keeping at most `capacity` records.
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
            total: 0,
            peak: 0.0,
        }
    }

    /// Retained records, oldest first.
    pub fn records(&self) -> impl Iterator<Item = &CollapseRecord> {
        self.records.iter()
    }

    /// The most recent collapse, if any.
    pub fn latest(&self) -> Option<&CollapseRecord> {
        self.records.back()
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been recorded yet (or capacity is 0).
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Collapses recorded since creation, including evicted ones.
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Peak entropy of the cycle currently running.
    pub const fn current_peak(&self) -> f64 {
        self.peak
    }

    /// Mean peak entropy over the retained records.
    pub fn average_peak_entropy(&self) -> Option<f64> {
        if self.records.is_empty() {
            return None;
        }
        let sum: f64 = self.records.iter().map(|r| r.peak_entropy).sum();
        let count = f64::from(u32::try_from(self.records.len()).unwrap_or(u32::MAX));
        Some(sum / count)
    }

    fn record(&mut self, cycle: u64, cause: CollapseCause) {
        self.total = self.total.saturating_add(1);
        if self.capacity == 0 {
            return;
        }
        while self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(CollapseRecord {
            cycle,
            peak_entropy: self.peak,
            cause,
            collapsed_at: Utc::now(),
        });
    }
}

impl StateListener for CollapseHistory {
    fn on_change(&mut self, mutation: &Mutation, previous: &SystemState, current: &SystemState) {
        if current.evolution_cycle > previous.evolution_cycle {
            // A saturating tick never publishes its 100; the report carries it.
            let reached = match mutation {
                Mutation::Tick(report) => report.accumulated_entropy,
                _ => previous.entropy,
            };
            self.peak = self.peak.max(reached);
            let cause = mutation.collapse_cause().unwrap_or(CollapseCause::Forced);
            self.record(previous.evolution_cycle, cause);
            self.peak = current.entropy;
        } else {
            self.peak = self.peak.max(current.entropy);
        }
    }
}
