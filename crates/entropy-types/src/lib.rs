//! Shared type definitions for the Entropy Engine simulation.
//!
//! This crate is the single source of truth for the state shape that the
//! engine publishes and that presentation consumers (grid, audio, history
//! panels) read. Types flow downstream to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for patterns, tasks and log events
//! - [`enums`] -- Metric identities, pattern types, collapse causes, event kinds
//! - [`structs`] -- The `SystemState` root value and its entities

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{CollapseCause, EventKind, MetricKind, PatternType};
pub use ids::{EventId, PatternId, TaskId};
pub use structs::{CollapseRecord, Metric, Pattern, SystemEvent, SystemState, Task};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // The actual files are written to the `bindings/` directory
        // relative to the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::PatternId::export_all();
        let _ = crate::ids::TaskId::export_all();
        let _ = crate::ids::EventId::export_all();

        // Enums
        let _ = crate::enums::MetricKind::export_all();
        let _ = crate::enums::PatternType::export_all();
        let _ = crate::enums::CollapseCause::export_all();
        let _ = crate::enums::EventKind::export_all();

        // Structs
        let _ = crate::structs::Metric::export_all();
        let _ = crate::structs::Pattern::export_all();
        let _ = crate::structs::Task::export_all();
        let _ = crate::structs::SystemState::export_all();
        let _ = crate::structs::CollapseRecord::export_all();
        let _ = crate::structs::SystemEvent::export_all();
    }
}
