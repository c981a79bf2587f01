//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Patterns, tasks and journal events each carry a strongly-typed ID so a
//! task id can never be handed to an operation expecting a pattern. All IDs
//! use UUID v7 (time-ordered), which keeps insertion order visible when
//! consumers sort by id.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a transient pattern entity.
    PatternId
}

define_id! {
    /// Unique identifier for a user-created task.
    TaskId
}

define_id! {
    /// Unique identifier for an entry in the system event log.
    EventId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let pattern = PatternId::new();
        let task = TaskId::new();
        // These are different types -- the compiler enforces no mixing.
        assert_ne!(pattern.into_inner(), Uuid::nil());
        assert_ne!(task.into_inner(), Uuid::nil());
    }

    #[test]
    fn ids_are_unique() {
        let a = TaskId::new();
        let b = TaskId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn id_roundtrip_serde() {
        let original = TaskId::new();
        let json = serde_json::to_string(&original).ok();
        assert!(json.is_some());
        let restored: Result<TaskId, _> = serde_json::from_str(json.as_deref().unwrap_or(""));
        assert_eq!(restored.ok(), Some(original));
    }

    #[test]
    fn id_parses_from_display() {
        let id = TaskId::new();
        let parsed: Result<TaskId, _> = id.to_string().parse();
        assert_eq!(parsed.ok(), Some(id));
    }

    #[test]
    fn id_parse_rejects_garbage() {
        let parsed: Result<PatternId, _> = "not-a-uuid".parse();
        assert!(parsed.is_err());
    }
}
