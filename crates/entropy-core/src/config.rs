//! Configuration loading and typed config structures for the Entropy Engine.
//!
//! The canonical configuration lives in `entropy-config.yaml` at the working
//! directory root. Every field has a default, so an empty file (or no file at
//! all) yields a runnable engine with the reference dynamics.

use std::path::Path;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but describes an unusable engine.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
///
/// Mirrors the structure of `entropy-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EngineConfig {
    /// Session name and random seed.
    #[serde(default)]
    pub world: WorldConfig,

    /// Tunables of the update pipeline and collapse controller.
    #[serde(default)]
    pub dynamics: DynamicsConfig,

    /// Tick cadence and clock selection.
    #[serde(default)]
    pub operator: OperatorConfig,

    /// Simulation boundary parameters.
    #[serde(default)]
    pub simulation: SimulationBoundsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Collapse history and event log sizing.
    #[serde(default)]
    pub journal: JournalConfig,
}

impl EngineConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `ENTROPY_SEED` overrides `world.seed` when set to a valid `u64`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if the dynamics fail validation.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.world.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if the dynamics fail validation.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // serde_yml treats an empty document as a unit value, not an empty map.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section that can describe an unusable engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.dynamics.validate()?;
        if let Some(step) = self.operator.fixed_step_secs {
            if !step.is_finite() || step < 0.0 {
                return Err(ConfigError::Invalid {
                    reason: format!("operator.fixed_step_secs must be finite and >= 0, got {step}"),
                });
            }
        }
        Ok(())
    }
}

/// Session-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Human-readable session name.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Random seed for reproducible runs. `None` seeds from the OS.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl WorldConfig {
    /// Override the seed with `ENTROPY_SEED` when it is set and parses.
    pub fn apply_env_overrides(&mut self) {
        self.apply_seed_override(std::env::var("ENTROPY_SEED").ok().as_deref());
    }

    /// Replace the seed with `raw` when it parses as a `u64`. Anything else
    /// leaves the seed alone.
    pub fn apply_seed_override(&mut self, raw: Option<&str>) {
        match raw.map(|val| val.trim().parse::<u64>()) {
            Some(Ok(seed)) => self.seed = Some(seed),
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Ignoring unparsable ENTROPY_SEED");
            }
            None => {}
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: None,
        }
    }
}

/// Tunables of the update pipeline.
///
/// Rates are expressed per 1/60 s frame, matching the reference dynamics;
/// the pipeline scales them by `delta_secs * 60`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DynamicsConfig {
    /// Seconds between forced countdown collapses.
    #[serde(default = "default_collapse_interval_secs")]
    pub collapse_interval_secs: f64,

    /// Entropy added per frame regardless of activity. Zero makes entropy
    /// purely action-driven.
    #[serde(default)]
    pub passive_entropy_growth: f64,

    /// Age in seconds at which a pattern is removed.
    #[serde(default = "default_pattern_expiry_secs")]
    pub pattern_expiry_secs: f64,

    /// Upper bound applied to every tick delta.
    #[serde(default = "default_max_delta_secs")]
    pub max_delta_secs: f64,
}

impl DynamicsConfig {
    /// Reject intervals and bounds that would stall or explode the pipeline.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("dynamics.collapse_interval_secs", self.collapse_interval_secs),
            ("dynamics.pattern_expiry_secs", self.pattern_expiry_secs),
            ("dynamics.max_delta_secs", self.max_delta_secs),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid {
                    reason: format!("{name} must be finite and > 0, got {value}"),
                });
            }
        }
        if !self.passive_entropy_growth.is_finite() || self.passive_entropy_growth < 0.0 {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "dynamics.passive_entropy_growth must be finite and >= 0, got {}",
                    self.passive_entropy_growth
                ),
            });
        }
        Ok(())
    }
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        Self {
            collapse_interval_secs: default_collapse_interval_secs(),
            passive_entropy_growth: 0.0,
            pattern_expiry_secs: default_pattern_expiry_secs(),
            max_delta_secs: default_max_delta_secs(),
        }
    }
}

/// Tick cadence and clock selection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OperatorConfig {
    /// Real-time milliseconds between ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// When set, every tick advances by exactly this many seconds instead of
    /// the measured wall time.
    #[serde(default)]
    pub fixed_step_secs: Option<f64>,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            fixed_step_secs: None,
        }
    }
}

/// Simulation boundary configuration.
///
/// A value of 0 for any bound means unlimited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationBoundsConfig {
    /// Maximum number of ticks before the run ends.
    #[serde(default)]
    pub max_ticks: u64,

    /// Maximum wall-clock seconds before the run ends.
    #[serde(default)]
    pub max_real_time_seconds: u64,

    /// Stop once the evolution cycle reaches this value.
    #[serde(default)]
    pub max_cycles: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit a status line every N ticks (0 disables it).
    #[serde(default = "default_status_interval_ticks")]
    pub status_interval_ticks: u64,

    /// Emit JSON log lines instead of human-readable text.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            status_interval_ticks: default_status_interval_ticks(),
            json: false,
        }
    }
}

/// Collapse history and event log sizing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JournalConfig {
    /// Number of collapse records kept.
    #[serde(default = "default_journal_capacity")]
    pub history_capacity: usize,

    /// Number of event log entries kept.
    #[serde(default = "default_journal_capacity")]
    pub event_capacity: usize,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_journal_capacity(),
            event_capacity: default_journal_capacity(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_world_name() -> String {
    String::from("entropy")
}

const fn default_collapse_interval_secs() -> f64 {
    60.0
}

const fn default_pattern_expiry_secs() -> f64 {
    10.0
}

const fn default_max_delta_secs() -> f64 {
    1.0
}

const fn default_tick_interval_ms() -> u64 {
    16
}

fn default_log_level() -> String {
    String::from("info")
}

const fn default_status_interval_ticks() -> u64 {
    300
}

const fn default_journal_capacity() -> usize {
    10
}
