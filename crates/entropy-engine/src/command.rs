//! Line commands read from stdin.
//!
//! One command per line, verb first, case-insensitive verb:
//!
//! ```text
//! inject <amount>     spawn              task <label...>
//! complete <task-id>  collapse           reboot
//! pause               resume             speed <ms>
//! status              history            events
//! help                quit
//! ```

use std::num::{ParseFloatError, ParseIntError};

use entropy_types::TaskId;

/// Errors from parsing an operator command line.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The verb is not recognised.
    #[error("unknown command: {verb} (try `help`)")]
    Unknown {
        /// The verb as typed.
        verb: String,
    },

    /// A required argument is missing.
    #[error("`{command}` needs {argument}")]
    MissingArgument {
        /// The command missing its argument.
        command: &'static str,
        /// What was expected.
        argument: &'static str,
    },

    /// An entropy amount did not parse.
    #[error("invalid amount {value:?}: {source}")]
    InvalidAmount {
        /// The rejected text.
        value: String,
        /// The parse failure.
        source: ParseFloatError,
    },

    /// An entropy amount parsed but is NaN or infinite.
    #[error("amount must be finite, got {value}")]
    NonFiniteAmount {
        /// The rejected text.
        value: String,
    },

    /// A tick interval did not parse.
    #[error("invalid interval {value:?}: {source}")]
    InvalidInterval {
        /// The rejected text.
        value: String,
        /// The parse failure.
        source: ParseIntError,
    },

    /// A task id is not a UUID.
    #[error("invalid task id {value:?}: {source}")]
    InvalidTaskId {
        /// The rejected text.
        value: String,
        /// The parse failure.
        source: uuid::Error,
    },
}

/// A parsed operator command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Inject entropy.
    Inject(f64),
    /// Spawn a pattern.
    Spawn,
    /// Add a task with this label.
    Task(String),
    /// Complete the task with this id.
    Complete(TaskId),
    /// Force a collapse.
    Collapse,
    /// Alias of collapse.
    Reboot,
    /// Pause the tick loop.
    Pause,
    /// Resume the tick loop.
    Resume,
    /// Change the tick interval.
    Speed(u64),
    /// Print operator status and the current state.
    Status,
    /// Print the collapse history.
    History,
    /// Print the event log.
    Events,
    /// Print the command list.
    Help,
    /// Stop the simulation and exit.
    Quit,
}

/// Text printed by `help`.
pub const HELP: &str = "commands: inject <amount> | spawn | task <label...> | complete <task-id> | \
collapse | reboot | pause | resume | speed <ms> | status | history | events | help | quit";

impl Command {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        let (verb, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(verb, rest)| (verb, rest.trim()));
        if verb.is_empty() {
            return Ok(None);
        }

        let command = match verb.to_ascii_lowercase().as_str() {
            "inject" => Self::Inject(parse_amount(rest)?),
            "spawn" => Self::Spawn,
            "task" => {
                if rest.is_empty() {
                    return Err(CommandError::MissingArgument {
                        command: "task",
                        argument: "a label",
                    });
                }
                Self::Task(rest.split_whitespace().collect::<Vec<_>>().join(" "))
            }
            "complete" => {
                let value = first_arg(rest, "complete", "a task id")?;
                let id = value
                    .parse::<TaskId>()
                    .map_err(|source| CommandError::InvalidTaskId {
                        value: value.to_owned(),
                        source,
                    })?;
                Self::Complete(id)
            }
            "collapse" => Self::Collapse,
            "reboot" => Self::Reboot,
            "pause" => Self::Pause,
            "resume" => Self::Resume,
            "speed" => {
                let value = first_arg(rest, "speed", "an interval in milliseconds")?;
                let ms = value
                    .parse::<u64>()
                    .map_err(|source| CommandError::InvalidInterval {
                        value: value.to_owned(),
                        source,
                    })?;
                Self::Speed(ms)
            }
            "status" => Self::Status,
            "history" => Self::History,
            "events" => Self::Events,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => {
                return Err(CommandError::Unknown {
                    verb: other.to_owned(),
                });
            }
        };
        Ok(Some(command))
    }
}

fn first_arg<'a>(
    rest: &'a str,
    command: &'static str,
    argument: &'static str,
) -> Result<&'a str, CommandError> {
    rest.split_whitespace()
        .next()
        .ok_or(CommandError::MissingArgument { command, argument })
}

fn parse_amount(rest: &str) -> Result<f64, CommandError> {
    let value = first_arg(rest, "inject", "an amount")?;
    let amount = value
        .parse::<f64>()
        .map_err(|source| CommandError::InvalidAmount {
            value: value.to_owned(),
            source,
        })?;
    if !amount.is_finite() {
        return Err(CommandError::NonFiniteAmount {
            value: value.to_owned(),
        });
    }
    Ok(amount)
}
