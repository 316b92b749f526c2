//! Error types for gups

use thiserror::Error;

use crate::set::Set;

/// Result type alias for gups operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for gups operations
///
/// Everything except [`Error::UnknownRule`] is raised while loading
/// configuration and must stop the process before any sweep starts.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A pool lists logins that are not configured users
    #[error("unknown users {users} in pool '{pool}'")]
    UnknownUsers { pool: String, users: Set },

    /// A directive guard names a pool that does not exist
    #[error("unknown if pool '{pool}' in rule '{rule}'")]
    UnknownGuardPool { rule: String, pool: String },

    /// A pick names a pool that does not exist
    #[error("unknown pool name '{pool}' in rule '{rule}' for condition '{guard}'")]
    UnknownPickPool {
        rule: String,
        guard: String,
        pool: String,
    },

    /// A pick string could not be parsed
    #[error("malformed pick '{pick}' in rule '{rule}': {reason}")]
    MalformedPick {
        rule: String,
        pick: String,
        reason: String,
    },

    /// A repository references a rule that does not exist
    #[error("unknown rule '{rule}' for repo '{repo}'")]
    UnknownRepoRule { repo: String, rule: String },

    /// The engine was asked to evaluate a rule it does not know
    #[error("unknown rule '{0}'")]
    UnknownRule(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
