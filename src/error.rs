//! Error types for quitch.
//!
//! This module provides the error hierarchy for every stage of a run:
//! configuration, plan parsing, connecting to MySQL, the registry,
//! reconciliation, and the deploy/revert engine.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for quitch.
#[derive(Debug, Error)]
pub enum QuitchError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Plan document errors.
    #[error("Plan error: {0}")]
    Parse(#[from] ParseError),

    /// Target or registry connection errors.
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Registry storage errors.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// The registry disagrees with the plan.
    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// Deploy/revert errors.
    #[error("{0}")]
    Engine(#[from] EngineError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// No target database was given anywhere.
    #[error("No target database configured (use --target or QUITCH_TARGET)")]
    MissingTarget,
}

/// Plan document and change line errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The plan does not start with the supported syntax version pragma.
    #[error("Unsupported plan syntax: expected `%syntax-version=1.0.0`, found {}", .found.as_deref().unwrap_or("an empty document"))]
    UnsupportedSyntax {
        /// First non-empty line of the document, if any.
        found: Option<String>,
    },

    /// A change line has no space after the change name.
    #[error("Missing space after change name in line: {line}")]
    MissingSpaceAfterName {
        /// The offending line.
        line: String,
    },

    /// A change line has no space after the planned date.
    #[error("Missing space after date in line: {line}")]
    MissingSpaceAfterDate {
        /// The offending line.
        line: String,
    },

    /// The planned date is not an ISO-8601 instant.
    #[error("Invalid date in line: {line} ({message})")]
    InvalidDate {
        /// The offending line.
        line: String,
        /// Description of the date error.
        message: String,
    },

    /// Two changes in the plan share a name.
    #[error("Duplicate change name in plan: {name}")]
    DuplicateChange {
        /// The duplicated name.
        name: String,
    },
}

/// Connection errors for the target and registry databases.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The target URL could not be parsed.
    #[error("Invalid target URL: {message}")]
    InvalidUrl {
        /// Description of the URL error.
        message: String,
    },

    /// The URL scheme is not `mysql`.
    #[error("Unsupported target scheme `{scheme}`: only mysql is supported")]
    UnsupportedScheme {
        /// The scheme found in the URL.
        scheme: String,
    },

    /// The URL has no host.
    #[error("Target URL is missing a hostname")]
    MissingHost,

    /// The URL has no password.
    #[error("Target URL is missing a password")]
    MissingPassword,

    /// The database could not be reached.
    #[error("Failed to connect to {target}: {message}")]
    Unreachable {
        /// Redacted target description.
        target: String,
        /// Driver error message.
        message: String,
    },
}

/// Registry storage errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A registry query failed.
    #[error("Registry query failed while trying to {operation}: {message}")]
    Query {
        /// What the registry was doing.
        operation: String,
        /// Driver error message.
        message: String,
    },

    /// The registry schema name cannot be used as an identifier.
    #[error("Invalid registry name `{name}`: backticks are not allowed")]
    InvalidRegistryName {
        /// The rejected name.
        name: String,
    },

    /// A row read from the registry could not be interpreted.
    #[error("Corrupt registry row: {message}")]
    CorruptRow {
        /// Description of the problem.
        message: String,
    },
}

/// Reconciliation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    /// The registry records changes that the plan's chain cannot reach.
    #[error("Registry contains changes that are not in the plan: {}", .ids.join(", "))]
    UnknownChanges {
        /// Offending change ids, sorted ascending.
        ids: Vec<String>,
    },
}

/// Deploy/revert engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No change is deployed.
    #[error("Nothing to revert{}", empty_plan_suffix(.plan_empty))]
    NothingToRevert {
        /// Whether the plan itself has no changes.
        plan_empty: bool,
    },

    /// The script for a change does not exist.
    #[error("Script not found: {path}")]
    ScriptNotFound {
        /// Expected script path.
        path: PathBuf,
    },

    /// The script for a change failed on the target.
    #[error("Failed to {action} change '{change}': {message}")]
    ScriptExecution {
        /// `deploy` or `revert`.
        action: String,
        /// Name of the change.
        change: String,
        /// Error reported by the target.
        message: String,
    },

    /// A requested change name is not in the plan.
    #[error("Change not found in plan: {name}")]
    UnknownChange {
        /// The requested name.
        name: String,
    },
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn empty_plan_suffix(plan_empty: &bool) -> &'static str {
    if *plan_empty { " (the plan is empty)" } else { "" }
}

/// Result type alias for quitch operations.
pub type Result<T> = std::result::Result<T, QuitchError>;

impl QuitchError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error only means there was no work to do.
    #[must_use]
    pub const fn is_nothing_to_do(&self) -> bool {
        matches!(self, Self::Engine(EngineError::NothingToRevert { .. }))
    }

    /// Returns the change ids this error is about, if any.
    #[must_use]
    pub fn offending_ids(&self) -> &[String] {
        match self {
            Self::Reconcile(ReconcileError::UnknownChanges { ids }) => ids,
            _ => &[],
        }
    }
}

impl ConnectionError {
    /// Creates an unreachable error for a redacted target.
    #[must_use]
    pub fn unreachable(target: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Unreachable {
            target: target.into(),
            message: message.to_string(),
        }
    }
}

impl RegistryError {
    /// Creates a query error for the given operation.
    #[must_use]
    pub fn query(operation: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Query {
            operation: operation.into(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_changes_message_lists_ids() {
        let err = QuitchError::from(ReconcileError::UnknownChanges {
            ids: vec![String::from("aaa"), String::from("bbb")],
        });

        assert!(err.to_string().contains("aaa, bbb"));
        assert_eq!(err.offending_ids(), ["aaa", "bbb"]);
    }

    #[test]
    fn test_nothing_to_revert_is_nothing_to_do() {
        let err = QuitchError::from(EngineError::NothingToRevert { plan_empty: true });

        assert!(err.is_nothing_to_do());
        assert_eq!(err.to_string(), "Nothing to revert (the plan is empty)");
        assert!(!QuitchError::internal("boom").is_nothing_to_do());
    }
}
