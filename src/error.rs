//! Typed failures, attached as the root cause of a [`Report`](color_eyre::eyre::Report).
//!
//! Callers that need to react to a particular failure can recover it with
//! [`Report::downcast_ref`](color_eyre::eyre::Report::downcast_ref).

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    /// An external collaborator could not be run, or its output could not be parsed.
    #[error("Analysis {analysis} failed: {reason}")]
    Analysis { analysis: String, reason: String },

    /// An external collaborator exceeded the configured timeout.
    #[error("Command {command:?} timed out after {seconds} seconds")]
    Timeout { command: String, seconds: u64 },

    /// Cluster or analysis definitions are malformed.
    #[error("Invalid definitions: {0}")]
    Definition(String),

    /// A user supplied parameter could not be used.
    #[error("Invalid value for parameter {name}: {value:?}")]
    Parameter { name: String, value: String },
}

impl Error {
    pub fn analysis(analysis: &str, reason: impl Into<String>) -> Self {
        Error::Analysis { analysis: analysis.to_string(), reason: reason.into() }
    }

    pub fn definition(reason: impl Into<String>) -> Self {
        Error::Definition(reason.into())
    }
}
