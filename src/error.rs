//! # Error Handling
//!
//! This module defines the centralized error type for `mirror-hook`. It uses
//! the `thiserror` library to build an `Error` enum covering every failure that
//! can abort a whole webhook delivery, with a message carrying enough context
//! to diagnose it from the log stream alone.
//!
//! ## Key Components
//!
//! - **`Error`**: The enum of request-level failures. `NotFound` and
//!   `InvalidState` come out of repository resolution and stop the invocation
//!   before any subprocess runs. `Execution` describes a subprocess that could
//!   not be run at all.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! Failures of a single repository's clone or fetch are deliberately *not*
//! represented here. They are folded into a failed
//! [`SyncOutcome`](crate::mirror::SyncOutcome) so that sibling repositories in
//! the same delivery still get synchronized.

use thiserror::Error;

/// Main error type for mirror-hook operations
#[derive(Error, Debug)]
pub enum Error {
    /// A project or project identifier could not be found.
    ///
    /// Raised when neither the request parameters nor the payload name a
    /// project, or when the registry has no project with that identifier.
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// The registry holds the project but it cannot be synchronized, e.g.
    /// because none of its repositories is a git repository.
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    /// An external command could not be executed.
    ///
    /// `command` is the redacted command line, never the raw one.
    #[error("Command execution failed: {command} - {message}")]
    Execution { command: String, message: String },

    /// The repository registry failed to load or persist a record.
    #[error("Registry error: {message}")]
    Registry { message: String },

    /// The changeset indexer reported a failure for a repository.
    #[error("Changeset indexing failed for {repository}: {message}")]
    Indexer { repository: String, message: String },

    /// An error occurred while parsing a settings or registry file.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// The notification payload could not be interpreted.
    #[error("Invalid payload: {message}")]
    Payload { message: String },

    /// A mutex guarding shared state has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for [`Error::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Error::NotFound {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::InvalidState`].
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Error::InvalidState {
            message: message.into(),
        }
    }
}
