//! Unified error type for the migration tool.

use thiserror::Error;

/// All errors that can occur while loading logs, building the index or
/// converting content.
///
/// An unresolved commit reference is not an error: the resolver returns
/// `None` and logs a warning, and the rewriter substitutes a placeholder.
#[derive(Error, Debug)]
pub enum RelinkError {
    /// I/O error (file read/write, directory access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding error (log dumps, issue documents, config)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Serialization/deserialization error (bincode)
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Invalid regex pattern (built from a base URL)
    #[error("Invalid regex pattern '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A log entry is missing a required field or has an unparseable timestamp
    #[error("Malformed entry #{position} in {log} log: {reason}")]
    MalformedLogEntry {
        log: &'static str,
        position: usize,
        reason: String,
    },

    /// An injected collaborator (user lookup, VCS export) failed
    #[error("{collaborator} failed: {message}")]
    Collaborator {
        collaborator: &'static str,
        message: String,
    },

    /// Configuration file is present but unusable
    #[error("Invalid configuration in {path}: {message}")]
    InvalidConfig { path: String, message: String },

    /// Issue export does not have the expected shape
    #[error("Invalid issue document: {0}")]
    InvalidDocument(String),

    /// Missing or conflicting command-line arguments
    #[error("{0}")]
    InvalidArgs(String),

    /// Failed to load a saved index from disk
    #[error("Failed to load index from {path}: {message}")]
    IndexLoad { path: String, message: String },
}
