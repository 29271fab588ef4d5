//! Error types for parkmark.
//!
//! This module defines all error types used throughout the parkmark crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for parkmark operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// No record exists with the given id.
    #[error("no record with id {id}")]
    RecordNotFound {
        /// The id that was looked up.
        id: i64,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Remote Errors ===
    /// An HTTP request failed at the transport level.
    #[error("http request failed: {0}")]
    Http(Box<ureq::Error>),

    /// A remote endpoint answered with an unexpected status.
    #[error("unexpected response from {endpoint}: status {status}")]
    RemoteStatus {
        /// Which endpoint was called.
        endpoint: &'static str,
        /// The HTTP status received.
        status: u16,
    },

    /// A remote response could not be interpreted.
    #[error("could not process results from {endpoint}: {message}")]
    RemoteFormat {
        /// Which endpoint was called.
        endpoint: &'static str,
        /// Description of the parse failure.
        message: String,
    },

    /// A required API key is not configured.
    #[error("missing API key for {endpoint}; set it in the configuration file")]
    MissingApiKey {
        /// Which endpoint needs the key.
        endpoint: &'static str,
    },

    // === Alarm Errors ===
    /// The requested reminder time is invalid or already past.
    #[error("invalid reminder time: {message}")]
    InvalidReminder {
        /// Description of the problem.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for parkmark operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        Self::Http(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a malformed-response error for the given endpoint.
    #[must_use]
    pub fn remote_format(endpoint: &'static str, message: impl Into<String>) -> Self {
        Self::RemoteFormat {
            endpoint,
            message: message.into(),
        }
    }

    /// Create an invalid-reminder error.
    #[must_use]
    pub fn invalid_reminder(message: impl Into<String>) -> Self {
        Self::InvalidReminder {
            message: message.into(),
        }
    }

    /// Check if this error is a remote (HTTP/format/status) failure.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::RemoteStatus { .. } | Self::RemoteFormat { .. }
        )
    }
}
