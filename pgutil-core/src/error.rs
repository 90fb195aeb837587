//! Error types with credential sanitization.
//!
//! Every error in this module is safe to print: passwords and full connection
//! strings are never part of an error message. Callers decide whether an error
//! terminates the process; nothing in this crate exits on its own.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for pgutil operations.
///
/// # Security
/// Messages never include the resolved password. Connection failures carry
/// only a redacted description of the target.
#[derive(Debug, Error)]
pub enum PgUtilError {
    /// No database name was resolved from any source
    #[error("No database name given: pass one explicitly or set the database environment variable")]
    MissingDatabase,

    /// A password is required but interactive prompting is not allowed
    #[error("Password prompting disallowed: {reason}")]
    PromptDisallowed { reason: String },

    /// The credential file exists but could not be inspected or read
    #[error("Credential file {} could not be read", path.display())]
    CredentialFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading a password from the terminal failed
    #[error("Failed to read password from terminal")]
    Prompt {
        #[source]
        source: std::io::Error,
    },

    /// Database connection failed (credentials sanitized)
    #[error("Database connection failed: {context}")]
    Connection {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Executing a query, or describing its result columns, failed
    #[error("Query execution failed: {context}")]
    QueryExecution {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Materializing a fetched row failed
    #[error("Row materialization failed: {context}")]
    RowScan {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration or validation error
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

/// Convenience type alias for Results with `PgUtilError`
pub type Result<T> = std::result::Result<T, PgUtilError>;

/// Context attached to query execution failures.
pub const RUNNING_QUERY: &str = "running query";

/// Context attached to row materialization failures.
pub const SCANNING_ROW: &str = "scanning a row";

impl PgUtilError {
    /// Creates a prompt-disallowed error
    pub fn prompt_disallowed(reason: impl Into<String>) -> Self {
        Self::PromptDisallowed {
            reason: reason.into(),
        }
    }

    /// Creates a credential file error for `path`
    pub fn credential_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CredentialFile {
            path: path.into(),
            source,
        }
    }

    /// Creates a connection error with sanitized context
    pub fn connection_failed<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Connection {
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates a query execution error with the standard context
    pub fn query_failed<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::QueryExecution {
            context: RUNNING_QUERY.to_string(),
            source: error.into(),
        }
    }

    /// Creates a row scan error with the standard context
    pub fn row_scan<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::RowScan {
            context: SCANNING_ROW.to_string(),
            source: error.into(),
        }
    }

    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether this error stems from how the tool was configured rather than
    /// from the database or the environment.
    ///
    /// The CLI maps these to the usage exit code.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingDatabase | Self::PromptDisallowed { .. } | Self::Configuration { .. }
        )
    }
}
