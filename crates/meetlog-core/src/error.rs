//! Error types for meetlog.

use std::fmt;

use thiserror::Error;

/// Result type alias using meetlog's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Field-level validation failures, collected across the whole payload.
///
/// Validation never stops at the first failure; every message names the
/// offending field so the caller can report all problems at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    messages: Vec<String>,
}

impl ValidationErrors {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a field-level failure.
    pub fn push(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// True when no failure has been recorded.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The individual field-level messages, in the order they were recorded.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.messages.join(", "))
    }
}

/// Core error type for meetlog operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Note not found
    #[error("Note not found: {0}")]
    NoteNotFound(i64),

    /// One or more note fields failed validation
    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Error::Validation(errors)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
