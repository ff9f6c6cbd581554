//! Unified error handling for plysplat
//!
//! Every failure a conversion can hit falls into one of two classes:
//! malformed input (the source point set cannot be interpreted) or an I/O
//! failure (the output sink cannot be opened or written). Both are fatal
//! for the whole conversion.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for all plysplat operations
#[derive(Error, Debug)]
pub enum Error {
    // ==================== I/O Errors ====================

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Output already exists and overwriting was not requested
    #[error("Output already exists: {0}")]
    OutputExists(PathBuf),

    // ==================== Input Errors ====================

    /// Source point set cannot be interpreted
    #[error("Malformed input: {message}")]
    MalformedInput {
        message: String,
    },

    /// Missing required per-point field
    #[error("Missing required field: {field}")]
    MissingField {
        field: String,
    },

    /// Container format or encoding we cannot read
    #[error("Unsupported format: {format}")]
    UnsupportedFormat {
        format: String,
    },

    // ==================== General Errors ====================

    /// Custom error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

/// Result type using the unified Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an error with additional context
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Error::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a malformed input error
    pub fn malformed(message: impl Into<String>) -> Self {
        Error::MalformedInput {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Error::MissingField {
            field: field.into(),
        }
    }

    /// Strip any `WithContext` layers
    pub fn root(&self) -> &Error {
        match self {
            Error::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Check if the source point set could not be interpreted
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self.root(),
            Error::MalformedInput { .. }
                | Error::MissingField { .. }
                | Error::UnsupportedFormat { .. }
        )
    }

    /// Check if the input could not be read or the output could not be written
    pub fn is_io_failure(&self) -> bool {
        matches!(
            self.root(),
            Error::Io(_) | Error::FileNotFound(_) | Error::OutputExists(_)
        )
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}
