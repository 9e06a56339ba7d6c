//! Error types for workspace reading and model parsing.

// These warnings are false positives - the fields are used by derive macros
#![allow(unused_assignments)]

use std::path::Path;

use miette::Diagnostic;
use thiserror::Error;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur while reading a workspace or parsing declarations.
#[derive(Error, Debug, Diagnostic)]
pub enum SchemaError {
    /// The requested file or directory does not exist.
    #[error("not found: {path}")]
    #[diagnostic(code(ormsync::schema::not_found))]
    NotFound { path: String },

    /// Error reading a file that exists.
    #[error("failed to read file: {path}")]
    #[diagnostic(code(ormsync::schema::io_error))]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Syntax error in a declaration file.
    #[error("syntax error in {file}: {message}")]
    #[diagnostic(code(ormsync::schema::syntax_error))]
    SyntaxError {
        file: String,
        #[source_code]
        src: String,
        #[label("error here")]
        span: miette::SourceSpan,
        message: String,
    },

    /// A model declaration that cannot be turned into a canonical model.
    #[error("invalid model `{name}`: {message}")]
    #[diagnostic(code(ormsync::schema::invalid_model))]
    InvalidModel { name: String, message: String },
}

impl SchemaError {
    /// Create a not-found error for a path.
    pub fn not_found(path: impl AsRef<Path>) -> Self {
        Self::NotFound {
            path: path.as_ref().display().to_string(),
        }
    }

    /// Create an I/O error for a path.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Create a syntax error with source location.
    pub fn syntax(
        file: impl Into<String>,
        src: impl Into<String>,
        offset: usize,
        len: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::SyntaxError {
            file: file.into(),
            src: src.into(),
            span: (offset, len).into(),
            message: message.into(),
        }
    }

    /// Create an invalid model error.
    pub fn invalid_model(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidModel {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Whether this error means "absent" rather than "broken".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
