//! CLI error types and result alias.

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// IO error
    #[error("IO error: {0}")]
    #[diagnostic(code(ormsync::io))]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    #[diagnostic(code(ormsync::config))]
    Config(String),

    /// Database error
    #[error("Database error: {0}")]
    #[diagnostic(code(ormsync::database))]
    Database(String),

    /// Schema parsing error
    #[error("Schema error: {0}")]
    #[diagnostic(code(ormsync::schema))]
    Schema(String),

    /// Migration error
    #[error("Migration error: {0}")]
    #[diagnostic(code(ormsync::migration))]
    Migration(String),

    /// Command error
    #[error("Command error: {0}")]
    #[diagnostic(code(ormsync::command))]
    Command(String),
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        CliError::Config(format!("Failed to parse TOML: {}", err))
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Command(format!("Failed to serialize JSON: {}", err))
    }
}

impl From<ormsync_schema::SchemaError> for CliError {
    fn from(err: ormsync_schema::SchemaError) -> Self {
        CliError::Schema(err.to_string())
    }
}

impl From<ormsync_migrate::MigrationError> for CliError {
    fn from(err: ormsync_migrate::MigrationError) -> Self {
        match err {
            ormsync_migrate::MigrationError::Database(msg) => CliError::Database(msg),
            other => CliError::Migration(other.to_string()),
        }
    }
}
