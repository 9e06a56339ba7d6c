//! Error types for migration and drift reconciliation.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for reconciliation operations.
pub type MigrateResult<T> = Result<T, MigrationError>;

/// Errors that can occur while reading migrations or the live database.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Reading or parsing workspace files failed.
    #[error("Schema error: {0}")]
    Schema(#[from] ormsync_schema::SchemaError),

    /// Database query error.
    #[error("Database error: {0}")]
    Database(String),

    /// A live read did not finish in time.
    #[error("Query timed out after {}ms: {what}", .after.as_millis())]
    Timeout {
        /// What was being read.
        what: String,
        /// The timeout that elapsed.
        after: Duration,
    },

    /// Invalid migration file or format.
    #[error("Invalid migration: {0}")]
    InvalidMigration(String),

    /// Migrations that depend on each other in a loop.
    #[error("Dependency cycle between migrations: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),
}

impl MigrationError {
    /// Create a database error.
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a timeout error.
    pub fn timeout(what: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            after,
        }
    }

    /// Create an invalid migration error.
    pub fn invalid_migration(msg: impl Into<String>) -> Self {
        Self::InvalidMigration(msg.into())
    }

    /// Whether the error came from the live database rather than the workspace.
    pub fn is_live_read(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MigrationError::invalid_migration("0001_initial.py");
        assert!(err.to_string().contains("0001_initial.py"));
    }

    #[test]
    fn test_timeout_display() {
        let err = MigrationError::timeout("columns of shop_order", Duration::from_secs(2));
        let msg = err.to_string();
        assert!(msg.contains("2000ms"));
        assert!(msg.contains("shop_order"));
    }

    #[test]
    fn test_cycle_display() {
        let err = MigrationError::DependencyCycle(vec!["a.0001".into(), "b.0001".into()]);
        assert!(err.to_string().contains("a.0001, b.0001"));
    }

    #[test]
    fn test_is_live_read() {
        assert!(MigrationError::database("connection refused").is_live_read());
        assert!(MigrationError::timeout("x", Duration::from_millis(1)).is_live_read());
        assert!(!MigrationError::invalid_migration("x").is_live_read());
    }

    #[test]
    fn test_from_schema_error() {
        let err: MigrationError = ormsync_schema::SchemaError::not_found("/srv/app").into();
        assert!(matches!(err, MigrationError::Schema(_)));
    }
}
