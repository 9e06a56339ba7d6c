//! Migration types and per-ecosystem discovery.

use std::fmt;
use std::path::PathBuf;

use ormsync_schema::{OrmConfig, OrmKind, WorkspaceReader};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ordering::{LexicalOrdering, OrderingStrategy};

/// A migration found on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Migration {
    /// Unique id: `app.name` for Django, the directory name for Prisma.
    pub id: String,
    /// Migration name (file stem or directory name).
    pub name: String,
    /// Owning app (Django only).
    pub app_name: Option<String>,
    /// Ids of migrations this one declares as prerequisites.
    pub depends_on: Vec<String>,
    /// Key that orders migrations within their sequence.
    pub sequence_key: String,
    /// Whether the live database has applied this migration.
    pub is_applied: bool,
    /// Path of the migration file or directory.
    pub path: PathBuf,
}

impl Migration {
    /// Create an unapplied migration with no dependencies.
    pub fn new(id: impl Into<String>, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            sequence_key: name.clone(),
            name,
            app_name: None,
            depends_on: Vec::new(),
            is_applied: false,
            path: path.into(),
        }
    }

    /// Set the owning app.
    pub fn with_app(mut self, app: impl Into<String>) -> Self {
        self.app_name = Some(app.into());
        self
    }

    /// Add a prerequisite migration id.
    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.depends_on.push(id.into());
        self
    }

    /// Key used for deterministic ordering: app first, then sequence.
    pub fn sort_key(&self) -> (&str, &str) {
        (self.app_name.as_deref().unwrap_or(""), &self.sequence_key)
    }
}

/// Live state of one migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationState {
    /// On disk and recorded as applied.
    Applied,
    /// On disk, not recorded.
    Pending,
    /// Recorded as started but never finished.
    Failed,
    /// Recorded as applied, but no longer on disk.
    AppliedNotOnDisk,
    /// Recorded as applied by an app that keeps no migrations in the
    /// workspace, such as Django's `auth` or `contenttypes`.
    External,
    /// The tracking table could not be read.
    Unknown,
}

impl MigrationState {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Pending => "pending",
            Self::Failed => "failed",
            Self::AppliedNotOnDisk => "applied_not_on_disk",
            Self::External => "external",
            Self::Unknown => "unknown",
        }
    }

    /// Whether the state calls for a migration or a look at the history.
    pub fn needs_attention(&self) -> bool {
        matches!(self, Self::Pending | Self::Failed | Self::AppliedNotOnDisk)
    }
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discovers one ecosystem's migrations on disk.
pub trait MigrationParser: Send + Sync {
    /// The ecosystem handled.
    fn kind(&self) -> OrmKind;

    /// Every migration on disk, in no particular order.
    ///
    /// Unreadable files are skipped with a warning.
    fn discover(&self, reader: &dyn WorkspaceReader, config: &OrmConfig) -> Vec<Migration>;

    /// The strategy that puts discovered migrations in apply order.
    fn ordering(&self) -> Box<dyn OrderingStrategy>;
}

/// The migration parser for an ecosystem.
pub fn parsers_for(kind: OrmKind) -> Box<dyn MigrationParser> {
    match kind {
        OrmKind::Django => Box::new(crate::django::DjangoMigrations),
        OrmKind::Prisma => Box::new(crate::prisma::PrismaMigrations),
    }
}

/// Find all migrations of the detected ORM, in apply order.
pub fn find_migrations(reader: &dyn WorkspaceReader, config: &OrmConfig) -> Vec<Migration> {
    let parser = parsers_for(config.kind);
    let discovered = parser.discover(reader, config);
    debug!(kind = %config.kind, count = discovered.len(), "discovered migrations");

    let strategy = parser.ordering();
    match strategy.order(discovered.clone()) {
        Ok(ordered) => ordered,
        Err(e) => {
            warn!(
                kind = %config.kind,
                strategy = strategy.name(),
                error = %e,
                "ordering failed, falling back to lexical order"
            );
            LexicalOrdering.order(discovered).unwrap_or_default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_migration() {
        let m = Migration::new("shop.0001_initial", "0001_initial", "shop/migrations/0001_initial.py")
            .with_app("shop")
            .depends_on("auth.0001_initial");

        assert_eq!(m.sequence_key, "0001_initial");
        assert_eq!(m.sort_key(), ("shop", "0001_initial"));
        assert!(!m.is_applied);
        assert_eq!(m.depends_on, vec!["auth.0001_initial"]);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(MigrationState::AppliedNotOnDisk.to_string(), "applied_not_on_disk");
        assert!(MigrationState::Pending.needs_attention());
        assert!(!MigrationState::Applied.needs_attention());
        assert!(MigrationState::AppliedNotOnDisk.needs_attention());
        assert!(!MigrationState::External.needs_attention());
        assert!(!MigrationState::Unknown.needs_attention());
    }

    #[test]
    fn test_parsers_for() {
        assert_eq!(parsers_for(OrmKind::Django).kind(), OrmKind::Django);
        assert_eq!(parsers_for(OrmKind::Prisma).kind(), OrmKind::Prisma);
        assert_eq!(parsers_for(OrmKind::Prisma).ordering().name(), "lexical");
        assert_eq!(parsers_for(OrmKind::Django).ordering().name(), "topological");
    }
}
