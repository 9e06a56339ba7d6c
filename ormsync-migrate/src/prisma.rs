//! Prisma migration discovery.

use std::path::{Path, PathBuf};

use ormsync_schema::{OrmConfig, OrmKind, WorkspaceReader};
use tracing::debug;

use crate::migration::{Migration, MigrationParser};
use crate::ordering::{LexicalOrdering, OrderingStrategy};

/// File that marks a directory as a migration.
pub const MIGRATION_FILE: &str = "migration.sql";

/// Migration parser for Prisma projects.
///
/// Every direct subdirectory of `migrations/` (next to the schema) that
/// holds a `migration.sql` is one migration, named after the directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrismaMigrations;

impl PrismaMigrations {
    /// The migrations directory for a project.
    pub fn migrations_dir(config: &OrmConfig) -> PathBuf {
        match (&config.config_path, &config.project_root) {
            (Some(schema), _) => schema
                .parent()
                .unwrap_or(Path::new("."))
                .join("migrations"),
            (None, Some(root)) => root.join("prisma").join("migrations"),
            (None, None) => PathBuf::from("prisma/migrations"),
        }
    }
}

impl MigrationParser for PrismaMigrations {
    fn kind(&self) -> OrmKind {
        OrmKind::Prisma
    }

    fn discover(&self, reader: &dyn WorkspaceReader, config: &OrmConfig) -> Vec<Migration> {
        let dir = Self::migrations_dir(config);

        let files = match reader.list_files(&dir, MIGRATION_FILE) {
            Ok(files) => files,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "no Prisma migrations directory");
                return Vec::new();
            }
        };

        files
            .iter()
            .filter_map(|file| {
                let migration_dir = file.parent()?;
                if migration_dir.parent()? != dir.as_path() {
                    return None;
                }
                let name = migration_dir.file_name()?.to_str()?;
                Some(Migration::new(name, name, migration_dir))
            })
            .collect()
    }

    fn ordering(&self) -> Box<dyn OrderingStrategy> {
        Box::new(LexicalOrdering)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::find_migrations;
    use ormsync_schema::FsWorkspace;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> (TempDir, OrmConfig) {
        let dir = TempDir::new().unwrap();
        let prisma = dir.path().join("prisma");
        let migrations = prisma.join("migrations");

        for name in ["20240101_init", "20231215_seed"] {
            fs::create_dir_all(migrations.join(name)).unwrap();
            fs::write(migrations.join(name).join(MIGRATION_FILE), "-- sql").unwrap();
        }
        // not migrations
        fs::create_dir_all(migrations.join("drafts")).unwrap();
        fs::create_dir_all(migrations.join("20240202_nested/inner")).unwrap();
        fs::write(migrations.join("20240202_nested/inner").join(MIGRATION_FILE), "").unwrap();
        fs::write(migrations.join("migration_lock.toml"), "provider = \"postgresql\"").unwrap();
        fs::write(prisma.join("schema.prisma"), "").unwrap();

        let config = OrmConfig::new(OrmKind::Prisma)
            .with_project_root(dir.path())
            .with_config_path(prisma.join("schema.prisma"));
        (dir, config)
    }

    #[test]
    fn test_migrations_dir() {
        let config = OrmConfig::new(OrmKind::Prisma).with_config_path("/app/db/schema.prisma");
        assert_eq!(
            PrismaMigrations::migrations_dir(&config),
            PathBuf::from("/app/db/migrations")
        );

        let config = OrmConfig::new(OrmKind::Prisma).with_project_root("/app");
        assert_eq!(
            PrismaMigrations::migrations_dir(&config),
            PathBuf::from("/app/prisma/migrations")
        );
    }

    #[test]
    fn test_lexical_order_by_directory_name() {
        let (_dir, config) = project();
        let ordered = find_migrations(&FsWorkspace::new(), &config);

        let ids: Vec<_> = ordered.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["20231215_seed", "20240101_init"]);
        assert!(ordered.iter().all(|m| m.app_name.is_none() && m.depends_on.is_empty()));
        assert_eq!(ordered[0].sequence_key, "20231215_seed");
    }

    #[test]
    fn test_missing_directory_yields_nothing() {
        let dir = TempDir::new().unwrap();
        let config = OrmConfig::new(OrmKind::Prisma)
            .with_config_path(dir.path().join("prisma/schema.prisma"));
        assert!(PrismaMigrations.discover(&FsWorkspace::new(), &config).is_empty());
    }
}
