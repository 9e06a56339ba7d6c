//! Migration history recorded in the live database.
//!
//! Django records applied migrations in `django_migrations` (one row per
//! `app`/`name`). Prisma records them in `_prisma_migrations`, where a row
//! without `finished_at` is a migration that started and failed, and a row
//! with `rolled_back_at` has been rolled back and no longer counts.

use indexmap::IndexMap;
use ormsync_schema::OrmKind;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::MigrateResult;
use crate::introspect::{SqlChannel, quote_ident, table_exists};

/// One row of the tracking table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedMigration {
    /// Migration id, matching [`crate::Migration::id`].
    pub id: String,
    /// Owning app, for ecosystems that track one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    /// When the migration was applied, as reported by the database.
    pub applied_at: Option<String>,
    /// Whether the migration finished.
    pub finished: bool,
}

impl TrackedMigration {
    /// A finished migration.
    pub fn applied(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            app: None,
            applied_at: None,
            finished: true,
        }
    }

    /// A migration that started but never finished.
    pub fn unfinished(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            app: None,
            applied_at: None,
            finished: false,
        }
    }

    /// Set the owning app.
    pub fn with_app(mut self, app: impl Into<String>) -> Self {
        self.app = Some(app.into());
        self
    }
}

/// Every migration the tracking table knows about, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedSet {
    entries: IndexMap<String, TrackedMigration>,
}

impl AppliedSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row. A finished row wins over an unfinished one for the same id.
    pub fn insert(&mut self, row: TrackedMigration) {
        match self.entries.get_mut(&row.id) {
            Some(existing) => {
                if row.finished && !existing.finished {
                    *existing = row;
                }
            }
            None => {
                self.entries.insert(row.id.clone(), row);
            }
        }
    }

    /// Look up a row.
    pub fn get(&self, id: &str) -> Option<&TrackedMigration> {
        self.entries.get(id)
    }

    /// Whether the id is tracked at all.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Tracked ids, in table order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// All rows, in table order.
    pub fn iter(&self) -> impl Iterator<Item = &TrackedMigration> {
        self.entries.values()
    }

    /// Number of tracked migrations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<TrackedMigration> for AppliedSet {
    fn from_iter<T: IntoIterator<Item = TrackedMigration>>(iter: T) -> Self {
        let mut set = Self::new();
        for row in iter {
            set.insert(row);
        }
        set
    }
}

/// Query that reads a tracking table.
pub fn tracking_query(kind: OrmKind, schema: &str, table: &str) -> String {
    let table = format!("{}.{}", quote_ident(schema), quote_ident(table));
    match kind {
        OrmKind::Django => format!(
            "SELECT app::text AS app, name::text AS name, applied::text AS applied \
             FROM {table} ORDER BY id"
        ),
        OrmKind::Prisma => format!(
            "SELECT migration_name::text AS migration_name, \
             finished_at::text AS finished_at, \
             rolled_back_at::text AS rolled_back_at \
             FROM {table} ORDER BY started_at"
        ),
    }
}

/// Read the applied migrations of one ecosystem.
///
/// A missing tracking table means nothing has been applied yet.
pub async fn get_applied_migrations(
    channel: &dyn SqlChannel,
    kind: OrmKind,
    schema: &str,
    table: &str,
) -> MigrateResult<AppliedSet> {
    if !table_exists(channel, schema, table).await? {
        debug!(table, "tracking table does not exist");
        return Ok(AppliedSet::new());
    }

    let result = channel.query(&tracking_query(kind, schema, table), &[]).await?;

    let mut applied = AppliedSet::new();
    for row in 0..result.len() {
        match kind {
            OrmKind::Django => {
                let (Some(app), Some(name)) = (result.get(row, "app"), result.get(row, "name"))
                else {
                    continue;
                };
                applied.insert(TrackedMigration {
                    id: format!("{app}.{name}"),
                    app: Some(app.to_string()),
                    applied_at: result.get(row, "applied").map(str::to_string),
                    finished: true,
                });
            }
            OrmKind::Prisma => {
                let Some(name) = result.get(row, "migration_name") else {
                    continue;
                };
                if result.get(row, "rolled_back_at").is_some() {
                    continue;
                }
                let finished_at = result.get(row, "finished_at");
                applied.insert(TrackedMigration {
                    id: name.to_string(),
                    app: None,
                    applied_at: finished_at.map(str::to_string),
                    finished: finished_at.is_some(),
                });
            }
        }
    }

    debug!(table, count = applied.len(), "read tracking table");
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::QueryResult;
    use crate::introspect::testing::FakeChannel;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_finished_row_wins() {
        let set: AppliedSet = [
            TrackedMigration::unfinished("20240101_init"),
            TrackedMigration::applied("20240101_init"),
            TrackedMigration::unfinished("20240101_init"),
        ]
        .into_iter()
        .collect();

        assert_eq!(set.len(), 1);
        assert!(set.get("20240101_init").unwrap().finished);
    }

    #[test]
    fn test_tracking_query() {
        let sql = tracking_query(OrmKind::Django, "public", "django_migrations");
        assert!(sql.contains("FROM \"public\".\"django_migrations\""));
        assert!(tracking_query(OrmKind::Prisma, "public", "_prisma_migrations")
            .contains("rolled_back_at"));
    }

    #[tokio::test]
    async fn test_missing_tracking_table_is_empty() {
        let channel = FakeChannel::default();
        let applied = get_applied_migrations(&channel, OrmKind::Django, "public", "django_migrations")
            .await
            .unwrap();
        assert!(applied.is_empty());
    }

    #[tokio::test]
    async fn test_django_rows() {
        let channel = FakeChannel::default()
            .with_table("django_migrations", vec![])
            .with_raw(
                "ORDER BY id",
                QueryResult::new(["app", "name", "applied"])
                    .with_row([Some("shop"), Some("0001_initial"), Some("2024-01-01 10:00:00+00")])
                    .with_row([Some("auth"), Some("0001_initial"), None]),
            );

        let applied = get_applied_migrations(&channel, OrmKind::Django, "public", "django_migrations")
            .await
            .unwrap();
        let ids: Vec<_> = applied.ids().collect();
        assert_eq!(ids, vec!["shop.0001_initial", "auth.0001_initial"]);
        assert_eq!(
            applied.get("shop.0001_initial").unwrap().applied_at.as_deref(),
            Some("2024-01-01 10:00:00+00")
        );
        assert_eq!(applied.get("auth.0001_initial").unwrap().app.as_deref(), Some("auth"));
    }

    #[tokio::test]
    async fn test_prisma_rows() {
        let channel = FakeChannel::default()
            .with_table("_prisma_migrations", vec![])
            .with_raw(
                "ORDER BY started_at",
                QueryResult::new(["migration_name", "finished_at", "rolled_back_at"])
                    .with_row([Some("20231215_seed"), Some("2023-12-15"), None])
                    .with_row([Some("20240101_init"), None, None])
                    .with_row([Some("20240202_bad"), None, Some("2024-02-02")]),
            );

        let applied = get_applied_migrations(&channel, OrmKind::Prisma, "public", "_prisma_migrations")
            .await
            .unwrap();
        assert_eq!(applied.len(), 2);
        assert!(applied.get("20231215_seed").unwrap().finished);
        assert!(!applied.get("20240101_init").unwrap().finished);
        assert!(!applied.contains("20240202_bad"));
    }
}
