//! Merge of on-disk migrations with the live tracking table.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::history::{AppliedSet, TrackedMigration};
use crate::migration::{Migration, MigrationState};

/// Result of reconciling migrations against the tracking table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReconciliation {
    /// On-disk migrations in apply order, with `is_applied` filled in.
    pub migrations: Vec<Migration>,
    /// State per migration id: on-disk ones first, in apply order, then the
    /// tracked ones that are missing on disk.
    pub statuses: IndexMap<String, MigrationState>,
    /// Tracked migrations with no file on disk.
    pub applied_not_on_disk: Vec<TrackedMigration>,
    /// Tracked migrations of apps that keep no migrations in the workspace.
    #[serde(default)]
    pub external: Vec<TrackedMigration>,
    /// Why the tracking table could not be read, if it could not.
    pub error: Option<String>,
}

impl MigrationReconciliation {
    /// Every migration marked [`MigrationState::Unknown`] because the live
    /// read failed.
    pub fn unknown(migrations: Vec<Migration>, reason: impl Into<String>) -> Self {
        let statuses = migrations
            .iter()
            .map(|m| (m.id.clone(), MigrationState::Unknown))
            .collect();
        Self {
            migrations,
            statuses,
            applied_not_on_disk: Vec::new(),
            external: Vec::new(),
            error: Some(reason.into()),
        }
    }

    /// State of one migration.
    pub fn state(&self, id: &str) -> Option<MigrationState> {
        self.statuses.get(id).copied()
    }

    /// Ids in a given state, in order.
    pub fn in_state(&self, state: MigrationState) -> impl Iterator<Item = &str> {
        self.statuses
            .iter()
            .filter(move |(_, s)| **s == state)
            .map(|(id, _)| id.as_str())
    }

    /// Number of migrations in a given state.
    pub fn count(&self, state: MigrationState) -> usize {
        self.in_state(state).count()
    }
}

/// Fill in `is_applied` for each migration.
///
/// A migration is applied when the tracking table has a finished row for its
/// id. Order and every other field are preserved.
pub fn check_migration_status(migrations: &[Migration], applied: &AppliedSet) -> Vec<Migration> {
    migrations
        .iter()
        .map(|m| Migration {
            is_applied: applied.get(&m.id).is_some_and(|row| row.finished),
            ..m.clone()
        })
        .collect()
}

/// Reconcile on-disk migrations with the tracking table.
///
/// Pure and idempotent: reconciling the returned migrations again against the
/// same set yields an equal result.
pub fn reconcile(migrations: &[Migration], applied: &AppliedSet) -> MigrationReconciliation {
    let merged = check_migration_status(migrations, applied);

    let mut statuses = IndexMap::with_capacity(merged.len());
    for m in &merged {
        let state = match applied.get(&m.id) {
            Some(row) if row.finished => MigrationState::Applied,
            Some(_) => MigrationState::Failed,
            None => MigrationState::Pending,
        };
        statuses.insert(m.id.clone(), state);
    }

    let on_disk_apps: HashSet<&str> = merged
        .iter()
        .filter_map(|m| m.app_name.as_deref())
        .collect();
    let untracked_on_disk: Vec<&TrackedMigration> = applied
        .iter()
        .filter(|row| !statuses.contains_key(&row.id))
        .collect();

    let mut applied_not_on_disk = Vec::new();
    let mut external = Vec::new();
    for row in untracked_on_disk {
        match row.app.as_deref() {
            Some(app) if !on_disk_apps.contains(app) => {
                debug!(migration = %row.id, app, "migration of an app outside the workspace");
                statuses.insert(row.id.clone(), MigrationState::External);
                external.push(row.clone());
            }
            _ => {
                warn!(migration = %row.id, "tracked migration missing on disk");
                statuses.insert(row.id.clone(), MigrationState::AppliedNotOnDisk);
                applied_not_on_disk.push(row.clone());
            }
        }
    }

    MigrationReconciliation {
        migrations: merged,
        statuses,
        applied_not_on_disk,
        external,
        error: None,
    }
}
