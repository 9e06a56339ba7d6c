//! Schema drift between declared models and live tables.
//!
//! Types are compared by canonical family only. A side whose type is
//! [`ormsync_schema::CanonicalType::Unknown`] never produces a type change, so an unmapped
//! driver type cannot cause a false positive.

use std::collections::HashMap;
use std::fmt;

use ormsync_schema::{Model, ModelField};
use serde::{Deserialize, Serialize};

use crate::introspect::LiveColumn;

/// One column whose declaration disagrees with the live table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnChange {
    /// Column name.
    pub name: String,
    /// Declared type, raw.
    pub declared_type: String,
    /// Live type, raw.
    pub live_type: String,
    /// Declared nullability.
    pub declared_nullable: bool,
    /// Live nullability.
    pub live_nullable: bool,
}

/// Differences between one model and its table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftResult {
    /// Whether the model needs a migration.
    pub has_changes: bool,
    /// Declared fields with no live column.
    pub missing_columns: Vec<ModelField>,
    /// Live columns no field declares, in ordinal order. Informational only.
    pub extra_columns: Vec<String>,
    /// Columns whose type or nullability differs.
    pub changed_columns: Vec<ColumnChange>,
}

/// Reconciliation status of one model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    /// Table matches the declaration.
    Synced,
    /// Table exists but differs.
    Changed,
    /// Table does not exist.
    Missing,
    /// The live read failed.
    Unknown,
}

impl ModelStatus {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::Changed => "changed",
            Self::Missing => "missing",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compare a model against the live columns of its table.
pub fn detect_drift(model: &Model, live_columns: &[LiveColumn]) -> DriftResult {
    let live: HashMap<&str, &LiveColumn> = live_columns
        .iter()
        .map(|c| (c.name.as_str(), c))
        .collect();

    let mut result = DriftResult::default();
    let mut matched: Vec<&str> = Vec::new();

    for field in model.column_fields() {
        let Some(column) = field.column_name() else {
            continue;
        };

        let Some(live_column) = live.get(column) else {
            result.missing_columns.push(field.clone());
            continue;
        };
        matched.push(column);

        let live_type = live_column.canonical_type();
        let type_changed = field.canonical_type.is_known()
            && live_type.is_known()
            && field.canonical_type != live_type;
        let nullable_changed = field.nullable != live_column.is_nullable;

        if type_changed || nullable_changed {
            result.changed_columns.push(ColumnChange {
                name: column.to_string(),
                declared_type: field.declared_type.clone(),
                live_type: live_column.data_type.clone(),
                declared_nullable: field.nullable,
                live_nullable: live_column.is_nullable,
            });
        }
    }

    let mut extra: Vec<&LiveColumn> = live_columns
        .iter()
        .filter(|c| !matched.contains(&c.name.as_str()))
        .collect();
    extra.sort_by_key(|c| c.ordinal_position);
    result.extra_columns = extra.into_iter().map(|c| c.name.clone()).collect();

    result.has_changes = !result.missing_columns.is_empty() || !result.changed_columns.is_empty();
    result
}

/// Status of a model given whether its table exists and, if so, its drift.
pub fn model_status(table_exists: bool, drift: Option<&DriftResult>) -> ModelStatus {
    match (table_exists, drift) {
        (false, _) => ModelStatus::Missing,
        (true, Some(d)) if d.has_changes => ModelStatus::Changed,
        (true, Some(_)) => ModelStatus::Synced,
        (true, None) => ModelStatus::Unknown,
    }
}
