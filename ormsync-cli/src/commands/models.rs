//! `ormsync models` command - List declared models.

use ormsync_migrate::ReconcileEngine;
use ormsync_schema::{Model, ModelField, OrmConfig, OrmKind, find_models};
use serde::Serialize;
use std::sync::Arc;

use crate::cli::{GlobalArgs, ModelsArgs};
use crate::config::Settings;
use crate::error::CliResult;
use crate::output;

/// Models declared by one ORM.
#[derive(Debug, Serialize)]
struct DeclaredModels {
    orm: OrmConfig,
    models: Vec<Model>,
}

/// Run the models command
pub async fn run(global: &GlobalArgs, args: ModelsArgs) -> CliResult<()> {
    let settings = Settings::resolve(global)?;
    let reader = Arc::new(settings.reader());
    let engine = ReconcileEngine::new(settings.reconcile.clone(), reader.clone());

    let kind = args.kind.map(OrmKind::from);
    let declared: Vec<DeclaredModels> = engine
        .detect()
        .into_iter()
        .filter(|orm| kind.is_none_or(|k| k == orm.kind))
        .map(|orm| DeclaredModels {
            models: find_models(&*reader, &orm),
            orm,
        })
        .collect();

    if global.json {
        return output::json(&declared);
    }

    output::header("Models");

    if declared.is_empty() {
        output::info("No supported ORM detected");
        return Ok(());
    }

    for entry in &declared {
        output::section(&format!(
            "{} ({} models)",
            entry.orm.display_name,
            entry.models.len()
        ));
        for model in &entry.models {
            let name = match &model.app_name {
                Some(app) => format!("{}.{}", app, model.name),
                None => model.name.to_string(),
            };
            output::list_item(&format!("{} → {}", name, model.table_name));
            if args.fields {
                for field in &model.fields {
                    output::sub_item(&describe_field(field));
                }
            }
        }
        output::newline();
    }

    Ok(())
}

fn describe_field(field: &ModelField) -> String {
    let mut text = format!(
        "{}: {} ({})",
        field.column_name().unwrap_or(field.name.as_str()),
        field.declared_type,
        field.canonical_type.as_str()
    );
    if field.is_primary_key {
        text.push_str(" pk");
    }
    if field.nullable {
        text.push_str(" null");
    }
    if let Some(target) = &field.referenced_model {
        text.push_str(&format!(" → {target}"));
    }
    if field.column.is_none() {
        text.push_str(" [no column]");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use ormsync_schema::CanonicalType;

    #[test]
    fn test_describe_field() {
        let owner = ModelField::new("owner", "ForeignKey", CanonicalType::Integer)
            .references("Customer")
            .with_column("owner_id")
            .nullable(true);
        assert_eq!(
            describe_field(&owner),
            "owner_id: ForeignKey (integer) null → Customer"
        );

        let tags = ModelField::new("tags", "ManyToManyField", CanonicalType::Unknown)
            .without_column();
        assert!(describe_field(&tags).ends_with("[no column]"));
    }
}
