//! Django migration discovery.
//!
//! Migrations live at `<app>/migrations/<name>.py`. Their prerequisites come
//! from the module-level `dependencies = [...]` list of the `Migration`
//! class.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ormsync_schema::parser::python;
use ormsync_schema::{OrmConfig, OrmKind, WorkspaceReader};
use tracing::{debug, warn};

use crate::error::{MigrateResult, MigrationError};
use crate::migration::{Migration, MigrationParser};
use crate::ordering::{OrderingStrategy, TopologicalOrdering};

/// Migration parser for Django projects.
#[derive(Debug, Clone, Copy, Default)]
pub struct DjangoMigrations;

/// A dependency as written in the migration file.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RawDependency {
    Node { app: String, name: String },
    External,
}

impl MigrationParser for DjangoMigrations {
    fn kind(&self) -> OrmKind {
        OrmKind::Django
    }

    fn discover(&self, reader: &dyn WorkspaceReader, config: &OrmConfig) -> Vec<Migration> {
        let root = config
            .project_root
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));

        let files = match reader.list_files(&root, "*.py") {
            Ok(files) => files,
            Err(e) => {
                debug!(root = %root.display(), error = %e, "cannot list Django migrations");
                return Vec::new();
            }
        };

        // app -> name -> (path, declared dependencies)
        let mut apps: BTreeMap<String, BTreeMap<String, (PathBuf, Vec<RawDependency>)>> =
            BTreeMap::new();

        for path in files {
            let Some((app, name)) = migration_file(&path) else {
                continue;
            };

            let dependencies = match reader.read_file(&path) {
                Ok(source) => match parse_dependencies(&source) {
                    Ok(deps) => deps,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "ignoring dependencies of migration");
                        Vec::new()
                    }
                },
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable migration");
                    continue;
                }
            };

            apps.entry(app).or_default().insert(name, (path, dependencies));
        }

        let mut migrations = Vec::new();
        for (app, names) in &apps {
            for (name, (path, dependencies)) in names {
                let mut migration = Migration::new(format!("{app}.{name}"), name.as_str(), path)
                    .with_app(app.as_str());
                for dep in dependencies {
                    if let Some(id) = resolve_dependency(dep, &apps) {
                        migration = migration.depends_on(id);
                    }
                }
                migrations.push(migration);
            }
        }

        migrations
    }

    fn ordering(&self) -> Box<dyn OrderingStrategy> {
        Box::new(TopologicalOrdering::default())
    }
}

/// `(app, name)` when `path` is `<app>/migrations/<name>.py`.
fn migration_file(path: &Path) -> Option<(String, String)> {
    let stem = path.file_stem()?.to_str()?;
    if path.extension()?.to_str()? != "py" || stem.starts_with('_') {
        return None;
    }

    let migrations_dir = path.parent()?;
    if migrations_dir.file_name()?.to_str()? != "migrations" {
        return None;
    }
    let app = migrations_dir.parent()?.file_name()?.to_str()?;
    Some((app.to_string(), stem.to_string()))
}

/// Resolve a declared dependency to a migration id.
///
/// `__first__` and `__latest__` resolve against the app's migrations on disk;
/// dependencies on apps that are not on disk are dropped.
fn resolve_dependency<V>(
    dep: &RawDependency,
    apps: &BTreeMap<String, BTreeMap<String, V>>,
) -> Option<String> {
    let RawDependency::Node { app, name } = dep else {
        return None;
    };
    let names = apps.get(app)?;
    let name = match name.as_str() {
        "__first__" => names.keys().next()?.as_str(),
        "__latest__" => names.keys().next_back()?.as_str(),
        other => other,
    };
    Some(format!("{app}.{name}"))
}

/// Read the `dependencies` list. A migration without one has none.
fn parse_dependencies(source: &str) -> MigrateResult<Vec<RawDependency>> {
    let lines = python::logical_lines(source).map_err(|line| {
        MigrationError::invalid_migration(format!("unterminated bracket or string at line {line}"))
    })?;

    let Some(list) = lines.iter().find_map(|line| {
        let eq = python::find_assignment(&line.text)?;
        (line.text[..eq].trim() == "dependencies").then(|| line.text[eq + 1..].trim())
    }) else {
        return Ok(Vec::new());
    };

    let inner = list
        .strip_prefix('[')
        .and_then(|l| l.strip_suffix(']'))
        .or_else(|| list.strip_prefix('(').and_then(|l| l.strip_suffix(')')))
        .ok_or_else(|| {
            MigrationError::invalid_migration(format!("dependencies is not a literal list: {list}"))
        })?;

    Ok(python::split_top_level(inner, ',')
        .into_iter()
        .map(parse_dependency)
        .collect())
}

fn parse_dependency(item: &str) -> RawDependency {
    let Some(tuple) = item.strip_prefix('(').and_then(|t| t.strip_suffix(')')) else {
        // migrations.swappable_dependency(...) and anything else dynamic
        return RawDependency::External;
    };

    match python::split_top_level(tuple, ',').as_slice() {
        [app, name] => match (python::unquote(app), python::unquote(name)) {
            (Some(app), Some(name)) => RawDependency::Node {
                app: app.to_string(),
                name: name.to_string(),
            },
            _ => RawDependency::External,
        },
        _ => RawDependency::External,
    }
}
