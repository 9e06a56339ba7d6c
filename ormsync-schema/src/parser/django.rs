//! Django model parser.
//!
//! Models live in `<app>/models.py` or in a `<app>/models/` package. Each
//! `class X(...Model):` block becomes one [`Model`]; field declarations are
//! read from `name = models.XxxField(...)` calls at class-body level.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex_lite::Regex;
use smol_str::SmolStr;
use tracing::{debug, warn};

use super::python::{self, LogicalLine};
use crate::error::{SchemaError, SchemaResult};
use crate::model::{App, CanonicalType, Model, ModelField, OrmConfig};
use crate::typemap;
use crate::workspace::WorkspaceReader;

static CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^class\s+(\w+)\s*(?:\(([^)]*)\))?\s*:").unwrap());

static ASSIGN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+)\s*=\s*(.+)$").unwrap());

/// Find all Django apps that declare models, with their models.
///
/// Files that cannot be read or parsed are skipped with a warning.
pub fn find_apps(reader: &dyn WorkspaceReader, config: &OrmConfig) -> Vec<App> {
    let root = config
        .project_root
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));

    let files = match reader.list_files(&root, "*.py") {
        Ok(files) => files,
        Err(e) => {
            debug!(root = %root.display(), error = %e, "cannot list Django sources");
            return Vec::new();
        }
    };

    let mut apps: IndexMap<SmolStr, Vec<Model>> = IndexMap::new();
    for path in files {
        let Some(app) = app_for_models_file(&path) else {
            continue;
        };

        let source = match reader.read_file(&path) {
            Ok(source) => source,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable models file");
                continue;
            }
        };

        match parse_models_source(&app, &source) {
            Ok(models) => apps.entry(SmolStr::new(&app)).or_default().extend(models),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unparsable models file"),
        }
    }

    let mut apps: Vec<App> = apps
        .into_iter()
        .map(|(name, models)| App { name, models })
        .collect();
    finalize(&mut apps);
    apps
}

/// Find all Django models in the project, flattened across apps.
pub fn find_models(reader: &dyn WorkspaceReader, config: &OrmConfig) -> Vec<Model> {
    find_apps(reader, config)
        .into_iter()
        .flat_map(|app| app.models)
        .collect()
}

/// App label for a models module, or `None` if the file is not one.
fn app_for_models_file(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let parent = path.parent()?;
    let parent_name = parent.file_name()?.to_str()?;

    if file_name == "models.py" {
        return Some(parent_name.to_string());
    }
    if parent_name == "models" && file_name.ends_with(".py") {
        return Some(parent.parent()?.file_name()?.to_str()?.to_string());
    }
    None
}

/// Cross-file fixups: foreign keys take the type of the primary key they
/// point at, and duplicate table names keep their first declaration.
fn finalize(apps: &mut [App]) {
    let pk_types: HashMap<SmolStr, CanonicalType> = apps
        .iter()
        .flat_map(|app| &app.models)
        .filter_map(|m| {
            m.primary_key_fields()
                .first()
                .map(|pk| (m.name.clone(), pk.canonical_type))
        })
        .collect();

    let mut seen_tables = HashMap::new();
    for app in apps.iter_mut() {
        app.models.retain(|model| {
            if let Some(first) = seen_tables.get(&model.table_name) {
                warn!(
                    table = %model.table_name,
                    model = %model.name,
                    first = %first,
                    "duplicate table name, keeping first declaration"
                );
                return false;
            }
            seen_tables.insert(model.table_name.clone(), model.name.clone());
            true
        });

        for field in app.models.iter_mut().flat_map(|m| m.fields.iter_mut()) {
            if !field.is_foreign_key {
                continue;
            }
            if let Some(pk) = field.referenced_model.as_ref().and_then(|r| pk_types.get(r)) {
                field.canonical_type = *pk;
            }
        }
    }
}

/// A class block while it is being read.
struct ClassDecl {
    name: String,
    body_indent: Option<usize>,
    in_meta: bool,
    fields: Vec<ModelField>,
    db_table: Option<String>,
    is_abstract: bool,
    is_proxy: bool,
}

/// Parse one models module belonging to `app`.
pub fn parse_models_source(app: &str, source: &str) -> SchemaResult<Vec<Model>> {
    let lines = python::logical_lines(source).map_err(|line| {
        SchemaError::syntax(
            format!("{app}/models.py"),
            source,
            python::line_offset(source, line),
            1,
            "unterminated bracket or string",
        )
    })?;

    let mut models = Vec::new();
    let mut abstract_fields: HashMap<String, Vec<ModelField>> = HashMap::new();
    let mut model_classes: Vec<String> = Vec::new();
    let mut current: Option<ClassDecl> = None;

    for line in &lines {
        if line.indent == 0 {
            if let Some(decl) = current.take() {
                close_class(app, decl, &mut models, &mut abstract_fields)?;
            }

            if let Some(caps) = CLASS_RE.captures(&line.text) {
                let name = caps[1].to_string();
                let bases = caps.get(2).map(|m| m.as_str()).unwrap_or("");
                if let Some(inherited) =
                    model_bases(bases, &model_classes, &abstract_fields, &models)
                {
                    model_classes.push(name.clone());
                    current = Some(ClassDecl {
                        name,
                        body_indent: None,
                        in_meta: false,
                        fields: inherited,
                        db_table: None,
                        is_abstract: false,
                        is_proxy: false,
                    });
                }
            }
            continue;
        }

        if let Some(decl) = current.as_mut() {
            read_class_line(decl, line);
        }
    }

    if let Some(decl) = current.take() {
        close_class(app, decl, &mut models, &mut abstract_fields)?;
    }

    Ok(models)
}

/// If `bases` makes a class a Django model, the fields it inherits.
///
/// Abstract bases contribute their fields. A concrete base keeps its fields
/// in its own table and contributes a `<base>_ptr` one-to-one link instead;
/// the first such link is the primary key.
fn model_bases(
    bases: &str,
    model_classes: &[String],
    abstract_fields: &HashMap<String, Vec<ModelField>>,
    concrete: &[Model],
) -> Option<Vec<ModelField>> {
    let mut is_model = false;
    let mut inherited: Vec<ModelField> = Vec::new();

    for base in python::split_top_level(bases, ',') {
        if base.contains('=') {
            continue;
        }
        let simple = base.rsplit('.').next().unwrap_or(base);
        if let Some(fields) = abstract_fields.get(simple) {
            inherited.extend(fields.iter().cloned());
            is_model = true;
        } else if concrete.iter().any(|m| m.name == simple) {
            inherited.push(parent_link(simple, !inherited.iter().any(|f| f.is_primary_key)));
            is_model = true;
        } else if simple.ends_with("Model") || model_classes.iter().any(|c| c == simple) {
            is_model = true;
        }
    }

    is_model.then_some(inherited)
}

/// The implicit one-to-one field linking a child table to its parent's.
fn parent_link(parent: &str, primary_key: bool) -> ModelField {
    let name = format!("{}_ptr", parent.to_lowercase());
    let column = format!("{name}_id");
    let field = ModelField::new(name, "OneToOneField", CanonicalType::Integer)
        .references(parent)
        .with_column(column);
    if primary_key { field.primary_key() } else { field }
}

fn read_class_line(decl: &mut ClassDecl, line: &LogicalLine) {
    let body_indent = *decl.body_indent.get_or_insert(line.indent);

    if line.indent > body_indent {
        if decl.in_meta {
            read_meta_line(decl, &line.text);
        }
        return;
    }
    if line.indent < body_indent {
        return;
    }

    decl.in_meta = false;
    if let Some(caps) = CLASS_RE.captures(&line.text) {
        decl.in_meta = &caps[1] == "Meta";
        return;
    }

    if let Some(field) = parse_field_line(&decl.name, &line.text) {
        // a redeclared field overrides the inherited one
        decl.fields.retain(|f| f.name != field.name);
        decl.fields.push(field);
    }
}

fn read_meta_line(decl: &mut ClassDecl, text: &str) {
    let Some(caps) = ASSIGN_RE.captures(text) else {
        return;
    };
    let value = caps[2].trim();
    match &caps[1] {
        "db_table" => decl.db_table = python::unquote(value).map(str::to_string),
        "abstract" => decl.is_abstract = value == "True",
        "proxy" => decl.is_proxy = value == "True",
        _ => {}
    }
}

/// Parse `name = models.XxxField(...)` into a field.
fn parse_field_line(model: &str, text: &str) -> Option<ModelField> {
    let caps = ASSIGN_RE.captures(text)?;
    let name = &caps[1];
    let call = python::parse_call(&caps[2])?;
    let kind = call.name();

    let is_relation = typemap::is_django_relation(kind);
    if !is_relation && !kind.ends_with("Field") {
        return None;
    }

    let primary_key = call.flag("primary_key");
    let db_column = call.keyword("db_column").and_then(python::unquote);

    let mut field = ModelField::new(name, kind, typemap::django_field_type(kind))
        .nullable(call.flag("null") && !primary_key);
    if primary_key {
        field = field.primary_key();
    }
    if let Some(max_length) = call.keyword("max_length").and_then(|v| v.parse().ok()) {
        field = field.with_max_length(max_length);
    }

    if is_relation {
        let target = call
            .keyword("to")
            .or_else(|| call.positional.first().map(String::as_str))
            .map(|raw| relation_target(model, raw))
            .unwrap_or_default();

        if kind == "ManyToManyField" {
            field.referenced_model = Some(target);
            field.canonical_type = CanonicalType::Unknown;
            return Some(field.without_column());
        }

        let column = db_column.map_or_else(|| format!("{name}_id"), str::to_string);
        return Some(field.references(target).with_column(column));
    }

    if let Some(column) = db_column {
        field = field.with_column(column);
    }
    Some(field)
}

/// Normalise a relation target (`User`, `'shop.Order'`, `"self"`,
/// `settings.AUTH_USER_MODEL`) to a bare model name.
fn relation_target(model: &str, raw: &str) -> SmolStr {
    let raw = raw.trim();
    if raw.ends_with("AUTH_USER_MODEL") {
        return SmolStr::new("User");
    }
    let name = python::unquote(raw).unwrap_or(raw);
    if name == "self" {
        return SmolStr::new(model);
    }
    SmolStr::new(name.rsplit('.').next().unwrap_or(name))
}

fn close_class(
    app: &str,
    decl: ClassDecl,
    models: &mut Vec<Model>,
    abstract_fields: &mut HashMap<String, Vec<ModelField>>,
) -> SchemaResult<()> {
    if decl.is_abstract {
        abstract_fields.insert(decl.name, decl.fields);
        return Ok(());
    }
    if decl.is_proxy {
        return Ok(());
    }

    let table_name = decl.db_table.clone().unwrap_or_else(|| {
        format!("{}_{}", app.to_lowercase(), decl.name.to_lowercase())
    });
    if table_name.trim().is_empty() {
        return Err(SchemaError::invalid_model(decl.name, "empty db_table"));
    }

    let mut fields = decl.fields;
    if !fields.iter().any(|f| f.is_primary_key) {
        fields.insert(
            0,
            ModelField::new("id", "AutoField", CanonicalType::Integer).primary_key(),
        );
    }

    models.push(Model {
        name: SmolStr::new(&decl.name),
        table_name,
        app_name: Some(SmolStr::new(app)),
        fields,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OrmKind;
    use crate::workspace::FsWorkspace;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    const SHOP_MODELS: &str = r#"
from django.conf import settings
from django.db import models


class Customer(models.Model):
    name = models.CharField(max_length=120)
    email = models.EmailField(null=True, blank=True)


class Order(models.Model):
    """An order placed by a customer."""

    id = models.AutoField(primary_key=True)
    owner = models.ForeignKey(
        Customer,
        on_delete=models.CASCADE,
        related_name="orders",
    )
    total = models.DecimalField(max_digits=10, decimal_places=2)
    tags = models.ManyToManyField("shop.Tag")

    class Meta:
        ordering = ["-id"]

    def __str__(self):
        label = models.CharField(max_length=1)
        return f"Order {self.id}"


class Tag(models.Model):
    label = models.SlugField(db_column="slug")
    created_by = models.ForeignKey(settings.AUTH_USER_MODEL, null=True, on_delete=models.SET_NULL)

    class Meta:
        db_table = "shop_tags"
"#;

    #[test]
    fn test_default_table_names() {
        let models = parse_models_source("Shop", SHOP_MODELS).unwrap();
        let tables: Vec<_> = models.iter().map(|m| m.table_name.as_str()).collect();
        assert_eq!(tables, vec!["shop_customer", "shop_order", "shop_tags"]);
        assert!(models.iter().all(|m| m.app_name.as_deref() == Some("Shop")));
    }

    #[test]
    fn test_implicit_primary_key() {
        let models = parse_models_source("shop", SHOP_MODELS).unwrap();
        let customer = &models[0];

        assert_eq!(customer.fields[0].name, "id");
        assert!(customer.fields[0].is_primary_key);
        assert_eq!(customer.fields[0].declared_type, "AutoField");
        assert_eq!(customer.fields.len(), 3);
        assert!(customer.get_field("email").unwrap().nullable);
        assert_eq!(customer.get_field("name").unwrap().max_length, Some(120));
    }

    #[test]
    fn test_foreign_key_column() {
        let models = parse_models_source("shop", SHOP_MODELS).unwrap();
        let order = &models[1];

        let names: Vec<_> = order.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "owner", "total", "tags"]);

        let owner = order.get_field("owner").unwrap();
        assert!(owner.is_foreign_key);
        assert_eq!(owner.referenced_model.as_deref(), Some("Customer"));
        assert_eq!(owner.column_name(), Some("owner_id"));
        assert!(!owner.nullable);

        let tags = order.get_field("tags").unwrap();
        assert_eq!(tags.column_name(), None);
        assert_eq!(tags.referenced_model.as_deref(), Some("Tag"));
        assert!(!tags.is_foreign_key);
    }

    #[test]
    fn test_db_column_and_swappable_user() {
        let models = parse_models_source("shop", SHOP_MODELS).unwrap();
        let tag = &models[2];

        assert_eq!(tag.get_field("label").unwrap().column_name(), Some("slug"));
        let created_by = tag.get_field("created_by").unwrap();
        assert_eq!(created_by.referenced_model.as_deref(), Some("User"));
        assert_eq!(created_by.column_name(), Some("created_by_id"));
        assert!(created_by.nullable);
    }

    #[test]
    fn test_abstract_inheritance_and_proxy() {
        let src = r#"
class Timestamped(models.Model):
    created = models.DateTimeField(auto_now_add=True)

    class Meta:
        abstract = True


class Article(Timestamped):
    title = models.CharField(max_length=200)


class Draft(Article):
    class Meta:
        proxy = True
"#;
        let models = parse_models_source("news", src).unwrap();
        assert_eq!(models.len(), 1);

        let article = &models[0];
        let names: Vec<_> = article.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "created", "title"]);
        assert_eq!(article.table_name, "news_article");
    }

    #[test]
    fn test_multi_table_inheritance() {
        let src = r#"
class Place(models.Model):
    name = models.CharField(max_length=50)


class Restaurant(Place):
    serves_pizza = models.BooleanField(default=False)
"#;
        let models = parse_models_source("dining", src).unwrap();
        let restaurant = &models[1];
        assert_eq!(restaurant.table_name, "dining_restaurant");

        let names: Vec<_> = restaurant.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["place_ptr", "serves_pizza"]);

        let link = &restaurant.fields[0];
        assert!(link.is_primary_key);
        assert!(link.is_foreign_key);
        assert_eq!(link.column_name(), Some("place_ptr_id"));
        assert_eq!(link.referenced_model.as_deref(), Some("Place"));
        assert_eq!(restaurant.get_field("id"), None);
    }

    #[test]
    fn test_non_model_classes_ignored() {
        let src = r#"
class Status(models.TextChoices):
    OPEN = "open"

class Helper:
    value = models.CharField(max_length=3)
"#;
        assert!(parse_models_source("x", src).unwrap().is_empty());
    }

    #[test]
    fn test_unterminated_call_is_error() {
        let err = parse_models_source("x", "class A(models.Model):\n    a = models.CharField(\n").unwrap_err();
        assert!(matches!(err, SchemaError::SyntaxError { .. }));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let first = parse_models_source("shop", SHOP_MODELS).unwrap();
        let second = parse_models_source("shop", SHOP_MODELS).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_find_apps_skips_broken_files() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("shop")).unwrap();
        fs::create_dir_all(dir.path().join("broken")).unwrap();
        fs::create_dir_all(dir.path().join("accounts/models")).unwrap();
        fs::write(dir.path().join("manage.py"), "").unwrap();
        fs::write(dir.path().join("shop/models.py"), SHOP_MODELS).unwrap();
        fs::write(
            dir.path().join("broken/models.py"),
            "class A(models.Model):\n    a = models.CharField(\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("accounts/models/profile.py"),
            "class Profile(models.Model):\n    uid = models.UUIDField(primary_key=True)\n",
        )
        .unwrap();

        let config = OrmConfig::new(OrmKind::Django).with_project_root(dir.path());
        let apps = find_apps(&FsWorkspace::new(), &config);

        let names: Vec<_> = apps.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["accounts", "shop"]);
        assert_eq!(apps[0].models[0].table_name, "accounts_profile");
        assert_eq!(find_models(&FsWorkspace::new(), &config).len(), 4);
    }

    #[test]
    fn test_foreign_key_takes_referenced_pk_type() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        fs::write(
            dir.path().join("a/models.py"),
            "class Account(models.Model):\n    key = models.UUIDField(primary_key=True)\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("b/models.py"),
            "class Login(models.Model):\n    account = models.ForeignKey('a.Account', on_delete=models.CASCADE)\n",
        )
        .unwrap();

        let config = OrmConfig::new(OrmKind::Django).with_project_root(dir.path());
        let models = find_models(&FsWorkspace::new(), &config);
        let login = models.iter().find(|m| m.name == "Login").unwrap();
        assert_eq!(
            login.get_field("account").unwrap().canonical_type,
            CanonicalType::Uuid
        );
    }
}
