//! Canonical model types shared by both ORM ecosystems.
//!
//! Every parser converts its own declaration format into these values right
//! away, so drift and status reconciliation never need to know which ORM a
//! model came from.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// The ORM ecosystems ormsync understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrmKind {
    /// App-grouped `models.py` files with numbered, dependency-linked migrations.
    Django,
    /// A single `schema.prisma` file with timestamp-ordered migration directories.
    Prisma,
}

impl OrmKind {
    /// All supported kinds, in detection order.
    pub const ALL: [OrmKind; 2] = [OrmKind::Django, OrmKind::Prisma];

    /// Human readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Django => "Django",
            Self::Prisma => "Prisma",
        }
    }

    /// Icon hint for presentation layers.
    pub fn icon_hint(&self) -> &'static str {
        match self {
            Self::Django => "django",
            Self::Prisma => "prisma",
        }
    }

    /// Default name of the migration tracking table.
    pub fn default_tracking_table(&self) -> &'static str {
        match self {
            Self::Django => "django_migrations",
            Self::Prisma => "_prisma_migrations",
        }
    }

    /// Lowercase identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Django => "django",
            Self::Prisma => "prisma",
        }
    }
}

impl std::fmt::Display for OrmKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// One detected ORM installation in the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrmConfig {
    /// Which ecosystem was detected.
    pub kind: OrmKind,
    /// Display name.
    pub display_name: String,
    /// Icon hint.
    pub icon_hint: String,
    /// Directory the ORM project lives in.
    pub project_root: Option<PathBuf>,
    /// Settings file (Django) or schema file (Prisma).
    pub config_path: Option<PathBuf>,
}

impl OrmConfig {
    /// Create a config for a kind with its default display metadata.
    pub fn new(kind: OrmKind) -> Self {
        Self {
            kind,
            display_name: kind.display_name().to_string(),
            icon_hint: kind.icon_hint().to_string(),
            project_root: None,
            config_path: None,
        }
    }

    /// Set the project root.
    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = Some(root.into());
        self
    }

    /// Set the config path.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }
}

/// Column type categories used to compare declared fields with live columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalType {
    /// Integer family (smallint, integer, bigint, serial).
    Integer,
    /// Character data of any length.
    Text,
    /// Boolean.
    Boolean,
    /// Date, time and timestamp types.
    Timestamp,
    /// Exact and floating point numbers.
    Numeric,
    /// UUID.
    Uuid,
    /// JSON documents.
    Json,
    /// Raw bytes.
    Binary,
    /// Database enum types.
    Enum,
    /// Array columns.
    Array,
    /// Anything not recognised.
    Unknown,
}

impl CanonicalType {
    /// Get the category name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
            Self::Numeric => "numeric",
            Self::Uuid => "uuid",
            Self::Json => "json",
            Self::Binary => "binary",
            Self::Enum => "enum",
            Self::Array => "array",
            Self::Unknown => "unknown",
        }
    }

    /// Whether the category can take part in a type comparison.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl std::fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One declared attribute of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelField {
    /// Attribute name as declared.
    pub name: SmolStr,
    /// Raw declared type (e.g. `ForeignKey`, `String`).
    pub declared_type: String,
    /// Comparison category.
    pub canonical_type: CanonicalType,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Part of the primary key.
    pub is_primary_key: bool,
    /// References another model through a column.
    pub is_foreign_key: bool,
    /// Referenced model name, if any.
    pub referenced_model: Option<SmolStr>,
    /// Declared maximum length.
    pub max_length: Option<u32>,
    /// Expected live column name; `None` when the field has no column.
    pub column: Option<String>,
}

impl ModelField {
    /// Create a plain, non-null field whose column is its own name.
    pub fn new(
        name: impl Into<SmolStr>,
        declared_type: impl Into<String>,
        canonical_type: CanonicalType,
    ) -> Self {
        let name = name.into();
        Self {
            column: Some(name.to_string()),
            name,
            declared_type: declared_type.into(),
            canonical_type,
            nullable: false,
            is_primary_key: false,
            is_foreign_key: false,
            referenced_model: None,
            max_length: None,
        }
    }

    /// Mark the field nullable.
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Mark the field as the primary key.
    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    /// Mark the field as a foreign key to `model`.
    pub fn references(mut self, model: impl Into<SmolStr>) -> Self {
        self.is_foreign_key = true;
        self.referenced_model = Some(model.into());
        self
    }

    /// Override the expected column name.
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Mark the field as having no backing column.
    pub fn without_column(mut self) -> Self {
        self.column = None;
        self
    }

    /// Set the maximum length.
    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// The expected live column name.
    pub fn column_name(&self) -> Option<&str> {
        self.column.as_deref()
    }
}

/// A declared model, mapped to one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    /// Model name as declared.
    pub name: SmolStr,
    /// Table the model is stored in.
    pub table_name: String,
    /// Owning app (Django only).
    pub app_name: Option<SmolStr>,
    /// Fields in declaration order.
    pub fields: Vec<ModelField>,
}

impl Model {
    /// Create a model with no fields.
    pub fn new(name: impl Into<SmolStr>, table_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table_name: table_name.into(),
            app_name: None,
            fields: Vec::new(),
        }
    }

    /// Set the owning app.
    pub fn with_app(mut self, app: impl Into<SmolStr>) -> Self {
        self.app_name = Some(app.into());
        self
    }

    /// Append a field.
    pub fn with_field(mut self, field: ModelField) -> Self {
        self.fields.push(field);
        self
    }

    /// Get a field by name.
    pub fn get_field(&self, name: &str) -> Option<&ModelField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The primary key fields.
    pub fn primary_key_fields(&self) -> Vec<&ModelField> {
        self.fields.iter().filter(|f| f.is_primary_key).collect()
    }

    /// Fields that map to a live column.
    pub fn column_fields(&self) -> impl Iterator<Item = &ModelField> {
        self.fields.iter().filter(|f| f.column.is_some())
    }
}

/// A Django app and the models it declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    /// App label (directory name).
    pub name: SmolStr,
    /// Models declared by the app.
    pub models: Vec<Model>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orm_config_defaults() {
        let config = OrmConfig::new(OrmKind::Django).with_project_root("/srv/shop");
        assert_eq!(config.display_name, "Django");
        assert_eq!(config.icon_hint, "django");
        assert_eq!(config.project_root, Some(PathBuf::from("/srv/shop")));
        assert!(config.config_path.is_none());
    }

    #[test]
    fn test_tracking_tables() {
        assert_eq!(OrmKind::Django.default_tracking_table(), "django_migrations");
        assert_eq!(OrmKind::Prisma.default_tracking_table(), "_prisma_migrations");
    }

    #[test]
    fn test_field_builder() {
        let field = ModelField::new("owner", "ForeignKey", CanonicalType::Integer)
            .references("User")
            .with_column("owner_id");

        assert!(field.is_foreign_key);
        assert_eq!(field.referenced_model.as_deref(), Some("User"));
        assert_eq!(field.column_name(), Some("owner_id"));
        assert!(!field.nullable);
    }

    #[test]
    fn test_model_column_fields() {
        let model = Model::new("Post", "Post")
            .with_field(ModelField::new("id", "Int", CanonicalType::Integer).primary_key())
            .with_field(ModelField::new("author", "User", CanonicalType::Unknown).without_column());

        assert_eq!(model.column_fields().count(), 1);
        assert_eq!(model.primary_key_fields().len(), 1);
        assert!(model.get_field("author").is_some());
    }

    #[test]
    fn test_canonical_type_display() {
        assert_eq!(CanonicalType::Timestamp.to_string(), "timestamp");
        assert!(!CanonicalType::Unknown.is_known());
        assert!(CanonicalType::Enum.is_known());
    }
}
