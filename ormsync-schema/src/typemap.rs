//! Mapping of declared ORM field types and live SQL types to [`CanonicalType`].
//!
//! Comparison happens at the family level only: `varchar(20)` and `text` are
//! both [`CanonicalType::Text`], `numeric(10,2)` and `double precision` are
//! both [`CanonicalType::Numeric`]. Drivers alias these freely.

use crate::model::CanonicalType;

/// Map a Django model field class to its canonical type.
///
/// Relation fields resolve to [`CanonicalType::Integer`] here; the parser
/// refines them to the referenced primary key type once all models are known.
pub fn django_field_type(declared: &str) -> CanonicalType {
    let name = declared.rsplit('.').next().unwrap_or(declared);

    match name {
        "AutoField" | "BigAutoField" | "SmallAutoField" | "IntegerField" | "BigIntegerField"
        | "SmallIntegerField" | "PositiveIntegerField" | "PositiveSmallIntegerField"
        | "PositiveBigIntegerField" | "ForeignKey" | "OneToOneField" => CanonicalType::Integer,
        "CharField" | "TextField" | "EmailField" | "SlugField" | "URLField" | "FilePathField"
        | "FileField" | "ImageField" | "GenericIPAddressField" | "IPAddressField"
        | "CICharField" | "CITextField" | "CIEmailField" => CanonicalType::Text,
        "BooleanField" | "NullBooleanField" => CanonicalType::Boolean,
        "DateTimeField" | "DateField" | "TimeField" => CanonicalType::Timestamp,
        "DecimalField" | "FloatField" => CanonicalType::Numeric,
        "UUIDField" => CanonicalType::Uuid,
        "JSONField" | "HStoreField" => CanonicalType::Json,
        "BinaryField" => CanonicalType::Binary,
        "ArrayField" => CanonicalType::Array,
        _ => CanonicalType::Unknown,
    }
}

/// Whether a Django field class declares a relation.
pub fn is_django_relation(declared: &str) -> bool {
    matches!(
        declared.rsplit('.').next().unwrap_or(declared),
        "ForeignKey" | "OneToOneField" | "ManyToManyField"
    )
}

/// Map a Prisma scalar type name to its canonical type.
///
/// `native` is the `@db.X` attribute name when present; it wins over the
/// scalar because it describes the actual column.
pub fn prisma_scalar_type(declared: &str, native: Option<&str>) -> CanonicalType {
    if let Some(native) = native {
        let mapped = sql_type(native);
        if mapped.is_known() {
            return mapped;
        }
    }

    match declared {
        "Int" | "BigInt" => CanonicalType::Integer,
        "String" => CanonicalType::Text,
        "Boolean" => CanonicalType::Boolean,
        "DateTime" => CanonicalType::Timestamp,
        "Float" | "Decimal" => CanonicalType::Numeric,
        "Json" => CanonicalType::Json,
        "Bytes" => CanonicalType::Binary,
        _ => CanonicalType::Unknown,
    }
}

/// Whether a Prisma type name is one of the built-in scalars.
pub fn is_prisma_scalar(declared: &str) -> bool {
    matches!(
        declared,
        "Int" | "BigInt" | "String" | "Boolean" | "DateTime" | "Float" | "Decimal" | "Json"
            | "Bytes" | "Unsupported"
    )
}

/// Map a live column type, as reported by the database, to its canonical type.
///
/// Accepts `information_schema.columns.data_type` values, PostgreSQL
/// `udt_name` spellings, and the common MySQL/SQLite names. Length and
/// precision suffixes are ignored.
pub fn sql_type(live: &str) -> CanonicalType {
    let lowered = live.trim().to_ascii_lowercase();
    if lowered.ends_with("[]") || lowered == "array" {
        return CanonicalType::Array;
    }
    // PostgreSQL array udt names are the element type prefixed with `_`
    if lowered.starts_with('_') && sql_type(&lowered[1..]).is_known() {
        return CanonicalType::Array;
    }

    let base = lowered
        .split('(')
        .next()
        .unwrap_or(&lowered)
        .trim()
        .trim_end_matches(" unsigned");

    match base {
        "smallint" | "integer" | "int" | "bigint" | "int2" | "int4" | "int8" | "serial"
        | "bigserial" | "smallserial" | "tinyint" | "mediumint" => CanonicalType::Integer,
        "text" | "varchar" | "character varying" | "char" | "character" | "bpchar"
        | "citext" | "nvarchar" | "nchar" | "tinytext" | "mediumtext" | "longtext" | "name"
        | "inet" | "cidr" => CanonicalType::Text,
        "boolean" | "bool" | "bit" => CanonicalType::Boolean,
        "timestamp" | "timestamptz" | "timestamp with time zone"
        | "timestamp without time zone" | "date" | "time" | "timetz" | "time with time zone"
        | "time without time zone" | "datetime" | "datetime2" | "datetimeoffset" => {
            CanonicalType::Timestamp
        }
        "numeric" | "decimal" | "real" | "double precision" | "double" | "float"
        | "float4" | "float8" | "money" => CanonicalType::Numeric,
        "uuid" | "uniqueidentifier" => CanonicalType::Uuid,
        "json" | "jsonb" | "hstore" => CanonicalType::Json,
        "bytea" | "blob" | "binary" | "varbinary" | "longblob" | "mediumblob" | "tinyblob" => {
            CanonicalType::Binary
        }
        "user-defined" | "enum" => CanonicalType::Enum,
        _ => CanonicalType::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_django_types() {
        assert_eq!(django_field_type("AutoField"), CanonicalType::Integer);
        assert_eq!(django_field_type("models.CharField"), CanonicalType::Text);
        assert_eq!(django_field_type("DecimalField"), CanonicalType::Numeric);
        assert_eq!(django_field_type("DateField"), CanonicalType::Timestamp);
        assert_eq!(django_field_type("UUIDField"), CanonicalType::Uuid);
        assert_eq!(django_field_type("ForeignKey"), CanonicalType::Integer);
        assert_eq!(django_field_type("DurationField"), CanonicalType::Unknown);
    }

    #[test]
    fn test_django_relations() {
        assert!(is_django_relation("models.ForeignKey"));
        assert!(is_django_relation("ManyToManyField"));
        assert!(!is_django_relation("CharField"));
    }

    #[test]
    fn test_prisma_types() {
        assert_eq!(prisma_scalar_type("Int", None), CanonicalType::Integer);
        assert_eq!(prisma_scalar_type("String", None), CanonicalType::Text);
        assert_eq!(prisma_scalar_type("String", Some("Uuid")), CanonicalType::Uuid);
        assert_eq!(prisma_scalar_type("Decimal", None), CanonicalType::Numeric);
        assert_eq!(prisma_scalar_type("Unsupported", None), CanonicalType::Unknown);
    }

    #[test]
    fn test_sql_types() {
        assert_eq!(sql_type("integer"), CanonicalType::Integer);
        assert_eq!(sql_type("character varying(255)"), CanonicalType::Text);
        assert_eq!(sql_type("numeric(10,2)"), CanonicalType::Numeric);
        assert_eq!(sql_type("timestamp with time zone"), CanonicalType::Timestamp);
        assert_eq!(sql_type("USER-DEFINED"), CanonicalType::Enum);
        assert_eq!(sql_type("ARRAY"), CanonicalType::Array);
        assert_eq!(sql_type("_int4"), CanonicalType::Array);
        assert_eq!(sql_type("int unsigned"), CanonicalType::Integer);
        assert_eq!(sql_type("tsvector"), CanonicalType::Unknown);
    }
}
