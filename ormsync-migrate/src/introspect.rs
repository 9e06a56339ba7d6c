//! Live database introspection.
//!
//! The engine only ever issues read-only queries through a [`SqlChannel`],
//! and every selected column is cast to text so channels can hand back plain
//! strings regardless of the driver.

use ormsync_schema::CanonicalType;
use ormsync_schema::typemap;
use serde::{Deserialize, Serialize};

use crate::error::{MigrateResult, MigrationError};

/// Rows returned by a [`SqlChannel`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names, in select order.
    pub fields: Vec<String>,
    /// Text-typed cells; `None` is SQL NULL.
    pub rows: Vec<Vec<Option<String>>>,
}

impl QueryResult {
    /// Create a result with the given column names and no rows.
    pub fn new(fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row.
    pub fn with_row(mut self, row: impl IntoIterator<Item = Option<&'static str>>) -> Self {
        self.rows
            .push(row.into_iter().map(|c| c.map(str::to_string)).collect());
        self
    }

    /// Cell at `row` in the column named `column`.
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.fields.iter().position(|f| f == column)?;
        self.rows.get(row)?.get(idx)?.as_deref()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A read-only SQL connection.
///
/// `params` bind to `$1`, `$2`, ... as text.
#[async_trait::async_trait]
pub trait SqlChannel: Send + Sync {
    /// Run a query and return its rows as text.
    async fn query(&self, sql: &str, params: &[&str]) -> MigrateResult<QueryResult>;
}

/// One live column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveColumn {
    /// Column name.
    pub name: String,
    /// Data type (e.g., "integer", "character varying").
    pub data_type: String,
    /// Underlying type name (e.g., "int4", "varchar").
    pub udt_name: String,
    /// Whether the column accepts NULL.
    pub is_nullable: bool,
    /// Ordinal position.
    pub ordinal_position: i32,
    /// Character maximum length (for varchar, etc.).
    pub character_maximum_length: Option<i32>,
}

impl LiveColumn {
    /// Create a column; `udt_name` defaults to `data_type`.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, is_nullable: bool) -> Self {
        let data_type = data_type.into();
        Self {
            name: name.into(),
            udt_name: data_type.clone(),
            data_type,
            is_nullable,
            ordinal_position: 0,
            character_maximum_length: None,
        }
    }

    /// Canonical type of the column.
    ///
    /// PostgreSQL reports extension types (`citext`, `hstore`, ...) and enums
    /// alike as `USER-DEFINED`, so for those the `udt_name` decides and only
    /// an unrecognised one is taken to be an enum.
    pub fn canonical_type(&self) -> CanonicalType {
        if self.data_type.eq_ignore_ascii_case("USER-DEFINED") {
            return match typemap::sql_type(&self.udt_name) {
                CanonicalType::Unknown => CanonicalType::Enum,
                known => known,
            };
        }
        match typemap::sql_type(&self.data_type) {
            CanonicalType::Unknown => typemap::sql_type(&self.udt_name),
            known => known,
        }
    }
}

/// Whether `schema.table` exists.
pub async fn table_exists(
    channel: &dyn SqlChannel,
    schema: &str,
    table: &str,
) -> MigrateResult<bool> {
    let result = channel
        .query(postgres_queries::TABLE_EXISTS, &[schema, table])
        .await?;
    Ok(matches!(result.get(0, "exists"), Some("true" | "t")))
}

/// Columns of `schema.table`, in ordinal order.
pub async fn fetch_columns(
    channel: &dyn SqlChannel,
    schema: &str,
    table: &str,
) -> MigrateResult<Vec<LiveColumn>> {
    let result = channel
        .query(postgres_queries::COLUMNS, &[schema, table])
        .await?;

    let mut columns = Vec::with_capacity(result.len());
    for row in 0..result.len() {
        let name = result
            .get(row, "column_name")
            .ok_or_else(|| MigrationError::database(format!("column without a name in {table}")))?;
        let data_type = result.get(row, "data_type").unwrap_or_default();

        columns.push(LiveColumn {
            name: name.to_string(),
            data_type: data_type.to_string(),
            udt_name: result.get(row, "udt_name").unwrap_or(data_type).to_string(),
            is_nullable: matches!(result.get(row, "is_nullable"), Some("YES" | "yes" | "true")),
            ordinal_position: result
                .get(row, "ordinal_position")
                .and_then(|p| p.parse().ok())
                .unwrap_or(row as i32 + 1),
            character_maximum_length: result
                .get(row, "character_maximum_length")
                .and_then(|l| l.parse().ok()),
        });
    }

    columns.sort_by_key(|c| c.ordinal_position);
    Ok(columns)
}

/// Quote an identifier for interpolation into SQL.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// PostgreSQL introspection queries.
pub mod postgres_queries {
    /// Query to check whether a table exists.
    pub const TABLE_EXISTS: &str = r#"
        SELECT EXISTS (
            SELECT 1
            FROM information_schema.tables
            WHERE table_schema = $1::text AND table_name = $2::text
        )::text AS "exists"
    "#;

    /// Query to get columns.
    pub const COLUMNS: &str = r#"
        SELECT
            column_name::text AS column_name,
            data_type::text AS data_type,
            udt_name::text AS udt_name,
            is_nullable::text AS is_nullable,
            ordinal_position::text AS ordinal_position,
            character_maximum_length::text AS character_maximum_length
        FROM information_schema.columns
        WHERE table_schema = $1::text AND table_name = $2::text
        ORDER BY ordinal_position
    "#;
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory [`SqlChannel`] for tests.

    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;

    /// Canned responses keyed by the first param (schema) and second (table),
    /// or by a substring of the SQL for parameterless queries.
    #[derive(Default)]
    pub struct FakeChannel {
        pub tables: HashMap<String, Vec<LiveColumn>>,
        pub raw: Vec<(&'static str, MigrateResult<QueryResult>)>,
        pub failing_tables: Vec<String>,
        pub slow_tables: Vec<String>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeChannel {
        pub fn with_table(mut self, name: &str, columns: Vec<LiveColumn>) -> Self {
            self.tables.insert(name.to_string(), columns);
            self
        }

        pub fn with_raw(mut self, sql_fragment: &'static str, result: QueryResult) -> Self {
            self.raw.push((sql_fragment, Ok(result)));
            self
        }

        pub fn failing(mut self, table: &str) -> Self {
            self.failing_tables.push(table.to_string());
            self
        }

        pub fn slow(mut self, table: &str) -> Self {
            self.slow_tables.push(table.to_string());
            self
        }
    }

    fn clone_result(r: &MigrateResult<QueryResult>) -> MigrateResult<QueryResult> {
        match r {
            Ok(q) => Ok(q.clone()),
            Err(e) => Err(MigrationError::database(e.to_string())),
        }
    }

    #[async_trait::async_trait]
    impl SqlChannel for FakeChannel {
        async fn query(&self, sql: &str, params: &[&str]) -> MigrateResult<QueryResult> {
            self.calls.lock().unwrap().push(sql.trim().to_string());

            if let Some((_, result)) = self.raw.iter().find(|(frag, _)| sql.contains(frag)) {
                return clone_result(result);
            }

            let table = params.get(1).copied().unwrap_or_default();
            if self.slow_tables.iter().any(|t| t == table) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            if self.failing_tables.iter().any(|t| t == table) {
                return Err(MigrationError::database(format!("permission denied for {table}")));
            }

            if sql.contains("EXISTS") {
                let exists = if self.tables.contains_key(table) { "true" } else { "false" };
                return Ok(QueryResult::new(["exists"]).with_row([Some(exists)]));
            }

            let mut result = QueryResult::new([
                "column_name",
                "data_type",
                "udt_name",
                "is_nullable",
                "ordinal_position",
                "character_maximum_length",
            ]);
            for (i, column) in self.tables.get(table).into_iter().flatten().enumerate() {
                result.rows.push(vec![
                    Some(column.name.clone()),
                    Some(column.data_type.clone()),
                    Some(column.udt_name.clone()),
                    Some(if column.is_nullable { "YES" } else { "NO" }.to_string()),
                    Some((i + 1).to_string()),
                    column.character_maximum_length.map(|l| l.to_string()),
                ]);
            }
            Ok(result)
        }
    }
}
