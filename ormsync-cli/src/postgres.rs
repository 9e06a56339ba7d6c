//! PostgreSQL [`SqlChannel`] backed by `tokio-postgres`.

use std::time::Duration;

use async_trait::async_trait;
use ormsync_migrate::{MigrateResult, MigrationError, QueryResult, SqlChannel};
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls};

use crate::error::{CliError, CliResult};

/// A read-only PostgreSQL connection.
pub struct PostgresChannel {
    client: Client,
}

impl PostgresChannel {
    /// Connect to the database, giving up after `timeout`.
    pub async fn connect(url: &str, timeout: Duration) -> CliResult<Self> {
        let connect = tokio_postgres::connect(url, NoTls);
        let (client, connection) = tokio::time::timeout(timeout, connect)
            .await
            .map_err(|_| {
                CliError::Database(format!("Connection timed out after {}s", timeout.as_secs()))
            })?
            .map_err(|e| CliError::Database(format!("Failed to connect: {}", e)))?;

        // Spawn the connection handler
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!(error = %e, "database connection closed");
            }
        });

        Ok(Self { client })
    }
}

#[async_trait]
impl SqlChannel for PostgresChannel {
    async fn query(&self, sql: &str, params: &[&str]) -> MigrateResult<QueryResult> {
        let statement = self
            .client
            .prepare(sql)
            .await
            .map_err(|e| MigrationError::database(e.to_string()))?;

        let params: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        let rows = self
            .client
            .query(&statement, &params)
            .await
            .map_err(|e| MigrationError::database(e.to_string()))?;

        let mut result = QueryResult::new(statement.columns().iter().map(|c| c.name()));
        for row in rows {
            let mut cells = Vec::with_capacity(row.len());
            for idx in 0..row.len() {
                let cell: Option<String> = row
                    .try_get(idx)
                    .map_err(|e| MigrationError::database(e.to_string()))?;
                cells.push(cell);
            }
            result.rows.push(cells);
        }
        Ok(result)
    }
}
