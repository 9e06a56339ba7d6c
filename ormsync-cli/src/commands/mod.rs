//! CLI command implementations.

pub mod detect;
pub mod migrations;
pub mod models;
pub mod status;
pub mod version;

use std::sync::Arc;
use std::time::Duration;

use ormsync_migrate::{PassReport, ReconcileEngine};
use ormsync_schema::OrmKind;

use crate::cli::{GlobalArgs, KindArg};
use crate::config::Settings;
use crate::error::CliResult;

/// Build an engine for the workspace, connecting to the database when a URL
/// is configured.
///
/// A failed connection is not fatal: the engine runs without a database and
/// the returned warning explains why live statuses are unknown.
pub async fn engine(settings: &Settings) -> (ReconcileEngine, Option<String>) {
    let engine = ReconcileEngine::new(settings.reconcile.clone(), Arc::new(settings.reader()));

    match &settings.database_url {
        Some(url) => connect(engine, url, settings.reconcile.query_timeout).await,
        None => (engine, None),
    }
}

#[cfg(feature = "postgres")]
async fn connect(
    engine: ReconcileEngine,
    url: &str,
    timeout: Duration,
) -> (ReconcileEngine, Option<String>) {
    match crate::postgres::PostgresChannel::connect(url, timeout).await {
        Ok(channel) => (engine.with_channel(Arc::new(channel)), None),
        Err(e) => {
            tracing::warn!(error = %e, "could not connect to the database");
            (engine, Some(e.to_string()))
        }
    }
}

#[cfg(not(feature = "postgres"))]
async fn connect(
    engine: ReconcileEngine,
    _url: &str,
    _timeout: Duration,
) -> (ReconcileEngine, Option<String>) {
    (
        engine,
        Some("built without database support; live status is unknown".to_string()),
    )
}

/// Run one reconciliation pass, keeping only the requested ORM.
pub async fn run_pass(global: &GlobalArgs, kind: Option<KindArg>) -> CliResult<PassReport> {
    let settings = Settings::resolve(global)?;
    let (engine, connect_warning) = engine(&settings).await;

    let report = engine.run_pass().await;
    Ok(finish(report, connect_warning, kind))
}

/// Like [`run_pass`], but only migrations are read.
pub async fn run_migrations_pass(
    global: &GlobalArgs,
    kind: Option<KindArg>,
) -> CliResult<PassReport> {
    let settings = Settings::resolve(global)?;
    let (engine, connect_warning) = engine(&settings).await;

    let report = engine.run_migrations_pass().await;
    Ok(finish(report, connect_warning, kind))
}

fn finish(
    mut report: PassReport,
    connect_warning: Option<String>,
    kind: Option<KindArg>,
) -> PassReport {
    if let Some(warning) = connect_warning {
        report.warnings.insert(0, warning);
    }
    if let Some(kind) = kind.map(OrmKind::from) {
        report.ecosystems.retain(|e| e.config.kind == kind);
    }
    report
}
