//! Reconciliation pass.
//!
//! A pass detects the ORMs in a workspace and, for each one, joins two
//! independent inputs: the parsed declarations (models and migrations, read
//! on the blocking pool) and the live database reads (tracking table and
//! per-table introspection, each bounded by the query timeout). A failed or
//! slow live read only marks the affected model or migration set as
//! unknown. Every pass builds a fresh [`PassReport`]; nothing is cached.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use ormsync_schema::{Detector, Model, OrmConfig, OrmKind, WorkspaceReader, find_models};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::drift::{DriftResult, ModelStatus, detect_drift, model_status};
use crate::error::{MigrateResult, MigrationError};
use crate::history::{AppliedSet, get_applied_migrations};
use crate::introspect::{SqlChannel, fetch_columns, table_exists};
use crate::migration::{MigrationState, find_migrations};
use crate::status::{MigrationReconciliation, reconcile};

/// Default bound on every live read.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

const NO_DATABASE: &str = "no database connection configured";

/// Configuration for a reconciliation pass.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Workspace root to scan.
    pub root: PathBuf,
    /// Explicit Prisma schema path, relative to the root.
    pub prisma_schema: Option<PathBuf>,
    /// Bound on each live read.
    pub query_timeout: Duration,
    /// Database schema holding the tables (default: "public").
    pub database_schema: String,
    /// Django tracking table.
    pub django_tracking_table: String,
    /// Prisma tracking table.
    pub prisma_tracking_table: String,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            prisma_schema: None,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            database_schema: "public".to_string(),
            django_tracking_table: OrmKind::Django.default_tracking_table().to_string(),
            prisma_tracking_table: OrmKind::Prisma.default_tracking_table().to_string(),
        }
    }
}

impl ReconcileConfig {
    /// Create a new configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the workspace root.
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Use an explicit Prisma schema path.
    pub fn prisma_schema(mut self, path: impl Into<PathBuf>) -> Self {
        self.prisma_schema = Some(path.into());
        self
    }

    /// Set the live read timeout.
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Set the database schema.
    pub fn database_schema(mut self, schema: impl Into<String>) -> Self {
        self.database_schema = schema.into();
        self
    }

    /// Set the Django tracking table.
    pub fn django_tracking_table(mut self, table: impl Into<String>) -> Self {
        self.django_tracking_table = table.into();
        self
    }

    /// Set the Prisma tracking table.
    pub fn prisma_tracking_table(mut self, table: impl Into<String>) -> Self {
        self.prisma_tracking_table = table.into();
        self
    }

    /// Tracking table of an ecosystem.
    pub fn tracking_table(&self, kind: OrmKind) -> &str {
        match kind {
            OrmKind::Django => &self.django_tracking_table,
            OrmKind::Prisma => &self.prisma_tracking_table,
        }
    }
}

/// Reconciliation of one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelReport {
    /// The declared model.
    pub model: Model,
    /// Its status.
    pub status: ModelStatus,
    /// Drift, when the table exists and was read.
    pub drift: Option<DriftResult>,
    /// Why the status is unknown, if it is.
    pub error: Option<String>,
}

impl ModelReport {
    fn unknown(model: Model, reason: impl Into<String>) -> Self {
        Self {
            model,
            status: ModelStatus::Unknown,
            drift: None,
            error: Some(reason.into()),
        }
    }
}

/// Reconciliation of one detected ORM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcosystemReport {
    /// The detected ORM.
    pub config: OrmConfig,
    /// Per-model results, in declaration order.
    pub models: Vec<ModelReport>,
    /// Migration results.
    pub migrations: MigrationReconciliation,
}

impl EcosystemReport {
    /// Number of models with a given status.
    pub fn count(&self, status: ModelStatus) -> usize {
        self.models.iter().filter(|m| m.status == status).count()
    }
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassReport {
    /// Workspace root that was scanned.
    pub root: PathBuf,
    /// When the pass started.
    pub started_at: DateTime<Utc>,
    /// Total duration in milliseconds.
    pub duration_ms: i64,
    /// One entry per detected ORM, in detection order.
    pub ecosystems: Vec<EcosystemReport>,
    /// Live read failures and other non-fatal problems.
    pub warnings: Vec<String>,
}

impl PassReport {
    /// The report of one ecosystem, if it was detected.
    pub fn ecosystem(&self, kind: OrmKind) -> Option<&EcosystemReport> {
        self.ecosystems.iter().find(|e| e.config.kind == kind)
    }

    /// Whether anything needs a migration or attention.
    pub fn has_changes(&self) -> bool {
        self.ecosystems.iter().any(|e| {
            e.models
                .iter()
                .any(|m| matches!(m.status, ModelStatus::Changed | ModelStatus::Missing))
                || e.migrations.statuses.values().any(MigrationState::needs_attention)
        })
    }

    /// One-line summary.
    pub fn summary(&self) -> String {
        if self.ecosystems.is_empty() {
            return "No supported ORM detected".to_string();
        }

        let parts: Vec<String> = self
            .ecosystems
            .iter()
            .map(|e| {
                format!(
                    "{}: {} models ({} changed, {} missing), {} pending migrations",
                    e.config.display_name,
                    e.models.len(),
                    e.count(ModelStatus::Changed),
                    e.count(ModelStatus::Missing),
                    e.migrations.count(MigrationState::Pending),
                )
            })
            .collect();
        format!("{} in {}ms", parts.join("; "), self.duration_ms)
    }
}

/// Runs reconciliation passes over a workspace.
pub struct ReconcileEngine {
    config: ReconcileConfig,
    reader: Arc<dyn WorkspaceReader>,
    channel: Option<Arc<dyn SqlChannel>>,
}

impl ReconcileEngine {
    /// Create an engine without a database; live statuses come back unknown.
    pub fn new(config: ReconcileConfig, reader: Arc<dyn WorkspaceReader>) -> Self {
        Self {
            config,
            reader,
            channel: None,
        }
    }

    /// Read live state through `channel`.
    pub fn with_channel(mut self, channel: Arc<dyn SqlChannel>) -> Self {
        self.channel = Some(channel);
        self
    }

    /// The configuration.
    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    fn detector(&self) -> Detector {
        let detector = Detector::new(&self.config.root);
        match &self.config.prisma_schema {
            Some(path) => detector.prisma_schema(path),
            None => detector,
        }
    }

    /// Detect the ORMs in the workspace.
    pub fn detect(&self) -> Vec<OrmConfig> {
        self.detector().detect(self.reader.as_ref())
    }

    /// Run one full pass.
    pub async fn run_pass(&self) -> PassReport {
        self.pass(true).await
    }

    /// Run a pass over migrations only.
    ///
    /// Models are neither parsed nor introspected; the only live read per
    /// ecosystem is its tracking table, and every report has no models.
    pub async fn run_migrations_pass(&self) -> PassReport {
        self.pass(false).await
    }

    async fn pass(&self, with_models: bool) -> PassReport {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut warnings = Vec::new();

        let reader = Arc::clone(&self.reader);
        let detector = self.detector();
        let configs = match tokio::task::spawn_blocking(move || detector.detect(reader.as_ref())).await
        {
            Ok(configs) => configs,
            Err(e) => {
                warn!(error = %e, "detection task failed");
                warnings.push(format!("detection failed: {e}"));
                Vec::new()
            }
        };

        if self.channel.is_none() && !configs.is_empty() {
            warnings.push(format!("{NO_DATABASE}; live status is unknown"));
        }

        let results = join_all(
            configs
                .into_iter()
                .map(|c| self.run_ecosystem(c, with_models)),
        )
        .await;

        let mut ecosystems = Vec::with_capacity(results.len());
        for (report, ecosystem_warnings) in results {
            warnings.extend(ecosystem_warnings);
            ecosystems.push(report);
        }

        let report = PassReport {
            root: self.config.root.clone(),
            started_at,
            duration_ms: start.elapsed().as_millis() as i64,
            ecosystems,
            warnings,
        };
        info!(summary = %report.summary(), warnings = report.warnings.len(), "reconciliation pass complete");
        report
    }

    async fn run_ecosystem(
        &self,
        config: OrmConfig,
        with_models: bool,
    ) -> (EcosystemReport, Vec<String>) {
        let mut warnings = Vec::new();
        let kind = config.kind;

        let models_task = with_models.then(|| {
            let reader = Arc::clone(&self.reader);
            let config = config.clone();
            tokio::task::spawn_blocking(move || find_models(reader.as_ref(), &config))
        });
        let models_task = async move {
            match models_task {
                Some(task) => task.await,
                None => Ok(Vec::new()),
            }
        };
        let migrations_task = {
            let reader = Arc::clone(&self.reader);
            let config = config.clone();
            tokio::task::spawn_blocking(move || find_migrations(reader.as_ref(), &config))
        };

        let (models, migrations, applied) =
            tokio::join!(models_task, migrations_task, self.read_applied(kind));

        let models = models.unwrap_or_else(|e| {
            warnings.push(format!("{kind}: model parsing failed: {e}"));
            Vec::new()
        });
        let migrations = migrations.unwrap_or_else(|e| {
            warnings.push(format!("{kind}: migration parsing failed: {e}"));
            Vec::new()
        });

        let migrations = match applied {
            Ok(applied) => reconcile(&migrations, &applied),
            Err(reason) => {
                if self.channel.is_some() {
                    warn!(kind = %kind, error = %reason, "could not read migration history");
                    warnings.push(format!("{kind}: migration history: {reason}"));
                }
                MigrationReconciliation::unknown(migrations, reason)
            }
        };
        for row in &migrations.applied_not_on_disk {
            warnings.push(format!("{kind}: migration {} is applied but missing on disk", row.id));
        }

        let models = join_all(models.into_iter().map(|m| self.reconcile_model(m))).await;
        for report in &models {
            if let (Some(error), true) = (&report.error, self.channel.is_some()) {
                warnings.push(format!("{kind}: {}: {error}", report.model.table_name));
            }
        }

        debug!(kind = %kind, models = models.len(), migrations = migrations.migrations.len(), "ecosystem reconciled");
        (
            EcosystemReport {
                config,
                models,
                migrations,
            },
            warnings,
        )
    }

    async fn read_applied(&self, kind: OrmKind) -> Result<AppliedSet, String> {
        let Some(channel) = &self.channel else {
            return Err(NO_DATABASE.to_string());
        };
        let table = self.config.tracking_table(kind);

        self.bounded(
            format!("{table} tracking table"),
            get_applied_migrations(channel.as_ref(), kind, &self.config.database_schema, table),
        )
        .await
        .map_err(|e| e.to_string())
    }

    async fn reconcile_model(&self, model: Model) -> ModelReport {
        let Some(channel) = &self.channel else {
            return ModelReport::unknown(model, NO_DATABASE);
        };
        let schema = &self.config.database_schema;
        let table = model.table_name.clone();

        let exists = self
            .bounded(
                format!("existence of {table}"),
                table_exists(channel.as_ref(), schema, &table),
            )
            .await;

        match exists {
            Err(e) => {
                warn!(table = %table, error = %e, "table existence check failed");
                ModelReport::unknown(model, e.to_string())
            }
            Ok(false) => ModelReport {
                model,
                status: model_status(false, None),
                drift: None,
                error: None,
            },
            Ok(true) => {
                let columns = self
                    .bounded(
                        format!("columns of {table}"),
                        fetch_columns(channel.as_ref(), schema, &table),
                    )
                    .await;
                match columns {
                    Ok(columns) => {
                        let drift = detect_drift(&model, &columns);
                        ModelReport {
                            status: model_status(true, Some(&drift)),
                            model,
                            drift: Some(drift),
                            error: None,
                        }
                    }
                    Err(e) => {
                        warn!(table = %table, error = %e, "column introspection failed");
                        ModelReport::unknown(model, e.to_string())
                    }
                }
            }
        }
    }

    /// Run a live read under the query timeout.
    async fn bounded<T>(
        &self,
        what: String,
        read: impl Future<Output = MigrateResult<T>>,
    ) -> MigrateResult<T> {
        match tokio::time::timeout(self.config.query_timeout, read).await {
            Ok(result) => result,
            Err(_) => Err(MigrationError::timeout(what, self.config.query_timeout)),
        }
    }
}
