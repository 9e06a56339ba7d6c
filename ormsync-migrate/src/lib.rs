//! # ormsync-migrate
//!
//! Migration and schema reconciliation for ormsync.
//!
//! This crate provides functionality for:
//! - Discovering migration files on disk (Django `migrations/` packages and
//!   Prisma `migrations/<id>/migration.sql` folders)
//! - Ordering them by dependency graph or by name
//! - Reading the tracking table of the live database
//! - Merging both into per-migration states
//! - Detecting drift between declared models and live tables
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐
//! │ Models/Migs  │────▶│                │
//! │  (on disk)   │     │  Reconcile     │────▶ PassReport
//! ├──────────────┤     │  Engine        │
//! │ Live tables  │────▶│                │
//! │ Tracking tbl │     └────────────────┘
//! └──────────────┘
//! ```
//!
//! Disk parsing runs on the blocking pool while live reads run concurrently,
//! each bounded by the configured query timeout. A failed live read marks the
//! affected entries as unknown instead of failing the pass.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ormsync_migrate::{ReconcileConfig, ReconcileEngine};
//! use ormsync_schema::FsWorkspace;
//!
//! async fn check(channel: Arc<dyn ormsync_migrate::SqlChannel>) {
//!     let engine = ReconcileEngine::new(
//!         ReconcileConfig::new().root("./my-project"),
//!         Arc::new(FsWorkspace::new()),
//!     )
//!     .with_channel(channel);
//!
//!     let report = engine.run_pass().await;
//!     println!("{}", report.summary());
//! }
//! ```

pub mod django;
pub mod drift;
pub mod engine;
pub mod error;
pub mod history;
pub mod introspect;
pub mod migration;
pub mod ordering;
pub mod prisma;
pub mod status;

// Re-exports
pub use django::DjangoMigrations;
pub use drift::{ColumnChange, DriftResult, ModelStatus, detect_drift, model_status};
pub use engine::{
    DEFAULT_QUERY_TIMEOUT, EcosystemReport, ModelReport, PassReport, ReconcileConfig,
    ReconcileEngine,
};
pub use error::{MigrateResult, MigrationError};
pub use history::{AppliedSet, TrackedMigration, get_applied_migrations, tracking_query};
pub use introspect::{LiveColumn, QueryResult, SqlChannel, fetch_columns, table_exists};
pub use migration::{Migration, MigrationParser, MigrationState, find_migrations, parsers_for};
pub use ordering::{LexicalOrdering, OrderingStrategy, TopologicalOrdering};
pub use prisma::PrismaMigrations;
pub use status::{MigrationReconciliation, check_migration_status, reconcile};
