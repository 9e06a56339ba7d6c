//! # ormsync
//!
//! Compare what an ORM project declares with what a live database holds.
//!
//! ormsync provides:
//! - Detection of Django and Prisma projects in a workspace
//! - Parsing of model declarations into a common model shape
//! - Discovery and ordering of migration files
//! - Reconciliation of migrations against the tracking table
//! - Schema drift detection between models and live tables
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ormsync::prelude::*;
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = ReconcileEngine::new(
//!         ReconcileConfig::new().root("."),
//!         Arc::new(FsWorkspace::new()),
//!     );
//!
//!     let report = engine.run_pass().await;
//!     for ecosystem in &report.ecosystems {
//!         for model in &ecosystem.models {
//!             println!("{} {}", model.model.table_name, model.status);
//!         }
//!     }
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// ORM detection, model parsing and workspace access.
pub mod schema {
    pub use ormsync_schema::*;
}

/// Migration discovery, status and drift reconciliation.
pub mod migrate {
    pub use ormsync_migrate::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::migrate::{
        DriftResult, MigrationState, ModelStatus, PassReport, ReconcileConfig, ReconcileEngine,
        SqlChannel,
    };
    pub use crate::schema::{FsWorkspace, Model, OrmConfig, OrmKind, WorkspaceReader};
}

// Re-export key types at the crate root
pub use migrate::{MigrationError, PassReport, ReconcileEngine};
pub use schema::{OrmKind, SchemaError};
