//! # ormsync-schema
//!
//! ORM detection and model parsing for ormsync.
//!
//! This crate provides:
//! - Detection of Django and Prisma projects inside a workspace
//! - Parsers that turn `models.py` modules and `schema.prisma` files into
//!   one canonical [`Model`] representation
//! - Mapping of declared and live SQL types to [`CanonicalType`] families
//!
//! ## Example
//!
//! ```rust,ignore
//! use ormsync_schema::{FsWorkspace, detect_orms, find_models};
//!
//! let reader = FsWorkspace::new();
//! for config in detect_orms(&reader, "/srv/app".as_ref()) {
//!     let models = find_models(&reader, &config);
//!     println!("{}: {} models", config.display_name, models.len());
//! }
//! ```

pub mod detect;
pub mod error;
pub mod model;
pub mod parser;
pub mod typemap;
pub mod workspace;

pub use detect::{Detector, detect_orms, prisma_project_root};
pub use error::{SchemaError, SchemaResult};
pub use model::{App, CanonicalType, Model, ModelField, OrmConfig, OrmKind};
pub use parser::django::find_apps;
pub use parser::{PrismaSchema, find_models, parse_prisma_schema};
pub use workspace::{FsWorkspace, WorkspaceReader};
