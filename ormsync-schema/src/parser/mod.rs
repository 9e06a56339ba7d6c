//! Model parsers for each supported ecosystem.

pub mod django;
mod grammar;
pub mod prisma;
pub mod python;

use crate::model::{Model, OrmConfig, OrmKind};
use crate::workspace::WorkspaceReader;

pub use grammar::{PrismaParser, Rule};
pub use prisma::{PrismaSchema, parse_prisma_schema};

/// Find all models declared by the detected ORM.
///
/// Parse failures degrade to fewer models, never to an error. Repeated calls
/// over unchanged files return equal results.
pub fn find_models(reader: &dyn WorkspaceReader, config: &OrmConfig) -> Vec<Model> {
    let models = match config.kind {
        OrmKind::Django => django::find_models(reader, config),
        OrmKind::Prisma => prisma::find_models(reader, config),
    };
    tracing::debug!(kind = %config.kind, count = models.len(), "parsed models");
    models
}
