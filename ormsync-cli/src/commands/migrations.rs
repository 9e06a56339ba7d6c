//! `ormsync migrations` command - List migrations and their state.

use ormsync_migrate::{MigrationReconciliation, MigrationState};
use ormsync_schema::OrmConfig;
use serde::Serialize;

use crate::cli::{GlobalArgs, MigrationsArgs};
use crate::commands;
use crate::error::CliResult;
use crate::output;

#[derive(Debug, Serialize)]
struct MigrationListing<'a> {
    orm: &'a OrmConfig,
    #[serde(flatten)]
    migrations: &'a MigrationReconciliation,
}

/// Run the migrations command
pub async fn run(global: &GlobalArgs, args: MigrationsArgs) -> CliResult<()> {
    let report = commands::run_migrations_pass(global, args.kind).await?;

    if global.json {
        let listing: Vec<_> = report
            .ecosystems
            .iter()
            .map(|e| MigrationListing {
                orm: &e.config,
                migrations: &e.migrations,
            })
            .collect();
        return output::json(&listing);
    }

    output::header("Migrations");

    if report.ecosystems.is_empty() {
        output::info("No supported ORM detected");
        return Ok(());
    }

    for ecosystem in &report.ecosystems {
        let reconciliation = &ecosystem.migrations;
        output::section(&format!(
            "{} ({} on disk)",
            ecosystem.config.display_name,
            reconciliation.migrations.len()
        ));

        let mut shown = 0;
        for (id, state) in &reconciliation.statuses {
            if args.pending && matches!(state, MigrationState::Applied | MigrationState::External) {
                continue;
            }
            output::list_item(&format!("{}  {}", output::migration_state(*state), id));
            shown += 1;
        }
        if shown == 0 {
            output::success("All migrations applied");
        }
        if let Some(error) = &reconciliation.error {
            output::warn(&format!("Applied state unknown: {error}"));
        }
        output::newline();
    }

    for warning in &report.warnings {
        output::warn(warning);
    }

    Ok(())
}
