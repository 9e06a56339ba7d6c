//! `ormsync status` command - Compare models and migrations with the database.

use ormsync_migrate::{EcosystemReport, MigrationState, ModelReport, ModelStatus, PassReport};

use crate::cli::{GlobalArgs, StatusArgs};
use crate::commands;
use crate::error::{CliError, CliResult};
use crate::output::{self, kv};

/// Run the status command
pub async fn run(global: &GlobalArgs, args: StatusArgs) -> CliResult<()> {
    let report = commands::run_pass(global, args.kind).await?;

    if global.json {
        output::json(&report)?;
    } else {
        print_report(&report);
    }

    if args.check && report.has_changes() {
        return Err(CliError::Command(
            "models or migrations are out of sync with the database".to_string(),
        ));
    }
    Ok(())
}

fn print_report(report: &PassReport) {
    output::header("Status");
    kv("Root", &report.root.display().to_string());
    output::newline();

    if report.ecosystems.is_empty() {
        output::info("No supported ORM detected");
        return;
    }

    for ecosystem in &report.ecosystems {
        print_ecosystem(ecosystem);
    }

    for warning in &report.warnings {
        output::warn(warning);
    }
    if !report.warnings.is_empty() {
        output::newline();
    }

    if report.has_changes() {
        output::warn(&report.summary());
    } else {
        output::success(&report.summary());
    }
}

fn print_ecosystem(ecosystem: &EcosystemReport) {
    output::section(&ecosystem.config.display_name);

    for model in &ecosystem.models {
        output::list_item(&format!(
            "{}  {} ({})",
            output::model_status(model.status),
            model.model.name,
            model.model.table_name
        ));
        for line in drift_lines(model) {
            output::sub_item(&line);
        }
    }

    let migrations = &ecosystem.migrations;
    output::newline();
    kv("Applied", &migrations.count(MigrationState::Applied).to_string());
    kv("Pending", &migrations.count(MigrationState::Pending).to_string());
    if migrations.count(MigrationState::Failed) > 0 {
        kv("Failed", &migrations.count(MigrationState::Failed).to_string());
    }
    if !migrations.external.is_empty() {
        kv("External", &migrations.external.len().to_string());
    }
    for id in migrations.in_state(MigrationState::Pending) {
        output::sub_item(&format!("pending: {id}"));
    }
    for row in &migrations.applied_not_on_disk {
        output::sub_item(&format!("applied, not on disk: {}", row.id));
    }
    output::newline();
}

/// Human-readable drift details of one model.
fn drift_lines(report: &ModelReport) -> Vec<String> {
    if report.status != ModelStatus::Changed {
        return Vec::new();
    }
    let Some(drift) = &report.drift else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    for field in &drift.missing_columns {
        lines.push(format!(
            "missing column {}",
            field.column_name().unwrap_or(field.name.as_str())
        ));
    }
    for change in &drift.changed_columns {
        lines.push(format!(
            "{}: {} {} in models, {} {} in database",
            change.name,
            change.declared_type,
            nullability(change.declared_nullable),
            change.live_type,
            nullability(change.live_nullable),
        ));
    }
    lines
}

fn nullability(nullable: bool) -> &'static str {
    if nullable { "NULL" } else { "NOT NULL" }
}
