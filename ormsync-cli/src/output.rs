//! Styled terminal output utilities.

use owo_colors::OwoColorize;
use serde::Serialize;

use ormsync_migrate::{MigrationState, ModelStatus};

use crate::error::CliResult;

/// Print a header/title
pub fn header(text: &str) {
    println!();
    println!("{}", text.bold().cyan());
    println!("{}", "─".repeat(text.chars().count()).dimmed());
    println!();
}

/// Print a section header
pub fn section(text: &str) {
    println!("{}", text.bold().white());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Print a success message
pub fn success(text: &str) {
    println!("{} {}", "✔".green().bold(), text.green());
}

/// Print an info message
pub fn info(text: &str) {
    println!("{} {}", "ℹ".blue().bold(), text);
}

/// Print a warning message
pub fn warn(text: &str) {
    println!("{} {}", "⚠".yellow().bold(), text.yellow());
}

/// Print an error message
pub fn error(text: &str) {
    eprintln!("{} {}", "✖".red().bold(), text.red());
}

/// Print a list item
pub fn list_item(text: &str) {
    println!("  {} {}", "•".dimmed(), text);
}

/// Print a nested list item
pub fn sub_item(text: &str) {
    println!("      {}", text.dimmed());
}

/// Print a newline
pub fn newline() {
    println!();
}

/// Print a value as pretty JSON
pub fn json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Glyph and colour for a model status
pub fn model_status(status: ModelStatus) -> String {
    match status {
        ModelStatus::Synced => format!("{} {}", "✔".green(), "synced".green()),
        ModelStatus::Changed => format!("{} {}", "~".yellow(), "changed".yellow()),
        ModelStatus::Missing => format!("{} {}", "+".red(), "missing".red()),
        ModelStatus::Unknown => format!("{} {}", "?".dimmed(), "unknown".dimmed()),
    }
}

/// Glyph and colour for a migration state
pub fn migration_state(state: MigrationState) -> String {
    match state {
        MigrationState::Applied => format!("{} {}", "✔".green(), "applied".green()),
        MigrationState::Pending => format!("{} {}", "○".yellow(), "pending".yellow()),
        MigrationState::Failed => format!("{} {}", "✖".red(), "failed".red()),
        MigrationState::AppliedNotOnDisk => {
            format!("{} {}", "!".red(), "applied, not on disk".red())
        }
        MigrationState::External => format!("{} {}", "✔".dimmed(), "applied, external app".dimmed()),
        MigrationState::Unknown => format!("{} {}", "?".dimmed(), "unknown".dimmed()),
    }
}
