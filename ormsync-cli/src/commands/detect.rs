//! `ormsync detect` command - List the ORMs found in the project.

use std::sync::Arc;

use ormsync_migrate::ReconcileEngine;

use crate::cli::GlobalArgs;
use crate::config::Settings;
use crate::error::CliResult;
use crate::output::{self, kv};

/// Run the detect command
pub async fn run(global: &GlobalArgs) -> CliResult<()> {
    let settings = Settings::resolve(global)?;
    let engine = ReconcileEngine::new(settings.reconcile.clone(), Arc::new(settings.reader()));
    let detected = engine.detect();

    if global.json {
        return output::json(&detected);
    }

    output::header("Detected ORMs");

    if detected.is_empty() {
        output::info("No supported ORM detected");
        return Ok(());
    }

    for config in &detected {
        output::section(&config.display_name);
        if let Some(root) = &config.project_root {
            kv("Project root", &root.display().to_string());
        }
        if let Some(path) = &config.config_path {
            kv("Config", &path.display().to_string());
        }
        kv("Tracking table", engine.config().tracking_table(config.kind));
        output::newline();
    }

    Ok(())
}
