//! Logging setup for the CLI.
//!
//! # Environment Variables
//!
//! - `ORMSYNC_DEBUG=true` - Enable debug logging
//! - `ORMSYNC_LOG_LEVEL=debug|info|warn|error|trace` - Set specific log level
//! - `ORMSYNC_LOG_FORMAT=json|pretty|compact` - Set output format (default: compact)
//!
//! Logs go to stderr so `--json` output on stdout stays parseable.

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Check if debug logging is enabled via `ORMSYNC_DEBUG`.
pub fn is_debug_enabled() -> bool {
    env::var("ORMSYNC_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Log level from `ORMSYNC_LOG_LEVEL`.
///
/// Defaults to "debug" if `ORMSYNC_DEBUG` is enabled, otherwise "warn".
pub fn get_log_level() -> &'static str {
    let fallback = if is_debug_enabled() { "debug" } else { "warn" };
    match env::var("ORMSYNC_LOG_LEVEL") {
        Ok(level) => match level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

/// Log format from `ORMSYNC_LOG_FORMAT`.
pub fn get_log_format() -> &'static str {
    env::var("ORMSYNC_LOG_FORMAT")
        .map(|f| match f.to_lowercase().as_str() {
            "json" => "json",
            "pretty" => "pretty",
            _ => "compact",
        })
        .unwrap_or("compact")
}

/// Initialize logging once per process. `verbose` forces debug level.
pub fn init(verbose: bool) {
    INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        let level = if verbose { "debug" } else { get_log_level() };
        let filter = EnvFilter::try_new(format!(
            "ormsync={level},ormsync_schema={level},ormsync_migrate={level},ormsync_cli={level}"
        ))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

        let layer = fmt::layer().with_writer(std::io::stderr);
        match get_log_format() {
            "json" => tracing_subscriber::registry()
                .with(filter)
                .with(layer.json())
                .init(),
            "pretty" => tracing_subscriber::registry()
                .with(filter)
                .with(layer.pretty())
                .init(),
            _ => tracing_subscriber::registry()
                .with(filter)
                .with(layer.compact())
                .init(),
        }

        tracing::debug!(level, format = get_log_format(), "logging initialized");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_default() {
        // SAFETY: Test runs in isolation
        unsafe {
            env::remove_var("ORMSYNC_DEBUG");
            env::remove_var("ORMSYNC_LOG_LEVEL");
        }
        assert!(!is_debug_enabled());
        assert_eq!(get_log_level(), "warn");
    }
}
