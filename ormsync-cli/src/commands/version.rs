//! `ormsync version` command - Display version information.

use crate::error::CliResult;
use crate::output::{self, kv};

/// Package version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name
const NAME: &str = env!("CARGO_PKG_NAME");

/// Run the version command
pub async fn run() -> CliResult<()> {
    output::header("ormsync");

    kv("Version", VERSION);
    kv("Binary", NAME);

    #[cfg(debug_assertions)]
    let build_mode = "debug";
    #[cfg(not(debug_assertions))]
    let build_mode = "release";

    kv("Build", build_mode);

    let mut features = Vec::new();

    #[cfg(feature = "postgres")]
    features.push("postgres");

    if features.is_empty() {
        features.push("none");
    }

    kv("Features", &features.join(", "));
    kv("ORMs", "Django, Prisma");

    output::newline();
    output::section("Components");
    kv("ormsync-schema", env!("CARGO_PKG_VERSION"));
    kv("ormsync-migrate", env!("CARGO_PKG_VERSION"));

    Ok(())
}
