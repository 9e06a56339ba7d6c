//! CLI configuration handling.
//!
//! `ormsync.toml` is optional. Command-line flags override it, and string
//! values may reference environment variables as `${VAR}` or `$VAR`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use ormsync_migrate::{DEFAULT_QUERY_TIMEOUT, ReconcileConfig};
use ormsync_schema::FsWorkspace;
use regex_lite::Regex;

use crate::cli::GlobalArgs;
use crate::error::CliResult;

/// Default config file name (lives in project root)
pub const CONFIG_FILE_NAME: &str = "ormsync.toml";

static BRACED_VAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());
static BARE_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([A-Z_][A-Z0-9_]*)").unwrap());

/// ormsync CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Django configuration
    pub django: DjangoConfig,

    /// Prisma configuration
    pub prisma: PrismaConfig,

    /// Workspace scanning configuration
    pub workspace: WorkspaceConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `ormsync.toml` from the project root, or the defaults if absent.
    pub fn load_or_default(root: &Path) -> CliResult<Self> {
        let path = root.join(CONFIG_FILE_NAME);
        if path.exists() {
            tracing::debug!(path = %path.display(), "loading config");
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub url: Option<String>,

    /// Schema holding the tables
    pub schema: String,

    /// Timeout for each query, in seconds
    pub query_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            schema: "public".to_string(),
            query_timeout_secs: DEFAULT_QUERY_TIMEOUT.as_secs(),
        }
    }
}

/// Django configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DjangoConfig {
    /// Migration tracking table
    pub tracking_table: String,
}

impl Default for DjangoConfig {
    fn default() -> Self {
        Self {
            tracking_table: "django_migrations".to_string(),
        }
    }
}

/// Prisma configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrismaConfig {
    /// Migration tracking table
    pub tracking_table: String,

    /// Path to schema.prisma, relative to the project root
    pub schema_path: Option<PathBuf>,
}

impl Default for PrismaConfig {
    fn default() -> Self {
        Self {
            tracking_table: "_prisma_migrations".to_string(),
            schema_path: None,
        }
    }
}

/// Workspace scanning configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Extra directories to skip
    pub ignore_dirs: Vec<String>,

    /// Maximum directory depth
    pub max_depth: Option<usize>,
}

/// Effective settings: config file merged with command-line flags.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Library configuration for the reconciliation engine
    pub reconcile: ReconcileConfig,

    /// Database URL, if any
    pub database_url: Option<String>,

    /// Workspace scanning configuration
    pub workspace: WorkspaceConfig,
}

impl Settings {
    /// Resolve settings for a command invocation.
    pub fn resolve(args: &GlobalArgs) -> CliResult<Self> {
        let config = Config::load_or_default(&args.root)?;
        Ok(Self::merge(config, args))
    }

    /// Merge a loaded config with command-line flags. Flags win.
    pub fn merge(config: Config, args: &GlobalArgs) -> Self {
        let timeout_secs = args.timeout.unwrap_or(config.database.query_timeout_secs);

        let mut reconcile = ReconcileConfig::new()
            .root(&args.root)
            .query_timeout(Duration::from_secs(timeout_secs))
            .database_schema(
                args.schema
                    .clone()
                    .unwrap_or_else(|| expand_env_var(&config.database.schema)),
            )
            .django_tracking_table(config.django.tracking_table)
            .prisma_tracking_table(config.prisma.tracking_table);

        if let Some(path) = args.prisma_schema.clone().or(config.prisma.schema_path) {
            reconcile = reconcile.prisma_schema(path);
        }

        let database_url = args
            .database_url
            .clone()
            .or_else(|| config.database.url.as_deref().map(expand_env_var))
            .filter(|url| !url.is_empty() && !url.contains("${"));

        Self {
            reconcile,
            database_url,
            workspace: config.workspace,
        }
    }

    /// Filesystem reader configured for this workspace.
    pub fn reader(&self) -> FsWorkspace {
        let reader = FsWorkspace::new().ignore_dirs(self.workspace.ignore_dirs.iter().cloned());
        match self.workspace.max_depth {
            Some(depth) => reader.max_depth(depth),
            None => reader,
        }
    }
}

/// Expand environment variables in a string
pub fn expand_env_var(s: &str) -> String {
    let mut result = s.to_string();

    for cap in BRACED_VAR.captures_iter(s) {
        if let Ok(value) = std::env::var(&cap[1]) {
            result = result.replace(&cap[0], &value);
        }
    }

    for cap in BARE_VAR.captures_iter(&result.clone()) {
        if let Ok(value) = std::env::var(&cap[1]) {
            result = result.replace(&cap[0], &value);
        }
    }

    result
}
