//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use ormsync_schema::OrmKind;
use std::path::PathBuf;

/// ormsync - Compare ORM models and migrations with a live database
#[derive(Parser, Debug)]
#[command(name = "ormsync")]
#[command(author = "Pegasus Heavy Industries LLC")]
#[command(version)]
#[command(
    about = "ormsync - Compare ORM models and migrations with a live database",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Options shared by every command
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Detect the ORMs used in the project
    Detect,

    /// List declared models
    Models(ModelsArgs),

    /// List migrations in apply order with their state
    Migrations(MigrationsArgs),

    /// Compare models and migrations with the live database
    Status(StatusArgs),

    /// Display version information
    Version,
}

/// Options shared by every command
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Project root to scan
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Database connection URL
    #[arg(long, global = true, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Database schema holding the tables
    #[arg(long, global = true)]
    pub schema: Option<String>,

    /// Path to schema.prisma, relative to the root
    #[arg(long, global = true)]
    pub prisma_schema: Option<PathBuf>,

    /// Timeout for each database query, in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// ORM selector
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindArg {
    Django,
    Prisma,
}

impl From<KindArg> for OrmKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Django => OrmKind::Django,
            KindArg::Prisma => OrmKind::Prisma,
        }
    }
}

/// Arguments for the `models` command
#[derive(Args, Debug, Default)]
pub struct ModelsArgs {
    /// Only list models of this ORM
    #[arg(short, long)]
    pub kind: Option<KindArg>,

    /// Show the fields of each model
    #[arg(short, long)]
    pub fields: bool,
}

/// Arguments for the `migrations` command
#[derive(Args, Debug, Default)]
pub struct MigrationsArgs {
    /// Only list migrations of this ORM
    #[arg(short, long)]
    pub kind: Option<KindArg>,

    /// Only list migrations that are not applied
    #[arg(short, long)]
    pub pending: bool,
}

/// Arguments for the `status` command
#[derive(Args, Debug, Default)]
pub struct StatusArgs {
    /// Only report this ORM
    #[arg(short, long)]
    pub kind: Option<KindArg>,

    /// Exit with an error when models or migrations need attention
    #[arg(long)]
    pub check: bool,
}
