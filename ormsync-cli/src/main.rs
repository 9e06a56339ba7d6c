//! ormsync CLI - Command-line interface for ormsync.

use clap::Parser;

use ormsync_cli::cli::{Cli, Command};
use ormsync_cli::commands;
use ormsync_cli::error::CliResult;
use ormsync_cli::{logging, output};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        output::newline();
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();
    logging::init(cli.global.verbose);

    match cli.command {
        Command::Detect => commands::detect::run(&cli.global).await,
        Command::Models(args) => commands::models::run(&cli.global, args).await,
        Command::Migrations(args) => commands::migrations::run(&cli.global, args).await,
        Command::Status(args) => commands::status::run(&cli.global, args).await,
        Command::Version => commands::version::run().await,
    }
}
