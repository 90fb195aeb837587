//! PostgreSQL connection helper.
//!
//! Resolves connection credentials from flags, the environment, `~/.pgpass`
//! and the terminal, then reports, tests or queries the target database.
//!
//! # Security Guarantees
//! - Passwords are never logged or printed
//! - Query results go to stdout, diagnostics to stderr

use clap::Parser;
use pgutil::{Cli, FAILURE_EXIT_CODE, exit_code, run};
use pgutil_core::init_logging;
use std::process::ExitCode;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.global.verbose, cli.global.quiet) {
        eprintln!("pgutil: {e}");
        return ExitCode::from(FAILURE_EXIT_CODE);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}
