//! Library module for the `pgutil` command-line tool.
//!
//! Argument definitions and command handlers live here so they can be tested
//! without spawning the binary. `main.rs` only parses, initializes logging and
//! maps errors to exit codes.

pub mod output;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use output::{OutputFormat, RowWriter};
use pgutil_core::{
    ConnectionDescriptor, CredentialResolver, EnvMapping, PartialConfig, PgPassFile, PgUtilError,
    RowStreamer,
};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};

/// Exit code for configuration mistakes (missing database, prompt conflicts).
pub const USAGE_EXIT_CODE: u8 = 2;

/// Exit code for every other failure.
pub const FAILURE_EXIT_CODE: u8 = 1;

/// CLI argument structure
#[derive(Debug, Parser)]
#[command(name = "pgutil")]
#[command(about = "Resolve PostgreSQL credentials and stream query results")]
#[command(version)]
#[command(disable_help_flag = true)]
#[command(long_about = "
pgutil - PostgreSQL connection helper

Connection values are taken, per field, from the first source that has one:
  1. command-line flags
  2. environment (PGHOST PGPORT PGDATABASE PGUSER PGPASSWORD PGOPTIONS,
     or DBHOST DBPORT DBNAME DBUSER DBPASS DBOPTIONS with --legacy-env)
  3. defaults (localhost, 5432)

A missing password is looked up in ~/.pgpass (or PGPASSFILE, or --pgpass)
and otherwise prompted for on the terminal unless -w is given.

EXAMPLES:
  pgutil -d inventory conninfo
  pgutil -U c42 -d inventory test
  pgutil -d inventory query 'SELECT * FROM items' --format json
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,

    /// Print help (`-h` selects the host)
    #[arg(long, action = clap::ArgAction::Help)]
    pub help: Option<bool>,
}

/// Logging flags shared by every command.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, help = "Suppress all log output except errors")]
    pub quiet: bool,
}

/// Connection flags. Unset flags fall back to the environment.
#[derive(Debug, Default, Args)]
pub struct ConnectionArgs {
    /// Login role
    #[arg(short = 'U', long, value_name = "USER")]
    pub user: Option<String>,

    /// Password (visible to other local users; prefer ~/.pgpass or the prompt)
    #[arg(long, value_name = "PASSWORD")]
    pub password: Option<String>,

    /// Server host
    #[arg(short = 'h', long, value_name = "HOST")]
    pub host: Option<String>,

    /// Server port
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Database name
    #[arg(short, long = "db", value_name = "DBNAME")]
    pub db: Option<String>,

    /// Extra connection options: `-c name=value` runtime parameters or
    /// name=value pairs (sslmode, application_name, sslrootcert, or any
    /// runtime parameter), separated by spaces
    #[arg(long, value_name = "OPTIONS")]
    pub options: Option<String>,

    /// Never prompt for a password
    #[arg(short = 'w', long)]
    pub no_password: bool,

    /// Always prompt for a password unless one was given
    #[arg(short = 'W', long)]
    pub password_prompt: bool,

    /// Read DBHOST, DBPORT, DBNAME, DBUSER, DBPASS and DBOPTIONS instead of PG*
    #[arg(long)]
    pub legacy_env: bool,

    /// Credential file to use instead of PGPASSFILE or ~/.pgpass
    #[arg(long, value_name = "FILE")]
    pub pgpass: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the resolved connection string (password masked) and value sources
    Conninfo,
    /// Connect and run a trivial query
    Test,
    /// Run a query and stream its rows to stdout
    Query(QueryArgs),
}

/// Arguments for `query`.
#[derive(Debug, Args)]
pub struct QueryArgs {
    /// SQL to execute
    #[arg(value_name = "SQL")]
    pub sql: String,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Tsv)]
    pub format: OutputFormat,

    /// Omit the header line in TSV output
    #[arg(long)]
    pub no_header: bool,
}

impl ConnectionArgs {
    /// The explicitly supplied values.
    pub fn partial_config(&self) -> PartialConfig {
        PartialConfig {
            user: self.user.clone(),
            password: self.password.clone(),
            host: self.host.clone(),
            port: self.port,
            database: self.db.clone(),
            options: self.options.clone(),
            no_password_prompt: self.no_password,
            force_password_prompt: self.password_prompt,
        }
    }

    /// A resolver over the process environment and the terminal, honoring
    /// `--legacy-env` and `--pgpass`.
    pub fn resolver(&self) -> CredentialResolver {
        let mut resolver = CredentialResolver::from_process();
        if self.legacy_env {
            resolver = resolver.with_env_mapping(EnvMapping::legacy());
        }
        if let Some(path) = &self.pgpass {
            resolver = resolver.with_pgpass(PgPassFile::at(path));
        }
        resolver
    }

    /// Resolves the connection descriptor.
    ///
    /// Runs on the blocking pool since resolution may wait on the terminal.
    ///
    /// # Errors
    /// Any resolution error, unchanged.
    pub async fn resolve(&self) -> anyhow::Result<ConnectionDescriptor> {
        let resolver = self.resolver();
        let partial = self.partial_config();
        let descriptor = tokio::task::spawn_blocking(move || resolver.resolve(&partial))
            .await
            .context("credential resolution task failed")??;
        Ok(descriptor)
    }
}

/// Maps an error to the process exit code.
pub fn exit_code(error: &anyhow::Error) -> u8 {
    match error.downcast_ref::<PgUtilError>() {
        Some(e) if e.is_configuration() => USAGE_EXIT_CODE,
        _ => FAILURE_EXIT_CODE,
    }
}

/// Runs the parsed command, writing results to stdout.
///
/// # Errors
/// Resolution, connection, query and output failures.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let descriptor = cli.connection.resolve().await?;
    let stdout = std::io::BufWriter::new(std::io::stdout());

    match cli.command {
        Command::Conninfo => write_conninfo(&descriptor, stdout),
        Command::Test => test_connection(&descriptor, stdout).await,
        Command::Query(args) => run_query(&descriptor, &args, stdout).await,
    }
}

/// Prints the redacted connection string, the port and each field's source.
///
/// # Errors
/// Propagates write failures.
pub fn write_conninfo(descriptor: &ConnectionDescriptor, mut out: impl Write) -> anyhow::Result<()> {
    writeln!(out, "{}", descriptor.redacted_connection_string())?;
    writeln!(out, "port={}", descriptor.port)?;
    for (field, source) in descriptor.sources.iter() {
        writeln!(out, "{field}: {source}")?;
    }
    out.flush()?;
    Ok(())
}

async fn test_connection(descriptor: &ConnectionDescriptor, mut out: impl Write) -> anyhow::Result<()> {
    let pool = descriptor.connect().await?;
    let (_, mut rows) = RowStreamer::new().stream(&pool, "SELECT 1 AS ok").await?;
    let row = rows.next().await.transpose()?;
    drop(rows);
    pool.close().await;

    match row {
        Some(row) if row.get("ok") == Some("1") => {
            writeln!(out, "connection ok: {descriptor}")?;
            out.flush()?;
            Ok(())
        }
        _ => anyhow::bail!("connection test query returned an unexpected result"),
    }
}

async fn run_query(
    descriptor: &ConnectionDescriptor,
    args: &QueryArgs,
    out: impl Write,
) -> anyhow::Result<()> {
    let pool = descriptor.connect().await?;
    info!("Connected to {}", descriptor);

    let (columns, mut rows) = RowStreamer::new().stream(&pool, args.sql.as_str()).await?;
    let mut writer = RowWriter::new(out, args.format);
    if !args.no_header {
        writer.write_header(&columns)?;
    }

    while let Some(row) = rows.next().await {
        writer.write_row(&row?)?;
    }

    let rows_written = writer.rows();
    writer.finish()?;
    drop(rows);
    pool.close().await;

    debug!("Wrote {} rows", rows_written);
    Ok(())
}
