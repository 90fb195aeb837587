//! The resolved connection descriptor.

use crate::error::{PgUtilError, Result};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use zeroize::Zeroizing;

#[cfg(feature = "postgresql")]
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
#[cfg(feature = "postgresql")]
use std::time::Duration;

/// Host used when no source names one.
pub const DEFAULT_HOST: &str = "localhost";

/// Port used when no source names one.
pub const DEFAULT_PORT: u16 = 5432;

#[cfg(feature = "postgresql")]
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Application name reported to the server unless `options` sets one.
pub const APPLICATION_NAME: &str = "pgutil";

/// Where a resolved connection field came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ValueSource {
    /// No source provided a value
    #[default]
    Unset,
    /// Supplied explicitly by the caller
    Explicit,
    /// Read from the named environment variable
    Environment(String),
    /// Built-in default
    Default,
    /// Found in the credential file at this path
    CredentialFile(PathBuf),
    /// Typed in at the interactive prompt
    Prompt,
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => write!(f, "unset"),
            Self::Explicit => write!(f, "explicit"),
            Self::Environment(var) => write!(f, "environment ({var})"),
            Self::Default => write!(f, "default"),
            Self::CredentialFile(path) => write!(f, "credential file ({})", path.display()),
            Self::Prompt => write!(f, "prompt"),
        }
    }
}

/// Per-field record of which source won.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldSources {
    /// Source of `host`
    pub host: ValueSource,
    /// Source of `port`
    pub port: ValueSource,
    /// Source of `database`
    pub database: ValueSource,
    /// Source of `user`
    pub user: ValueSource,
    /// Source of `password`
    pub password: ValueSource,
    /// Source of `options`
    pub options: ValueSource,
}

impl FieldSources {
    /// Field names paired with their sources, in connection-string order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ValueSource)> {
        [
            ("user", &self.user),
            ("host", &self.host),
            ("port", &self.port),
            ("dbname", &self.database),
            ("password", &self.password),
            ("options", &self.options),
        ]
        .into_iter()
    }
}

/// Everything needed to open a connection.
///
/// # Security
/// The password is stored in a `Zeroizing` container, skipped during
/// serialization, and omitted from `Display` and `Debug`.
///
/// # Example
/// ```rust
/// use pgutil_core::config::ConnectionDescriptor;
///
/// let descriptor = ConnectionDescriptor::new("inventory")
///     .with_user("c42")
///     .with_password("secret");
///
/// assert_eq!(
///     descriptor.connection_string(),
///     "user=c42 host=localhost dbname=inventory password=secret"
/// );
/// assert!(!descriptor.to_string().contains("secret"));
/// ```
#[derive(Clone, Serialize)]
pub struct ConnectionDescriptor {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Database name
    pub database: String,
    /// Login role
    pub user: String,
    /// Password (zeroed on drop)
    #[serde(skip)]
    pub password: Zeroizing<String>,
    /// Free-form driver options, appended verbatim to the connection string
    pub options: String,
    /// Which source supplied each field
    pub sources: FieldSources,
}

impl Default for ConnectionDescriptor {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database: String::new(),
            user: String::new(),
            password: Zeroizing::new(String::new()),
            options: String::new(),
            sources: FieldSources {
                host: ValueSource::Default,
                port: ValueSource::Default,
                ..FieldSources::default()
            },
        }
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConnectionDescriptor({}:{}/{})",
            self.host, self.port, self.database
        )
        // Username and credentials intentionally omitted
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("has_password", &self.has_password())
            .field("options", &self.options)
            .field("sources", &self.sources)
            .finish()
    }
}

impl ConnectionDescriptor {
    /// Creates a descriptor for `database` with default host and port.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            sources: FieldSources {
                database: ValueSource::Explicit,
                ..Self::default().sources
            },
            ..Self::default()
        }
    }

    /// Builder method to set host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self.sources.host = ValueSource::Explicit;
        self
    }

    /// Builder method to set port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self.sources.port = ValueSource::Explicit;
        self
    }

    /// Builder method to set user.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self.sources.user = ValueSource::Explicit;
        self
    }

    /// Builder method to set password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Zeroizing::new(password.into());
        self.sources.password = ValueSource::Explicit;
        self
    }

    /// Builder method to set driver options.
    pub fn with_options(mut self, options: impl Into<String>) -> Self {
        self.options = options.into();
        self.sources.options = ValueSource::Explicit;
        self
    }

    /// The password, if any. Do not log the returned value.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }

    /// Checks if a password is present without exposing it.
    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }

    /// Validates that the descriptor can be used to connect.
    ///
    /// # Errors
    /// `MissingDatabase` if no database is named, `Configuration` for an
    /// empty host or a zero port.
    pub fn validate(&self) -> Result<()> {
        if self.database.is_empty() {
            return Err(PgUtilError::MissingDatabase);
        }

        if self.host.is_empty() {
            return Err(PgUtilError::configuration("host cannot be empty"));
        }

        if self.port == 0 {
            return Err(PgUtilError::configuration("port must be greater than 0"));
        }

        Ok(())
    }

    /// Serializes the descriptor into a key/value connection string.
    ///
    /// The order is fixed (`user`, `host`, `dbname`, `password`) with single
    /// spaces, followed by `options` verbatim when it is non-empty. The port is
    /// not part of this string.
    pub fn connection_string(&self) -> String {
        self.render(self.password.as_str())
    }

    /// Same shape as [`Self::connection_string`] with the password masked.
    pub fn redacted_connection_string(&self) -> String {
        self.render("****")
    }

    fn render(&self, password: &str) -> String {
        let mut rendered = format!(
            "user={} host={} dbname={} password={}",
            self.user, self.host, self.database, password
        );
        if !self.options.is_empty() {
            rendered.push(' ');
            rendered.push_str(&self.options);
        }
        rendered
    }

    /// Builds driver connect options from the descriptor.
    ///
    /// Host, port, database, user and password are always taken from the
    /// descriptor, even when empty, so the driver's own `PG*` lookups never
    /// change who connects where. TLS mode and application name are reset to
    /// `prefer` and [`APPLICATION_NAME`] before `options` is applied.
    ///
    /// `options` accepts libpq `PGOPTIONS` syntax and plain pairs, freely
    /// mixed and separated by whitespace:
    ///
    /// - `-c name=value`, `-cname=value` or `--name=value`: server runtime
    ///   parameter
    /// - `sslmode=..`, `application_name=..`, `sslrootcert=..`: driver setting
    /// - any other `name=value`: server runtime parameter
    ///
    /// The driver always forwards a `PGOPTIONS` found in the process
    /// environment and offers no way to drop it, so one is accepted only when
    /// it is already in `-c` form and sets exactly the runtime parameters
    /// resolved here. The driver also keeps reading `PGSSLROOTCERT`,
    /// `PGSSLCERT` and `PGSSLKEY` for TLS file locations.
    ///
    /// # Errors
    /// `Configuration` for a malformed token, an unknown `sslmode`, or a
    /// conflicting `PGOPTIONS` in the process environment.
    #[cfg(feature = "postgresql")]
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        let mut options = PgConnectOptions::new_without_pgpass()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.user)
            .password(self.password.as_str())
            .ssl_mode(PgSslMode::Prefer)
            .application_name(APPLICATION_NAME);

        let mut runtime = Vec::new();
        for option in parse_connect_options(&self.options)? {
            match option {
                ConnectOption::Runtime { name, value, .. } => runtime.push((name, value)),
                ConnectOption::Driver { name: "sslmode", value } => {
                    options = options.ssl_mode(value.parse().map_err(|e| {
                        PgUtilError::configuration(format!("invalid sslmode '{value}': {e}"))
                    })?);
                }
                ConnectOption::Driver { name: "sslrootcert", value } => {
                    options = options.ssl_root_cert(value);
                }
                ConnectOption::Driver { value, .. } => options = options.application_name(value),
            }
        }

        match options.get_options().map(str::to_owned) {
            None if runtime.is_empty() => Ok(options),
            None => Ok(options.options(runtime)),
            Some(inherited) if inherits_same_runtime(&inherited, &runtime) => Ok(options),
            Some(inherited) => Err(PgUtilError::configuration(format!(
                "PGOPTIONS='{inherited}' in the environment is always sent by the driver and \
                 differs from the resolved options; unset it or pass the same -c settings"
            ))),
        }
    }

    /// Opens a single-connection pool to the described database.
    ///
    /// # Errors
    /// Fails validation, option parsing, or the connection attempt. The error
    /// context names the target without credentials.
    #[cfg(feature = "postgresql")]
    pub async fn connect(&self) -> Result<PgPool> {
        self.validate()?;
        let options = self.connect_options()?;

        tracing::debug!("Connecting to {}", self);

        PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(CONNECT_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| PgUtilError::connection_failed(format!("could not connect to {self}"), e))
    }
}

/// One token group of the `options` string.
#[cfg(feature = "postgresql")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectOption<'a> {
    Driver {
        name: &'a str,
        value: &'a str,
    },
    Runtime {
        name: &'a str,
        value: &'a str,
        flag_form: bool,
    },
}

#[cfg(feature = "postgresql")]
const DRIVER_OPTIONS: [&str; 3] = ["sslmode", "application_name", "sslrootcert"];

#[cfg(feature = "postgresql")]
fn parse_connect_options(raw: &str) -> Result<Vec<ConnectOption<'_>>> {
    let mut parsed = Vec::new();
    let mut tokens = raw.split_whitespace();

    while let Some(token) = tokens.next() {
        let (pair, flag_form) = if token == "-c" {
            let pair = tokens.next().ok_or_else(|| {
                PgUtilError::configuration("connection option '-c' is missing name=value")
            })?;
            (pair, true)
        } else if let Some(pair) = token.strip_prefix("--") {
            (pair, true)
        } else if let Some(pair) = token.strip_prefix("-c") {
            (pair, true)
        } else {
            (token, false)
        };

        let (name, value) = pair
            .split_once('=')
            .filter(|(name, _)| !name.is_empty())
            .ok_or_else(|| {
                PgUtilError::configuration(format!(
                    "connection option '{token}' is not of the form name=value"
                ))
            })?;

        parsed.push(if !flag_form && DRIVER_OPTIONS.contains(&name) {
            ConnectOption::Driver { name, value }
        } else {
            ConnectOption::Runtime {
                name,
                value,
                flag_form,
            }
        });
    }

    Ok(parsed)
}

/// Whether an inherited `PGOPTIONS` string, sent verbatim by the driver,
/// sets exactly `runtime` using only `-c` forms the server understands.
#[cfg(feature = "postgresql")]
fn inherits_same_runtime(inherited: &str, runtime: &[(&str, &str)]) -> bool {
    let Ok(parsed) = parse_connect_options(inherited) else {
        return false;
    };

    let mut inherited_runtime = Vec::with_capacity(parsed.len());
    for option in parsed {
        match option {
            ConnectOption::Runtime {
                name,
                value,
                flag_form: true,
            } => inherited_runtime.push((name, value)),
            _ => return false,
        }
    }
    inherited_runtime == runtime
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_defaults() {
        let descriptor = ConnectionDescriptor::default();
        assert_eq!(descriptor.host, "localhost");
        assert_eq!(descriptor.port, 5432);
        assert!(descriptor.database.is_empty());
        assert!(!descriptor.has_password());
        assert_eq!(descriptor.sources.host, ValueSource::Default);
        assert_eq!(descriptor.sources.password, ValueSource::Unset);
    }

    #[test]
    fn test_connection_string_order() {
        let descriptor = ConnectionDescriptor::new("inventory")
            .with_host("db.internal")
            .with_user("c42")
            .with_password("pw");

        assert_eq!(
            descriptor.connection_string(),
            "user=c42 host=db.internal dbname=inventory password=pw"
        );
    }

    #[test]
    fn test_connection_string_without_options_has_no_trailing_separator() {
        let descriptor = ConnectionDescriptor::new("inventory").with_user("c42");
        let rendered = descriptor.connection_string();
        assert!(!rendered.ends_with(' '));
        assert_eq!(rendered.split(' ').count(), 4);
    }

    #[test]
    fn test_connection_string_appends_options_once() {
        let descriptor = ConnectionDescriptor::new("inventory")
            .with_user("c42")
            .with_options("sslmode=disable");

        assert_eq!(
            descriptor.connection_string(),
            "user=c42 host=localhost dbname=inventory password= sslmode=disable"
        );
    }

    #[test]
    fn test_redacted_connection_string() {
        let descriptor = ConnectionDescriptor::new("inventory")
            .with_user("c42")
            .with_password("lKj*$hL;(~");

        let redacted = descriptor.redacted_connection_string();
        assert!(!redacted.contains("lKj*$hL;(~"));
        assert!(redacted.contains("password=****"));
    }

    #[test]
    fn test_display_and_debug_hide_credentials() {
        let descriptor = ConnectionDescriptor::new("inventory")
            .with_host("db.internal")
            .with_port(6543)
            .with_user("testuser")
            .with_password("hunter2");

        let display = format!("{descriptor}");
        assert!(display.contains("db.internal"));
        assert!(display.contains("6543"));
        assert!(display.contains("inventory"));
        assert!(!display.contains("testuser"));
        assert!(!display.contains("hunter2"));

        let debug = format!("{descriptor:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("has_password: true"));
    }

    #[test]
    fn test_serialization_skips_password() {
        let descriptor = ConnectionDescriptor::new("inventory").with_password("hunter2");
        let json = serde_json::to_string(&descriptor).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(json.contains("\"database\":\"inventory\""));
    }

    #[test]
    fn test_descriptor_validation() {
        assert!(ConnectionDescriptor::new("inventory").validate().is_ok());

        assert!(matches!(
            ConnectionDescriptor::default().validate(),
            Err(PgUtilError::MissingDatabase)
        ));

        let descriptor = ConnectionDescriptor::new("inventory").with_host("");
        assert!(matches!(
            descriptor.validate(),
            Err(PgUtilError::Configuration { .. })
        ));

        let descriptor = ConnectionDescriptor::new("inventory").with_port(0);
        assert!(descriptor.validate().is_err());
    }

    #[test]
    fn test_value_source_display() {
        assert_eq!(ValueSource::Explicit.to_string(), "explicit");
        assert_eq!(
            ValueSource::Environment("PGHOST".to_string()).to_string(),
            "environment (PGHOST)"
        );
        assert_eq!(
            ValueSource::CredentialFile(PathBuf::from("/tmp/.pgpass")).to_string(),
            "credential file (/tmp/.pgpass)"
        );
    }

    #[test]
    fn test_field_sources_order() {
        let names: Vec<_> = FieldSources::default().iter().map(|(name, _)| name).collect();
        assert_eq!(
            names,
            ["user", "host", "port", "dbname", "password", "options"]
        );
    }

    /// Variables the driver reads on its own when building connect options.
    #[cfg(feature = "postgresql")]
    const DRIVER_VARS: [&str; 8] = [
        "PGHOST",
        "PGPORT",
        "PGDATABASE",
        "PGUSER",
        "PGPASSWORD",
        "PGSSLMODE",
        "PGAPPNAME",
        "PGOPTIONS",
    ];

    /// Runs `f` with the driver's variables cleared, then `vars` applied.
    #[cfg(feature = "postgresql")]
    fn with_driver_env<R>(vars: &[(&str, &str)], f: impl FnOnce() -> R) -> R {
        let mut all: Vec<(&str, Option<&str>)> =
            DRIVER_VARS.iter().map(|name| (*name, None)).collect();
        all.extend(vars.iter().map(|(name, value)| (*name, Some(*value))));
        temp_env::with_vars(all, f)
    }

    #[cfg(feature = "postgresql")]
    #[test]
    fn test_connect_options_parses_driver_options() {
        let descriptor = ConnectionDescriptor::new("inventory")
            .with_host("db.internal")
            .with_port(6543)
            .with_user("c42")
            .with_options("sslmode=disable application_name=nightly-export");

        let options = with_driver_env(&[], || descriptor.connect_options()).unwrap();
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 6543);
        assert_eq!(options.get_database(), Some("inventory"));
        assert_eq!(options.get_username(), "c42");
        assert_eq!(options.get_application_name(), Some("nightly-export"));
        assert!(matches!(options.get_ssl_mode(), PgSslMode::Disable));
        assert_eq!(options.get_options(), None);
    }

    #[cfg(feature = "postgresql")]
    #[test]
    fn test_connect_options_runtime_parameter_forms() {
        for raw in [
            "-c statement_timeout=5000",
            "-cstatement_timeout=5000",
            "--statement_timeout=5000",
            "statement_timeout=5000",
        ] {
            let descriptor = ConnectionDescriptor::new("inventory").with_options(raw);
            let options = with_driver_env(&[], || descriptor.connect_options()).unwrap();
            assert_eq!(
                options.get_options(),
                Some("-c statement_timeout=5000"),
                "options {raw:?}"
            );
        }
    }

    #[cfg(feature = "postgresql")]
    #[test]
    fn test_connect_options_mixed_forms() {
        let descriptor = ConnectionDescriptor::new("inventory")
            .with_options("sslmode=require -c search_path=app work_mem=64MB");

        let options = with_driver_env(&[], || descriptor.connect_options()).unwrap();
        assert!(matches!(options.get_ssl_mode(), PgSslMode::Require));
        assert_eq!(
            options.get_options(),
            Some("-c search_path=app -c work_mem=64MB")
        );
    }

    #[cfg(feature = "postgresql")]
    #[test]
    fn test_connect_options_ignore_driver_environment() {
        let descriptor = ConnectionDescriptor::new("inventory");
        let env = [
            ("PGHOST", "elsewhere"),
            ("PGPORT", "6000"),
            ("PGUSER", "intruder"),
            ("PGPASSWORD", "leaked"),
            ("PGSSLMODE", "disable"),
            ("PGAPPNAME", "someone-else"),
        ];

        let options = with_driver_env(&env, || descriptor.connect_options()).unwrap();
        assert_eq!(options.get_host(), "localhost");
        assert_eq!(options.get_port(), 5432);
        assert_eq!(options.get_username(), "");
        assert!(matches!(options.get_ssl_mode(), PgSslMode::Prefer));
        assert_eq!(options.get_application_name(), Some(APPLICATION_NAME));
        assert!(!format!("{options:?}").contains("leaked"));
    }

    #[cfg(feature = "postgresql")]
    #[test]
    fn test_connect_options_keep_resolved_user() {
        let descriptor = ConnectionDescriptor::new("inventory").with_user("c42");

        let options =
            with_driver_env(&[("PGUSER", "intruder")], || descriptor.connect_options()).unwrap();
        assert_eq!(options.get_username(), "c42");
    }

    #[cfg(feature = "postgresql")]
    #[test]
    fn test_connect_options_inherited_pgoptions_not_doubled() {
        let descriptor =
            ConnectionDescriptor::new("inventory").with_options("-c statement_timeout=5000");

        let options = with_driver_env(&[("PGOPTIONS", "-c statement_timeout=5000")], || {
            descriptor.connect_options()
        })
        .unwrap();
        assert_eq!(options.get_options(), Some("-c statement_timeout=5000"));
    }

    #[cfg(feature = "postgresql")]
    #[test]
    fn test_connect_options_reject_conflicting_pgoptions() {
        // Bare pairs in PGOPTIONS are not server syntax, and differing
        // settings would be sent alongside the resolved ones.
        for (inherited, raw) in [
            ("statement_timeout=5000", "-c statement_timeout=5000"),
            ("-c statement_timeout=1", "-c statement_timeout=5000"),
            ("-c statement_timeout=5000", ""),
        ] {
            let descriptor = ConnectionDescriptor::new("inventory").with_options(raw);
            let result = with_driver_env(&[("PGOPTIONS", inherited)], || {
                descriptor.connect_options()
            });
            assert!(
                matches!(result, Err(PgUtilError::Configuration { .. })),
                "inherited {inherited:?} with options {raw:?}"
            );
        }
    }

    #[cfg(feature = "postgresql")]
    #[test]
    fn test_connect_options_rejects_malformed_tokens() {
        for raw in ["sslmode", "sslmode=sometimes", "-c", "-c =1", "--novalue"] {
            let descriptor = ConnectionDescriptor::new("inventory").with_options(raw);
            assert!(
                matches!(
                    with_driver_env(&[], || descriptor.connect_options()),
                    Err(PgUtilError::Configuration { .. })
                ),
                "options {raw:?}"
            );
        }
    }
}
