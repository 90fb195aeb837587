//! Environment variable access for credential resolution.

use std::collections::HashMap;

/// Read access to environment variables.
///
/// The resolver never touches the process environment directly, so tests can
/// hand it a plain map instead of mutating global state.
pub trait EnvironmentReader {
    /// Returns the value of `name`, or `None` if unset.
    fn var(&self, name: &str) -> Option<String>;

    /// Returns the value of `name` only when it is set and non-empty.
    fn non_empty(&self, name: &str) -> Option<String> {
        self.var(name).filter(|value| !value.is_empty())
    }
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvironmentReader for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvironmentReader for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl<T: EnvironmentReader + ?Sized> EnvironmentReader for &T {
    fn var(&self, name: &str) -> Option<String> {
        (**self).var(name)
    }
}

/// Names of the environment variables consulted for each connection field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvMapping {
    /// Server host
    pub host: String,
    /// Server port
    pub port: String,
    /// Database name
    pub database: String,
    /// Login role
    pub user: String,
    /// Password
    pub password: String,
    /// Free-form driver options
    pub options: String,
    /// Location of the credential file
    pub passfile: String,
}

impl Default for EnvMapping {
    fn default() -> Self {
        Self {
            host: "PGHOST".to_string(),
            port: "PGPORT".to_string(),
            database: "PGDATABASE".to_string(),
            user: "PGUSER".to_string(),
            password: "PGPASSWORD".to_string(),
            options: "PGOPTIONS".to_string(),
            passfile: "PGPASSFILE".to_string(),
        }
    }
}

impl EnvMapping {
    /// The libpq variable names (`PGHOST`, `PGPORT`, ...).
    pub fn libpq() -> Self {
        Self::default()
    }

    /// The older `DB*` names (`DBHOST`, `DBPORT`, `DBNAME`, `DBUSER`,
    /// `DBPASS`, `DBOPTIONS`). The credential file location keeps using
    /// `PGPASSFILE`.
    pub fn legacy() -> Self {
        Self {
            host: "DBHOST".to_string(),
            port: "DBPORT".to_string(),
            database: "DBNAME".to_string(),
            user: "DBUSER".to_string(),
            password: "DBPASS".to_string(),
            options: "DBOPTIONS".to_string(),
            ..Self::default()
        }
    }
}
