//! Lookup in a `~/.pgpass`-style credential file.
//!
//! Each line holds `hostname:port:database:username:password`. Lookups match
//! on the username only: a line is selected when it contains `:<user>:`
//! anywhere, and the host, port and database fields are never compared
//! against the connection target. No escaping of `:` is supported.
//!
//! The file is read fresh on every call; nothing is cached.

use crate::error::{PgUtilError, Result};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

/// Reserved credential file name inside the home directory.
pub const PGPASS_FILENAME: &str = ".pgpass";

/// Index of the password among the colon-separated fields.
const PASSWORD_FIELD: usize = 4;

/// One well-formed line of a credential file.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialFileEntry {
    /// Host pattern (not matched)
    pub host_pattern: String,
    /// Port pattern (not matched)
    pub port_pattern: String,
    /// Database pattern (not matched)
    pub database_pattern: String,
    /// Login role
    pub username: String,
    /// Stored password
    pub password: Zeroizing<String>,
}

impl fmt::Debug for CredentialFileEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialFileEntry")
            .field("host_pattern", &self.host_pattern)
            .field("port_pattern", &self.port_pattern)
            .field("database_pattern", &self.database_pattern)
            .field("username", &self.username)
            .field("password", &"****")
            .finish()
    }
}

impl CredentialFileEntry {
    /// Parses a line into its five fields.
    ///
    /// Returns `None` for comments, blank lines and lines with fewer than five
    /// fields. Anything after a fifth `:` is dropped, matching `lookup`.
    pub fn parse(line: &str) -> Option<Self> {
        if line.trim_start().starts_with('#') {
            return None;
        }

        let mut fields = line.split(':');
        let host_pattern = fields.next()?;
        let port_pattern = fields.next()?;
        let database_pattern = fields.next()?;
        let username = fields.next()?;
        let password = fields.next()?;

        Some(Self {
            host_pattern: host_pattern.to_string(),
            port_pattern: port_pattern.to_string(),
            database_pattern: database_pattern.to_string(),
            username: username.to_string(),
            password: Zeroizing::new(password.to_string()),
        })
    }
}

/// A credential file at a fixed location.
///
/// # Example
/// ```rust,no_run
/// use pgutil_core::credentials::PgPassFile;
///
/// let file = PgPassFile::at("/srv/fixtures/.pgpass.testing");
/// let password = file.lookup("c42")?;
/// # Ok::<(), pgutil_core::PgUtilError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgPassFile {
    path: PathBuf,
}

impl PgPassFile {
    /// Uses the credential file at `path`.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.pgpass`, or `None` when the home directory cannot be determined.
    pub fn default_location() -> Option<Self> {
        dirs::home_dir().map(|home| Self::at(home.join(PGPASS_FILENAME)))
    }

    /// Location of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file exists.
    ///
    /// # Errors
    /// `CredentialFile` if existence cannot be determined.
    pub fn exists(&self) -> Result<bool> {
        self.path
            .try_exists()
            .map_err(|e| PgUtilError::credential_file(&self.path, e))
    }

    /// Finds the stored password for `user`.
    ///
    /// The first line containing `:<user>:` wins and scanning stops there. A
    /// matching line without a fifth field, or with an empty one, yields
    /// `None`. A missing file also yields `None`.
    ///
    /// # Errors
    /// `CredentialFile` for any I/O failure after the file was found to exist;
    /// such failures are never reported as "no password".
    pub fn lookup(&self, user: &str) -> Result<Option<Zeroizing<String>>> {
        if !self.exists()? {
            tracing::debug!("Credential file {} does not exist", self.path.display());
            return Ok(None);
        }

        let needle = format!(":{user}:");
        for line in self.open()?.lines() {
            let line = Zeroizing::new(line.map_err(|e| PgUtilError::credential_file(&self.path, e))?);
            if !line.contains(&needle) {
                continue;
            }

            let password = line
                .split(':')
                .nth(PASSWORD_FIELD)
                .filter(|password| !password.is_empty())
                .map(|password| Zeroizing::new(password.to_string()));

            tracing::debug!(
                "Credential file {} has an entry for user '{}'",
                self.path.display(),
                user
            );
            return Ok(password);
        }

        Ok(None)
    }

    /// Parses every well-formed entry in the file.
    ///
    /// Returns an empty list when the file does not exist.
    ///
    /// # Errors
    /// `CredentialFile` for I/O failures.
    pub fn entries(&self) -> Result<Vec<CredentialFileEntry>> {
        if !self.exists()? {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for line in self.open()?.lines() {
            let line = Zeroizing::new(line.map_err(|e| PgUtilError::credential_file(&self.path, e))?);
            entries.extend(CredentialFileEntry::parse(&line));
        }
        Ok(entries)
    }

    fn open(&self) -> Result<BufReader<File>> {
        File::open(&self.path)
            .map(BufReader::new)
            .map_err(|e| PgUtilError::credential_file(&self.path, e))
    }
}
