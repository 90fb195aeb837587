//! Multi-source connection credential resolution.
//!
//! Per field, the first non-empty value wins, in this order:
//!
//! 1. explicit value (`PartialConfig`, usually CLI flags; port must be > 0)
//! 2. environment variable (names from `EnvMapping`)
//! 3. built-in default (host and port only)
//!
//! The database name is checked before any password work so that a doomed
//! configuration never triggers a prompt. The password then falls back to
//! the credential file and finally to an interactive prompt, subject to the
//! `PromptPolicy`.

use super::pgpass::PgPassFile;
use super::prompt::{PasswordPrompter, TerminalPrompter};
use crate::config::{
    ConnectionDescriptor, EnvMapping, EnvironmentReader, PartialConfig, ProcessEnv, PromptPolicy,
    ValueSource,
};
use crate::error::{PgUtilError, Result};
use tracing::{debug, warn};
use zeroize::Zeroizing;

/// Builds a `ConnectionDescriptor` from explicit values, the environment,
/// the credential file and the terminal.
///
/// # Example
/// ```rust
/// use pgutil_core::config::PartialConfig;
/// use pgutil_core::credentials::{CredentialResolver, PgPassFile};
/// use std::collections::HashMap;
///
/// let env = HashMap::from([("PGDATABASE".to_string(), "inventory".to_string())]);
/// let prompter = |_: &str| -> pgutil_core::Result<String> { Ok("typed".to_string()) };
/// let resolver = CredentialResolver::new(env, prompter)
///     .with_pgpass(PgPassFile::at("/nonexistent/.pgpass"));
///
/// let descriptor = resolver.resolve(&PartialConfig::new().with_user("c42"))?;
/// assert_eq!(descriptor.database, "inventory");
/// assert_eq!(descriptor.password(), "typed");
/// # Ok::<(), pgutil_core::PgUtilError>(())
/// ```
#[derive(Debug, Clone)]
pub struct CredentialResolver<E = ProcessEnv, P = TerminalPrompter> {
    env: E,
    mapping: EnvMapping,
    pgpass: Option<PgPassFile>,
    prompter: P,
}

impl CredentialResolver {
    /// Resolver over the process environment and the controlling terminal.
    pub fn from_process() -> Self {
        Self::new(ProcessEnv, TerminalPrompter)
    }
}

impl<E, P> CredentialResolver<E, P>
where
    E: EnvironmentReader,
    P: PasswordPrompter,
{
    /// Creates a resolver with the libpq environment names.
    pub fn new(env: E, prompter: P) -> Self {
        Self {
            env,
            mapping: EnvMapping::default(),
            pgpass: None,
            prompter,
        }
    }

    /// Builder method to change which environment variables are consulted.
    pub fn with_env_mapping(mut self, mapping: EnvMapping) -> Self {
        self.mapping = mapping;
        self
    }

    /// Builder method to pin the credential file location.
    pub fn with_pgpass(mut self, file: PgPassFile) -> Self {
        self.pgpass = Some(file);
        self
    }

    /// The environment names in use.
    pub fn env_mapping(&self) -> &EnvMapping {
        &self.mapping
    }

    /// The credential file that password lookups will read.
    ///
    /// An explicitly configured file wins, then the passfile environment
    /// variable, then `~/.pgpass`.
    pub fn pgpass_file(&self) -> Option<PgPassFile> {
        self.pgpass
            .clone()
            .or_else(|| self.env.non_empty(&self.mapping.passfile).map(PgPassFile::at))
            .or_else(PgPassFile::default_location)
    }

    /// Resolves the final connection descriptor.
    ///
    /// # Errors
    /// - `PromptDisallowed` if both prompt flags are set, or if a password is
    ///   needed and prompting is forbidden
    /// - `MissingDatabase` if no source names a database (checked before any
    ///   password lookup or prompt)
    /// - `CredentialFile` if the credential file exists but cannot be read
    /// - `Prompt` if the terminal cannot be read
    pub fn resolve(&self, explicit: &PartialConfig) -> Result<ConnectionDescriptor> {
        let policy = explicit.prompt_policy()?;
        let mut descriptor = ConnectionDescriptor::default();

        if let Some((host, source)) = self.pick(explicit.host.as_deref(), &self.mapping.host) {
            descriptor.host = host;
            descriptor.sources.host = source;
        }
        if let Some((port, source)) = self.pick_port(explicit.port) {
            descriptor.port = port;
            descriptor.sources.port = source;
        }
        if let Some((database, source)) =
            self.pick(explicit.database.as_deref(), &self.mapping.database)
        {
            descriptor.database = database;
            descriptor.sources.database = source;
        }
        if let Some((user, source)) = self.pick(explicit.user.as_deref(), &self.mapping.user) {
            descriptor.user = user;
            descriptor.sources.user = source;
        }
        if let Some((options, source)) =
            self.pick(explicit.options.as_deref(), &self.mapping.options)
        {
            descriptor.options = options;
            descriptor.sources.options = source;
        }

        if descriptor.database.is_empty() {
            return Err(PgUtilError::MissingDatabase);
        }

        self.resolve_password(&mut descriptor, explicit, policy)?;

        for (field, source) in descriptor.sources.iter() {
            debug!("Resolved {} from {}", field, source);
        }

        Ok(descriptor)
    }

    fn resolve_password(
        &self,
        descriptor: &mut ConnectionDescriptor,
        explicit: &PartialConfig,
        policy: PromptPolicy,
    ) -> Result<()> {
        if let Some((password, source)) =
            self.pick(explicit.password.as_deref(), &self.mapping.password)
        {
            descriptor.password = Zeroizing::new(password);
            descriptor.sources.password = source;
            return Ok(());
        }

        if policy == PromptPolicy::Forced {
            return self.prompt(descriptor);
        }

        if !descriptor.user.is_empty() {
            match self.pgpass_file() {
                Some(file) => {
                    if let Some(password) = file.lookup(&descriptor.user)? {
                        descriptor.password = password;
                        descriptor.sources.password =
                            ValueSource::CredentialFile(file.path().to_path_buf());
                        return Ok(());
                    }
                }
                None => debug!("No home directory, skipping credential file lookup"),
            }
        }

        match policy {
            PromptPolicy::Disallowed => Err(PgUtilError::prompt_disallowed(format!(
                "no password found for user '{}' and prompting is disabled",
                descriptor.user
            ))),
            PromptPolicy::Allowed | PromptPolicy::Forced => self.prompt(descriptor),
        }
    }

    fn prompt(&self, descriptor: &mut ConnectionDescriptor) -> Result<()> {
        let password = self.prompter.prompt_password(&descriptor.user)?;
        descriptor.password = Zeroizing::new(password);
        descriptor.sources.password = ValueSource::Prompt;
        Ok(())
    }

    fn pick(&self, explicit: Option<&str>, var: &str) -> Option<(String, ValueSource)> {
        if let Some(value) = explicit.filter(|value| !value.is_empty()) {
            return Some((value.to_string(), ValueSource::Explicit));
        }
        self.env
            .non_empty(var)
            .map(|value| (value, ValueSource::Environment(var.to_string())))
    }

    fn pick_port(&self, explicit: Option<u16>) -> Option<(u16, ValueSource)> {
        if let Some(port) = explicit.filter(|port| *port > 0) {
            return Some((port, ValueSource::Explicit));
        }

        let var = &self.mapping.port;
        let raw = self.env.non_empty(var)?;
        match raw.trim().parse::<u16>() {
            Ok(port) if port > 0 => Some((port, ValueSource::Environment(var.clone()))),
            _ => {
                warn!("Ignoring {}: '{}' is not a valid port", var, raw);
                None
            }
        }
    }
}
