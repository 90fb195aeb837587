//! Explicitly supplied connection values and the password prompt policy.

use crate::error::{PgUtilError, Result};
use std::fmt;

/// Connection values supplied directly by the caller, usually from flags.
///
/// Every field is optional. Empty strings and a zero port count as absent, so
/// a flag with an empty default never hides an environment value.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PartialConfig {
    /// Login role
    pub user: Option<String>,
    /// Password
    pub password: Option<String>,
    /// Server host
    pub host: Option<String>,
    /// Server port; zero means "not given"
    pub port: Option<u16>,
    /// Database name
    pub database: Option<String>,
    /// Free-form driver options
    pub options: Option<String>,
    /// Never prompt for a password
    pub no_password_prompt: bool,
    /// Always prompt for a password unless one was supplied
    pub force_password_prompt: bool,
}

impl fmt::Debug for PartialConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartialConfig")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("options", &self.options)
            .field("no_password_prompt", &self.no_password_prompt)
            .field("force_password_prompt", &self.force_password_prompt)
            .finish()
    }
}

impl PartialConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the user.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Builder method to set the password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Builder method to set the host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Builder method to set the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Builder method to set the database.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Builder method to set driver options.
    pub fn with_options(mut self, options: impl Into<String>) -> Self {
        self.options = Some(options.into());
        self
    }

    /// Builder method to forbid password prompting.
    pub fn without_password_prompt(mut self) -> Self {
        self.no_password_prompt = true;
        self
    }

    /// Builder method to force password prompting.
    pub fn with_forced_password_prompt(mut self) -> Self {
        self.force_password_prompt = true;
        self
    }

    /// Derives the prompt policy from the two prompt flags.
    ///
    /// # Errors
    /// `PromptDisallowed` when both flags are set.
    pub fn prompt_policy(&self) -> Result<PromptPolicy> {
        PromptPolicy::from_flags(self.no_password_prompt, self.force_password_prompt)
    }
}

/// How the resolver may obtain a password that no other source provided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptPolicy {
    /// Try the credential file, then prompt
    Allowed,
    /// Prompt without consulting the credential file
    Forced,
    /// Try the credential file, never prompt
    Disallowed,
}

impl PromptPolicy {
    /// Builds a policy from the "never prompt" and "force prompt" flags.
    ///
    /// # Errors
    /// The flags contradict each other when both are set; that is reported as
    /// `PromptDisallowed` instead of silently picking one.
    pub fn from_flags(no_prompt: bool, force_prompt: bool) -> Result<Self> {
        match (no_prompt, force_prompt) {
            (true, true) => Err(PgUtilError::prompt_disallowed(
                "password prompt was both forced and forbidden",
            )),
            (true, false) => Ok(Self::Disallowed),
            (false, true) => Ok(Self::Forced),
            (false, false) => Ok(Self::Allowed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_policy_from_flags() {
        assert_eq!(
            PromptPolicy::from_flags(false, false).ok(),
            Some(PromptPolicy::Allowed)
        );
        assert_eq!(
            PromptPolicy::from_flags(true, false).ok(),
            Some(PromptPolicy::Disallowed)
        );
        assert_eq!(
            PromptPolicy::from_flags(false, true).ok(),
            Some(PromptPolicy::Forced)
        );
        assert!(matches!(
            PromptPolicy::from_flags(true, true),
            Err(PgUtilError::PromptDisallowed { .. })
        ));
    }

    #[test]
    fn test_partial_config_builder() {
        let config = PartialConfig::new()
            .with_user("c42")
            .with_host("db.internal")
            .with_port(6543)
            .with_database("inventory")
            .with_options("sslmode=disable")
            .without_password_prompt();

        assert_eq!(config.user.as_deref(), Some("c42"));
        assert_eq!(config.host.as_deref(), Some("db.internal"));
        assert_eq!(config.port, Some(6543));
        assert_eq!(config.database.as_deref(), Some("inventory"));
        assert_eq!(config.options.as_deref(), Some("sslmode=disable"));
        assert_eq!(config.prompt_policy().ok(), Some(PromptPolicy::Disallowed));
    }

    #[test]
    fn test_partial_config_debug_hides_password() {
        let config = PartialConfig::new().with_password("hunter2");
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("****"));
    }
}
