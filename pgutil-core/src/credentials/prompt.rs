//! Interactive password input.

use crate::error::{PgUtilError, Result};

/// Source of interactively entered passwords.
///
/// Implementations block until input is available; there is no timeout.
pub trait PasswordPrompter {
    /// Asks for the password of `user`.
    ///
    /// # Errors
    /// `Prompt` when the input cannot be read.
    fn prompt_password(&self, user: &str) -> Result<String>;
}

/// Reads the password from the controlling terminal with echo disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompter;

impl PasswordPrompter for TerminalPrompter {
    fn prompt_password(&self, user: &str) -> Result<String> {
        let prompt = if user.is_empty() {
            "Password: ".to_string()
        } else {
            format!("Password for user {user}: ")
        };
        rpassword::prompt_password(prompt).map_err(|source| PgUtilError::Prompt { source })
    }
}

impl<F> PasswordPrompter for F
where
    F: Fn(&str) -> Result<String>,
{
    fn prompt_password(&self, user: &str) -> Result<String> {
        self(user)
    }
}
