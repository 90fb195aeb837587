//! Password sources and the credential resolver.
//!
//! # Module Structure
//! - `pgpass`: `~/.pgpass`-style credential file lookup
//! - `prompt`: interactive password input
//! - `resolver`: precedence engine producing a `ConnectionDescriptor`
//!
//! # Security
//! Passwords read from any source are moved into `Zeroizing` containers and
//! are never logged.

mod pgpass;
mod prompt;
mod resolver;

pub use pgpass::{CredentialFileEntry, PGPASS_FILENAME, PgPassFile};
pub use prompt::{PasswordPrompter, TerminalPrompter};
pub use resolver::CredentialResolver;
