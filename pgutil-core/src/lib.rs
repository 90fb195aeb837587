//! Connection helpers for PostgreSQL command-line tools.
//!
//! This crate resolves connection credentials from competing sources and
//! streams arbitrary query results as text:
//!
//! - [`credentials::CredentialResolver`] merges explicit values, environment
//!   variables, a `~/.pgpass`-style credential file and interactive prompting
//!   into a [`config::ConnectionDescriptor`]
//! - [`stream::RowStreamer`] runs a query and yields rows of normalized text
//!   without a declared schema, one row at a time
//!
//! The two halves share no state. A typical caller resolves a descriptor,
//! opens a connection with it, then streams a query over that connection.
//!
//! # Security Guarantees
//! - Passwords are held in zeroizing containers and never logged
//! - `Display` and `Debug` output of configuration types omit passwords
//! - Credential file I/O failures are surfaced, never treated as "no password"

pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod stream;

// Re-export commonly used types
pub use config::{ConnectionDescriptor, EnvMapping, PartialConfig, PromptPolicy, ValueSource};
pub use credentials::{CredentialResolver, PgPassFile};
pub use error::{PgUtilError, Result};
pub use logging::init_logging;
pub use stream::{Cell, Row, RowStream, RowStreamer};
