//! Connection configuration types.
//!
//! - `ConnectionDescriptor`: the resolved, validated connection parameters
//! - `PartialConfig`: explicitly supplied values, typically from CLI flags
//! - `EnvMapping` / `EnvironmentReader`: which variables are consulted and how
//!
//! # Security
//! The password is held in a zeroizing container and never appears in
//! `Display`, `Debug`, or serialized output.

mod descriptor;
mod env;
mod partial;

pub use descriptor::{
    ConnectionDescriptor, DEFAULT_HOST, DEFAULT_PORT, FieldSources, ValueSource,
};
pub use env::{EnvMapping, EnvironmentReader, ProcessEnv};
pub use partial::{PartialConfig, PromptPolicy};
