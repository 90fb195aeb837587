//! Schema-agnostic query result streaming.
//!
//! - `cell`: runtime-typed values and their text rendering
//! - `row`: ordered column/value records
//! - `streamer`: producer task, one-row handoff and the `QuerySource` seam
//! - `postgres`: `QuerySource` for `sqlx::PgPool` (feature `postgresql`)

mod cell;
#[cfg(feature = "postgresql")]
mod postgres;
mod row;
mod streamer;

pub use cell::{Cell, TIMESTAMP_FORMAT};
#[cfg(feature = "postgresql")]
pub use postgres::cells_from_row;
pub use row::Row;
pub use streamer::{DiagnosticHook, QuerySource, RowStream, RowStreamer, materialize};
