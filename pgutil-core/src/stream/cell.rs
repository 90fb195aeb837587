//! Runtime-typed cell values and their text rendering.

use chrono::{DateTime, FixedOffset, TimeZone};

/// Layout used for timestamps: `2006-01-02T15:04:05.000-0700`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// A single value as produced by the driver, tagged by its runtime kind.
///
/// Conversion is driven by the value itself, never by a declared schema, so
/// arbitrary queries can be rendered. `Other` keeps the driver's own text for
/// kinds this crate does not know about.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// SQL NULL
    Null,
    /// Raw bytes
    Bytes(Vec<u8>),
    /// Character data
    Text(String),
    /// Any integer, widened to 64 bits
    Int(i64),
    /// Any float, widened to 64 bits
    Float(f64),
    /// Boolean
    Bool(bool),
    /// Point in time with its UTC offset
    Timestamp(DateTime<FixedOffset>),
    /// Unrecognized kind with the driver's textual rendering
    Other {
        /// Driver type name
        kind: String,
        /// Best-effort text
        text: String,
    },
}

impl Cell {
    /// Renders the value as text.
    ///
    /// The result is meant for display and export. It is never quoted or
    /// escaped and must not be spliced into SQL.
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            Self::Text(text) => text.clone(),
            Self::Int(value) => value.to_string(),
            Self::Float(value) => format_float(*value),
            Self::Bool(value) => value.to_string(),
            Self::Timestamp(value) => value.format(TIMESTAMP_FORMAT).to_string(),
            Self::Other { text, .. } => text.clone(),
        }
    }

    /// Short name of the runtime kind, or the driver type name for `Other`.
    pub fn kind(&self) -> &str {
        match self {
            Self::Null => "null",
            Self::Bytes(_) => "bytes",
            Self::Text(_) => "text",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Bool(_) => "bool",
            Self::Timestamp(_) => "timestamp",
            Self::Other { kind, .. } => kind,
        }
    }

    /// `false` only for `Other`.
    pub const fn is_recognized(&self) -> bool {
        !matches!(self, Self::Other { .. })
    }
}

/// Fixed-point with six decimals, as C's `%f`.
fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let sign = if value.is_sign_positive() { '+' } else { '-' };
        format!("{sign}Inf")
    } else {
        format!("{value:.6}")
    }
}

impl<T: Into<Self>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for Cell {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Cell {
    fn from(value: DateTime<Tz>) -> Self {
        Self::Timestamp(value.fixed_offset())
    }
}
