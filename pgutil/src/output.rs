//! Row output formats for the `query` command.

use clap::ValueEnum;
use pgutil_core::Row;
use std::io::Write;

/// How streamed rows are written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Tab-separated values with a header line
    #[default]
    Tsv,
    /// One JSON object per row, keys in column order
    Json,
}

/// Writes rows one at a time in the chosen format.
///
/// Rows are written as soon as they are streamed, but reach the output only
/// as fast as `out` passes them on. `run` hands in a buffered stdout, so rows
/// leave in blocks and the tail is written by [`RowWriter::finish`].
#[derive(Debug)]
pub struct RowWriter<W: Write> {
    out: W,
    format: OutputFormat,
    rows: u64,
}

impl<W: Write> RowWriter<W> {
    /// Creates a writer over `out`.
    pub const fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out,
            format,
            rows: 0,
        }
    }

    /// Writes the column header. JSON output has no header line.
    ///
    /// # Errors
    /// Propagates write failures.
    pub fn write_header(&mut self, columns: &[String]) -> anyhow::Result<()> {
        if self.format == OutputFormat::Tsv {
            let fields: Vec<String> = columns.iter().map(|name| escape_tsv(name)).collect();
            writeln!(self.out, "{}", fields.join("\t"))?;
        }
        Ok(())
    }

    /// Writes one row.
    ///
    /// # Errors
    /// Propagates write and serialization failures.
    pub fn write_row(&mut self, row: &Row) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Tsv => {
                let fields: Vec<String> = row.values().iter().map(|value| escape_tsv(value)).collect();
                writeln!(self.out, "{}", fields.join("\t"))?;
            }
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.out, row)?;
                writeln!(self.out)?;
            }
        }
        self.rows = self.rows.saturating_add(1);
        Ok(())
    }

    /// Number of rows written so far.
    pub const fn rows(&self) -> u64 {
        self.rows
    }

    /// Flushes and returns the underlying writer.
    ///
    /// # Errors
    /// Propagates flush failures.
    pub fn finish(mut self) -> anyhow::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

/// Escapes the characters that would break the tab-separated layout, using
/// the backslash sequences of PostgreSQL's text `COPY` format.
fn escape_tsv(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\t' => escaped.push_str("\\t"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            _ => escaped.push(c),
        }
    }
    escaped
}
