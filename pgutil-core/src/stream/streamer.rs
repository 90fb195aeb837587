//! Producer/consumer row streaming with a one-row handoff.
//!
//! A spawned producer pulls records from the source cursor, renders each
//! cell to text and hands rows over a channel of capacity 1. Capacity is
//! reserved *before* the next record is fetched, so the producer never holds
//! more than one converted row that the consumer has not taken.

use super::cell::Cell;
use super::row::Row;
use crate::error::{PgUtilError, Result};
use async_trait::async_trait;
use futures::stream::{BoxStream, Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Callback invoked with `(column, kind)` for each cell of an unrecognized
/// kind.
pub type DiagnosticHook = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// A connection handle that can describe and execute arbitrary queries.
///
/// Implementations must be cheap to clone; the producer task owns a clone
/// for the lifetime of the stream.
#[async_trait]
pub trait QuerySource: Clone + Send + Sync + 'static {
    /// Result column names of `sql`, without fetching any rows.
    async fn describe_columns(&self, sql: &str) -> Result<Vec<String>>;

    /// Executes `sql` and yields one `Vec<Cell>` per record in cursor order.
    ///
    /// Dropping the returned stream must release the cursor.
    fn fetch_cells<'a>(&'a self, sql: &'a str) -> BoxStream<'a, Result<Vec<Cell>>>;
}

/// Streams query results as rows of text.
#[derive(Clone)]
pub struct RowStreamer {
    on_unrecognized: DiagnosticHook,
}

impl Default for RowStreamer {
    fn default() -> Self {
        Self {
            on_unrecognized: Arc::new(|column: &str, kind: &str| {
                tracing::warn!(
                    "Column '{}' has unrecognized type {}, rendering its default text",
                    column,
                    kind
                );
            }),
        }
    }
}

impl std::fmt::Debug for RowStreamer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowStreamer").finish_non_exhaustive()
    }
}

impl RowStreamer {
    /// Creates a streamer that logs unrecognized cell kinds as warnings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the unrecognized-kind diagnostic.
    pub fn with_diagnostic<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.on_unrecognized = Arc::new(hook);
        self
    }

    /// Starts streaming `sql` from `source`.
    ///
    /// Returns the column names immediately together with a lazy, single-pass
    /// row stream. The first error ends the stream; rows already delivered
    /// stay delivered.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    /// `QueryExecution` if the column list cannot be obtained.
    pub async fn stream<S: QuerySource>(
        &self,
        source: &S,
        sql: impl Into<String>,
    ) -> Result<(Vec<String>, RowStream)> {
        let sql = sql.into();
        let columns = source.describe_columns(&sql).await?;
        tracing::debug!("Streaming query with {} columns", columns.len());

        let (tx, rx) = mpsc::channel(1);
        let producer = tokio::spawn(produce(
            source.clone(),
            sql,
            columns.iter().cloned().collect(),
            tx,
            Arc::clone(&self.on_unrecognized),
        ));

        Ok((columns, RowStream { rx, producer }))
    }
}

async fn produce<S: QuerySource>(
    source: S,
    sql: String,
    columns: Arc<[String]>,
    tx: mpsc::Sender<Result<Row>>,
    on_unrecognized: DiagnosticHook,
) {
    let mut records = source.fetch_cells(&sql);
    let mut delivered: u64 = 0;

    loop {
        let Ok(permit) = tx.reserve().await else {
            tracing::debug!("Consumer stopped after {} rows, releasing cursor", delivered);
            return;
        };

        match records.next().await {
            Some(Ok(cells)) => match materialize(&columns, cells, on_unrecognized.as_ref()) {
                Ok(row) => {
                    permit.send(Ok(row));
                    delivered = delivered.saturating_add(1);
                }
                Err(e) => {
                    permit.send(Err(e));
                    return;
                }
            },
            Some(Err(e)) => {
                tracing::debug!("Query failed after {} rows", delivered);
                permit.send(Err(e));
                return;
            }
            None => {
                tracing::debug!("Query exhausted after {} rows", delivered);
                return;
            }
        }
    }
}

/// Renders one record into a row, reporting unrecognized kinds.
///
/// # Errors
/// `RowScan` if the record width differs from the column list.
pub fn materialize(
    columns: &Arc<[String]>,
    cells: Vec<Cell>,
    on_unrecognized: &(dyn Fn(&str, &str) + Send + Sync),
) -> Result<Row> {
    if cells.len() != columns.len() {
        return Err(PgUtilError::row_scan(format!(
            "record has {} values for {} columns",
            cells.len(),
            columns.len()
        )));
    }

    let values = columns
        .iter()
        .zip(&cells)
        .map(|(column, cell)| {
            if !cell.is_recognized() {
                on_unrecognized(column, cell.kind());
            }
            cell.to_text()
        })
        .collect();

    Row::new(Arc::clone(columns), values)
        .ok_or_else(|| PgUtilError::row_scan("record width changed while rendering"))
}

/// Lazy, single-pass sequence of rows.
///
/// Dropping the stream stops the producer and releases the cursor, whether
/// or not the rows were exhausted.
#[derive(Debug)]
pub struct RowStream {
    rx: mpsc::Receiver<Result<Row>>,
    producer: JoinHandle<()>,
}

impl Stream for RowStream {
    type Item = Result<Row>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl Drop for RowStream {
    fn drop(&mut self) {
        self.producer.abort();
    }
}
