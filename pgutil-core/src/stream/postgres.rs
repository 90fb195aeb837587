//! PostgreSQL implementation of `QuerySource`.
//!
//! Queries run on the simple query protocol, so every value arrives in text
//! form; known kinds are decoded into typed cells and everything else keeps
//! the server's own rendering.

use super::cell::Cell;
use super::streamer::QuerySource;
use crate::error::{PgUtilError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use futures::stream::{BoxStream, StreamExt};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Column, Executor, Row, Statement, TypeInfo, ValueRef};

#[async_trait]
impl QuerySource for PgPool {
    async fn describe_columns(&self, sql: &str) -> Result<Vec<String>> {
        let statement = self.prepare(sql).await.map_err(PgUtilError::query_failed)?;
        Ok(statement
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect())
    }

    fn fetch_cells<'a>(&'a self, sql: &'a str) -> BoxStream<'a, Result<Vec<Cell>>> {
        sqlx::raw_sql(sql)
            .fetch(self)
            .map(|record| match record {
                Ok(row) => cells_from_row(&row),
                Err(e) => Err(PgUtilError::query_failed(e)),
            })
            .boxed()
    }
}

/// Converts every value of `row` into a cell, dispatching on the runtime
/// type of the value.
///
/// # Errors
/// `RowScan` if a value cannot be decoded as its reported type.
pub fn cells_from_row(row: &PgRow) -> Result<Vec<Cell>> {
    (0..row.columns().len())
        .map(|index| decode_cell(row, index))
        .collect()
}

fn decode_cell(row: &PgRow, index: usize) -> Result<Cell> {
    let kind = {
        let raw = row.try_get_raw(index).map_err(PgUtilError::row_scan)?;
        if raw.is_null() {
            return Ok(Cell::Null);
        }
        raw.type_info().name().to_string()
    };

    let cell = match kind.as_str() {
        "BOOL" => Cell::Bool(row.try_get(index).map_err(PgUtilError::row_scan)?),
        "INT2" => Cell::Int(i64::from(
            row.try_get::<i16, _>(index).map_err(PgUtilError::row_scan)?,
        )),
        "INT4" => Cell::Int(i64::from(
            row.try_get::<i32, _>(index).map_err(PgUtilError::row_scan)?,
        )),
        "INT8" => Cell::Int(row.try_get(index).map_err(PgUtilError::row_scan)?),
        "FLOAT4" => Cell::Float(f64::from(
            row.try_get::<f32, _>(index).map_err(PgUtilError::row_scan)?,
        )),
        "FLOAT8" => Cell::Float(row.try_get(index).map_err(PgUtilError::row_scan)?),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "UNKNOWN" | "\"CHAR\"" => Cell::Text(
            row.try_get_unchecked(index)
                .map_err(PgUtilError::row_scan)?,
        ),
        "BYTEA" => Cell::Bytes(row.try_get(index).map_err(PgUtilError::row_scan)?),
        // Rendered in UTC whatever the session TimeZone; the offset is always +0000.
        "TIMESTAMPTZ" => Cell::from(
            row.try_get::<DateTime<Utc>, _>(index)
                .map_err(PgUtilError::row_scan)?,
        ),
        // No zone on the wire; read as if UTC.
        "TIMESTAMP" => Cell::from(
            row.try_get::<NaiveDateTime, _>(index)
                .map_err(PgUtilError::row_scan)?
                .and_utc(),
        ),
        _ => Cell::Other {
            text: row
                .try_get_unchecked(index)
                .map_err(PgUtilError::row_scan)?,
            kind,
        },
    };

    Ok(cell)
}
