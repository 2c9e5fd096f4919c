//! `SQLite`-backed [`TableStore`].
//!
//! Every call opens the database file, does its work and drops the
//! connection before returning.

use std::path::PathBuf;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};

use crate::adapters::{column_list, create_table_sql, quote_ident};
use crate::core::{ColumnType, IfExists, RecordBatch, TableStore, Value};
use crate::utils::error::{EtlError, Result};

#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open(&self.path).map_err(EtlError::connection)
    }

    fn write_blocking(
        &self,
        table: &str,
        batch: &RecordBatch,
        if_exists: IfExists,
        chunk_size: usize,
    ) -> Result<usize> {
        let mut conn = self.connect()?;
        let types = batch.column_types();
        let write_err = |e: rusqlite::Error| EtlError::write(table, e);

        let exists: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |row| row.get(0),
            )
            .map_err(write_err)?;

        match if_exists {
            IfExists::Fail if exists => {
                return Err(EtlError::TableExists {
                    table: table.to_string(),
                })
            }
            IfExists::Replace if exists => {
                conn.execute(&format!("DROP TABLE {}", quote_ident(table)), [])
                    .map_err(write_err)?;
            }
            _ => {}
        }
        conn.execute(&create_table_sql(table, batch, &types, true, sql_type), [])
            .map_err(write_err)?;

        let placeholders = (1..=batch.num_columns())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let insert = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table),
            column_list(batch),
            placeholders
        );

        let mut chunks = 0;
        for chunk in batch.rows().chunks(chunk_size) {
            let tx = conn.transaction().map_err(write_err)?;
            {
                let mut stmt = tx.prepare_cached(&insert).map_err(write_err)?;
                for row in chunk {
                    let values = row.iter().zip(&types).map(|(v, ty)| sql_value(v, *ty));
                    stmt.execute(params_from_iter(values)).map_err(write_err)?;
                }
            }
            tx.commit().map_err(write_err)?;
            chunks += 1;
            tracing::debug!("Wrote chunk {} ({} rows) to '{}'", chunks, chunk.len(), table);
        }

        Ok(chunks)
    }

    fn count_blocking(&self, table: &str) -> Result<usize> {
        let conn = self.connect()?;
        let count: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
                [],
                |row| row.get(0),
            )
            .map_err(|e| EtlError::verification(table, e))?;
        usize::try_from(count).map_err(|e| EtlError::verification(table, e))
    }
}

pub fn sql_type(ty: ColumnType) -> &'static str {
    match ty {
        ColumnType::Integer => "INTEGER",
        ColumnType::Float => "REAL",
        ColumnType::Date => "DATE",
        ColumnType::Text | ColumnType::Empty => "TEXT",
    }
}

/// 依欄位型別轉換，混合型別的欄位一律存成文字
fn sql_value(value: &Value, ty: ColumnType) -> SqlValue {
    match (value, ty) {
        (Value::Missing, _) => SqlValue::Null,
        (Value::Integer(i), ColumnType::Integer) => SqlValue::Integer(*i),
        (Value::Integer(i), ColumnType::Float) => SqlValue::Real(*i as f64),
        (Value::Float(f), ColumnType::Float) => SqlValue::Real(*f),
        (Value::Date(d), ColumnType::Date) => SqlValue::Text(d.format("%Y-%m-%d").to_string()),
        (other, _) => other.to_text().map(SqlValue::Text).unwrap_or(SqlValue::Null),
    }
}

impl TableStore for SqliteStore {
    async fn check_connection(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(EtlError::connection)?;
        Ok(())
    }

    async fn write_table(
        &self,
        table: &str,
        batch: &RecordBatch,
        if_exists: IfExists,
        chunk_size: usize,
    ) -> Result<usize> {
        self.write_blocking(table, batch, if_exists, chunk_size)
    }

    async fn count_rows(&self, table: &str) -> Result<usize> {
        self.count_blocking(table)
    }
}
