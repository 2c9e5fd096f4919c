//! `PostgreSQL`-backed [`TableStore`].
//!
//! Uses `tokio-postgres` with `NoTls`. Each operation opens its own
//! connection, spawns the connection driver, runs its statements and then
//! drops the client and waits for the driver to finish.

use tokio::task::JoinHandle;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls};

use crate::adapters::{column_list, create_table_sql, quote_ident};
use crate::config::database::DbConfig;
use crate::core::{ColumnType, IfExists, RecordBatch, TableStore, Value};
use crate::utils::error::{EtlError, Result};

/// 單一語句可綁定的參數上限
const MAX_BIND_PARAMS: usize = u16::MAX as usize;

type SqlParam = Box<dyn ToSql + Sync + Send>;

#[derive(Debug, Clone)]
pub struct PostgresStore {
    config: DbConfig,
}

struct Session {
    client: Client,
    driver: JoinHandle<()>,
}

impl Session {
    async fn close(self) {
        drop(self.client);
        if let Err(e) = self.driver.await {
            tracing::warn!("Postgres connection driver ended abnormally: {}", e);
        }
    }
}

impl PostgresStore {
    pub fn new(config: DbConfig) -> Self {
        Self { config }
    }

    async fn connect(&self) -> Result<Session> {
        let url = self.config.connection_url()?;
        tracing::debug!("Connecting to {}", self.config.redacted_url());

        let (client, connection) = tokio_postgres::connect(url.as_str(), NoTls)
            .await
            .map_err(EtlError::connection)?;
        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!("Postgres connection error: {}", e);
            }
        });

        Ok(Session { client, driver })
    }
}

pub fn sql_type(ty: ColumnType) -> &'static str {
    match ty {
        ColumnType::Integer => "BIGINT",
        ColumnType::Float => "DOUBLE PRECISION",
        ColumnType::Date => "DATE",
        ColumnType::Text | ColumnType::Empty => "TEXT",
    }
}

/// 參數型別必須與欄位型別一致，混合欄位以文字寫入
fn sql_param(value: &Value, ty: ColumnType) -> SqlParam {
    match ty {
        ColumnType::Integer => Box::new(match value {
            Value::Integer(i) => Some(*i),
            _ => None,
        }),
        ColumnType::Float => Box::new(match value {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }),
        ColumnType::Date => Box::new(match value {
            Value::Date(d) => Some(*d),
            _ => None,
        }),
        ColumnType::Text | ColumnType::Empty => Box::new(value.to_text()),
    }
}

fn insert_sql(table: &str, batch: &RecordBatch, rows: usize) -> String {
    let width = batch.num_columns();
    let tuples = (0..rows)
        .map(|row| {
            let slots = (1..=width)
                .map(|col| format!("${}", row * width + col))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({})", slots)
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO {} ({}) VALUES {}",
        quote_ident(table),
        column_list(batch),
        tuples
    )
}

async fn write_rows(
    client: &mut Client,
    table: &str,
    batch: &RecordBatch,
    if_exists: IfExists,
    chunk_size: usize,
) -> Result<usize> {
    let types = batch.column_types();
    let write_err = |e: tokio_postgres::Error| EtlError::write(table, e);

    let exists: bool = client
        .query_one(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_name = $1)",
            &[&table],
        )
        .await
        .map_err(write_err)?
        .get(0);

    match if_exists {
        IfExists::Fail if exists => {
            return Err(EtlError::TableExists {
                table: table.to_string(),
            })
        }
        IfExists::Replace if exists => {
            client
                .batch_execute(&format!("DROP TABLE {}", quote_ident(table)))
                .await
                .map_err(write_err)?;
        }
        _ => {}
    }
    client
        .batch_execute(&create_table_sql(table, batch, &types, true, sql_type))
        .await
        .map_err(write_err)?;

    let rows_per_statement = chunk_size.min((MAX_BIND_PARAMS / batch.num_columns().max(1)).max(1));
    let mut chunks = 0;
    for chunk in batch.rows().chunks(rows_per_statement) {
        let params: Vec<SqlParam> = chunk
            .iter()
            .flat_map(|row| row.iter().zip(&types).map(|(v, ty)| sql_param(v, *ty)))
            .collect();
        let refs: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        let tx = client.transaction().await.map_err(write_err)?;
        tx.execute(&insert_sql(table, batch, chunk.len()), &refs)
            .await
            .map_err(write_err)?;
        tx.commit().await.map_err(write_err)?;

        chunks += 1;
        tracing::debug!("Wrote chunk {} ({} rows) to '{}'", chunks, chunk.len(), table);
    }

    Ok(chunks)
}

impl TableStore for PostgresStore {
    async fn check_connection(&self) -> Result<()> {
        let session = self.connect().await?;
        let result = session
            .client
            .query_one("SELECT 1", &[])
            .await
            .map(|_| ())
            .map_err(EtlError::connection);
        session.close().await;
        result
    }

    async fn write_table(
        &self,
        table: &str,
        batch: &RecordBatch,
        if_exists: IfExists,
        chunk_size: usize,
    ) -> Result<usize> {
        let mut session = self.connect().await?;
        let result = write_rows(&mut session.client, table, batch, if_exists, chunk_size).await;
        session.close().await;
        result
    }

    async fn count_rows(&self, table: &str) -> Result<usize> {
        let session = self
            .connect()
            .await
            .map_err(|e| EtlError::verification(table, e))?;
        let result = session
            .client
            .query_one(&format!("SELECT COUNT(*) FROM {}", quote_ident(table)), &[])
            .await
            .map_err(|e| EtlError::verification(table, e))
            .and_then(|row| {
                let count: i64 = row.get(0);
                usize::try_from(count).map_err(|e| EtlError::verification(table, e))
            });
        session.close().await;
        result
    }
}
