use crate::core::{IfExists, LoadSummary, RecordBatch, TableStore};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{validate_identifier, validate_positive_number, Validate};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CHUNK_SIZE: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOptions {
    pub if_exists: IfExists,
    pub chunk_size: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            if_exists: IfExists::Replace,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Validate for LoadOptions {
    fn validate(&self) -> Result<()> {
        validate_positive_number("chunk_size", self.chunk_size, 1)
    }
}

pub struct Loader<S: TableStore> {
    store: S,
    options: LoadOptions,
}

impl<S: TableStore> Loader<S> {
    pub fn new(store: S) -> Self {
        Self::with_options(store, LoadOptions::default())
    }

    pub fn with_options(store: S, options: LoadOptions) -> Self {
        Self { store, options }
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// 寫入資料表；失敗會在這一層記錄後以錯誤回傳
    pub async fn load(&self, batch: &RecordBatch, table: &str) -> Result<LoadSummary> {
        tracing::info!("💾 Loading data to table: {}", table);

        match self.try_load(batch, table).await {
            Ok(summary) => {
                tracing::info!(
                    "✅ Successfully loaded {} rows to '{}' in {} chunk(s)",
                    summary.rows_written,
                    summary.table,
                    summary.chunks
                );
                Ok(summary)
            }
            Err(e) => {
                tracing::error!("❌ [FAILED] Error loading data: {}", e);
                Err(e)
            }
        }
    }

    async fn try_load(&self, batch: &RecordBatch, table: &str) -> Result<LoadSummary> {
        validate_identifier("table", table)?;
        self.options.validate()?;

        self.store.check_connection().await?;
        tracing::info!("🔌 Database connection successful");

        let chunks = self
            .store
            .write_table(table, batch, self.options.if_exists, self.options.chunk_size)
            .await?;

        Ok(LoadSummary {
            table: table.to_string(),
            rows_written: batch.num_rows(),
            chunks,
        })
    }

    /// 查詢資料表筆數確認寫入結果
    pub async fn verify(&self, table: &str) -> Result<usize> {
        match self.store.count_rows(table).await {
            Ok(count) => {
                tracing::info!("🔍 Verification: {} rows in '{}'", count, table);
                Ok(count)
            }
            Err(e) => {
                tracing::error!("❌ [FAILED] Verification error: {}", e);
                Err(match e {
                    e @ EtlError::VerificationError { .. } => e,
                    other => EtlError::verification(table, other),
                })
            }
        }
    }
}
