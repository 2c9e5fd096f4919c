use crate::domain::model::{LoadSummary, RecordBatch, TransformOutput};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 目標資料表已存在時的處理方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IfExists {
    #[default]
    Replace,
    Append,
    Fail,
}

/// 關聯式資料表的寫入端，每次呼叫自行建立並釋放連線
pub trait TableStore: Send + Sync {
    fn check_connection(&self) -> impl std::future::Future<Output = Result<()>> + Send;

    /// 以 `chunk_size` 筆為一批寫入，回傳寫入的批次數
    fn write_table(
        &self,
        table: &str,
        batch: &RecordBatch,
        if_exists: IfExists,
        chunk_size: usize,
    ) -> impl std::future::Future<Output = Result<usize>> + Send;

    fn count_rows(&self, table: &str) -> impl std::future::Future<Output = Result<usize>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn source_path(&self) -> &Path;
    fn table_name(&self) -> &str;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<RecordBatch>;
    async fn transform(&self, batch: &RecordBatch) -> Result<TransformOutput>;
    async fn load(&self, batch: &RecordBatch) -> Result<LoadSummary>;
    async fn verify(&self) -> Result<usize>;
}
