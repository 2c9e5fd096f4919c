use crate::core::extract::extract_csv;
use crate::core::load::{LoadOptions, Loader};
use crate::core::transform::{CleaningRules, Transformer};
use crate::core::{ConfigProvider, LoadSummary, Pipeline, RecordBatch, TableStore, TransformOutput};
use crate::utils::error::Result;

/// CSV → 清理 → 資料表 的 HR pipeline
pub struct HrPipeline<S: TableStore, C: ConfigProvider> {
    pub(crate) config: C,
    pub(crate) transformer: Transformer,
    pub(crate) loader: Loader<S>,
}

impl<S: TableStore, C: ConfigProvider> HrPipeline<S, C> {
    pub fn new(store: S, config: C) -> Self {
        Self {
            config,
            transformer: Transformer::default(),
            loader: Loader::new(store),
        }
    }

    pub fn with_rules(mut self, rules: CleaningRules) -> Self {
        self.transformer = Transformer::new(rules);
        self
    }

    pub fn with_load_options(mut self, options: LoadOptions) -> Self {
        self.loader = Loader::with_options(self.loader.into_store(), options);
        self
    }
}

#[async_trait::async_trait]
impl<S: TableStore, C: ConfigProvider> Pipeline for HrPipeline<S, C> {
    async fn extract(&self) -> Result<RecordBatch> {
        extract_csv(self.config.source_path())
    }

    async fn transform(&self, batch: &RecordBatch) -> Result<TransformOutput> {
        self.transformer.transform(batch)
    }

    async fn load(&self, batch: &RecordBatch) -> Result<LoadSummary> {
        self.loader.load(batch, self.config.table_name()).await
    }

    async fn verify(&self) -> Result<usize> {
        self.loader.verify(self.config.table_name()).await
    }
}
