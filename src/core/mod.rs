pub mod etl;
pub mod extract;
pub mod load;
pub mod report;
pub mod transform;

pub use crate::domain::model::{
    ColumnType, LoadSummary, QualityReport, RecordBatch, Row, TransformOutput, Value,
};
pub use crate::domain::ports::{ConfigProvider, IfExists, Pipeline, TableStore};
pub use crate::utils::error::Result;
