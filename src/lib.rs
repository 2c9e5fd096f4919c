pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::adapters::{postgres::PostgresStore, sqlite::SqliteStore};
pub use crate::app::pipelines::HrPipeline;
pub use crate::config::database::DbConfig;
pub use crate::core::{etl::EtlEngine, etl::Phase, report::PipelineResult, report::RunStatus};
pub use crate::utils::error::{EtlError, Result};
