pub mod hr_pipeline;

pub use hr_pipeline::HrPipeline;
