use crate::core::etl::Phase;
use crate::core::QualityReport;
use crate::utils::error::Result;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Success => f.write_str("SUCCESS"),
            RunStatus::Failed => f.write_str("FAILED"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseTiming {
    pub phase: Phase,
    pub duration_secs: f64,
}

/// 一次執行的結果，不論成功或失敗都會產生
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub status: RunStatus,
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    pub duration_secs: f64,
    pub rows_extracted: usize,
    pub rows_transformed: usize,
    pub rows_loaded: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityReport>,
    pub phase_timings: Vec<PhaseTiming>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_phase: Option<Phase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineResult {
    pub fn new(start_time: DateTime<Local>) -> Self {
        Self {
            status: RunStatus::Failed,
            start_time,
            end_time: start_time,
            duration_secs: 0.0,
            rows_extracted: 0,
            rows_transformed: 0,
            rows_loaded: 0,
            quality: None,
            phase_timings: Vec::new(),
            failed_phase: None,
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for PipelineResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{}", rule)?;
        writeln!(f, "PIPELINE SUMMARY")?;
        writeln!(f, "{}", rule)?;
        writeln!(f, "  Status: {}", self.status)?;
        writeln!(f, "  Started: {}", self.start_time.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(f, "  Duration: {:.2} seconds", self.duration_secs)?;
        writeln!(f, "  Rows Extracted: {}", self.rows_extracted)?;
        writeln!(f, "  Rows Transformed: {}", self.rows_transformed)?;
        writeln!(f, "  Rows Loaded: {}", self.rows_loaded)?;
        if let Some(quality) = &self.quality {
            writeln!(f, "  Duplicate Rows: {}", quality.duplicates)?;
            writeln!(f, "  Missing Values: {}", quality.total_missing())?;
        }
        if let (Some(phase), Some(error)) = (self.failed_phase, &self.error) {
            writeln!(f, "  Failed Phase: {}", phase)?;
            writeln!(f, "  Error: {}", error)?;
        }
        write!(f, "{}", rule)
    }
}
