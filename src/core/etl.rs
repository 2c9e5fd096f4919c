use crate::core::report::{PhaseTiming, PipelineResult, RunStatus};
use crate::core::{Pipeline, RecordBatch};
use crate::utils::error::{EtlError, Result};
use crate::utils::monitor::PhaseTimer;
use chrono::Local;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Extract,
    Transform,
    Load,
    Verify,
}

impl Phase {
    pub const FIRST: Phase = Phase::Extract;

    /// 固定順序，沒有分支也沒有重試
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Extract => Some(Phase::Transform),
            Phase::Transform => Some(Phase::Load),
            Phase::Load => Some(Phase::Verify),
            Phase::Verify => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Extract => "extract",
            Phase::Transform => "transform",
            Phase::Load => "load",
            Phase::Verify => "verify",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 階段之間傳遞的資料
#[derive(Debug, Default)]
struct RunState {
    raw: Option<RecordBatch>,
    cleaned: Option<RecordBatch>,
}

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    /// 依序執行各階段；任何階段失敗即停止，結果一律回傳
    pub async fn run(&self) -> PipelineResult {
        tracing::info!("🚀 Starting HR ETL pipeline");

        let mut result = PipelineResult::new(Local::now());
        let mut state = RunState::default();
        let mut timer = PhaseTimer::new();
        let mut phase = Some(Phase::FIRST);

        while let Some(current) = phase {
            tracing::info!("▶️ Phase: {}", current.as_str().to_uppercase());
            timer.begin();
            let outcome = self.step(current, &mut state, &mut result).await;
            let elapsed = timer.end(current.as_str());
            result.phase_timings.push(PhaseTiming {
                phase: current,
                duration_secs: elapsed.as_secs_f64(),
            });

            match outcome {
                Ok(()) => {
                    timer.log_stats(current.as_str());
                    phase = current.next();
                }
                Err(e) => {
                    tracing::error!(
                        "❌ Pipeline failed during {}: {} (Category: {:?})",
                        current,
                        e,
                        e.category()
                    );
                    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
                    result.failed_phase = Some(current);
                    result.error = Some(e.to_string());
                    break;
                }
            }
        }

        if result.failed_phase.is_none() {
            result.status = RunStatus::Success;
        }
        result.end_time = Local::now();
        result.duration_secs = timer.total().as_secs_f64();
        timer.log_final_stats();

        result
    }

    /// 執行單一階段並更新計數
    async fn step(
        &self,
        phase: Phase,
        state: &mut RunState,
        result: &mut PipelineResult,
    ) -> Result<()> {
        match phase {
            Phase::Extract => {
                let batch = self.pipeline.extract().await?;
                result.rows_extracted = batch.num_rows();
                state.raw = Some(batch);
            }
            Phase::Transform => {
                let raw = state.raw.take().ok_or_else(|| missing_input(phase))?;
                let output = self.pipeline.transform(&raw).await?;
                result.rows_transformed = output.batch.num_rows();

                let report = &output.report;
                tracing::info!(
                    "📋 Data quality - Rows: {}, Columns: {}, Duplicates: {}, Missing values: {}",
                    report.total_rows,
                    report.total_columns,
                    report.duplicates,
                    report.total_missing()
                );
                result.quality = Some(output.report);
                state.cleaned = Some(output.batch);
            }
            Phase::Load => {
                let cleaned = state.cleaned.as_ref().ok_or_else(|| missing_input(phase))?;
                self.pipeline.load(cleaned).await?;
            }
            Phase::Verify => {
                result.rows_loaded = self.pipeline.verify().await?;
            }
        }
        Ok(())
    }
}

fn missing_input(phase: Phase) -> EtlError {
    EtlError::ProcessingError {
        message: format!("{} phase started without input data", phase),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LoadSummary, QualityReport, TransformOutput, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 可指定在哪個階段失敗的測試用 pipeline
    struct MockPipeline {
        fail_at: Option<Phase>,
        calls: AtomicUsize,
    }

    impl MockPipeline {
        fn new(fail_at: Option<Phase>) -> Self {
            Self {
                fail_at,
                calls: AtomicUsize::new(0),
            }
        }

        fn check(&self, phase: Phase) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_at == Some(phase) {
                return Err(match phase {
                    Phase::Extract => EtlError::SourceNotFound {
                        path: "missing.csv".to_string(),
                    },
                    Phase::Transform => EtlError::schema("required column 'age' is missing"),
                    Phase::Load => EtlError::connection("connection refused"),
                    Phase::Verify => EtlError::verification("employees", "relation missing"),
                });
            }
            Ok(())
        }
    }

    fn sample_batch(rows: usize) -> RecordBatch {
        RecordBatch::new(
            vec!["id".to_string()],
            (0..rows).map(|i| vec![Value::Integer(i as i64)]).collect(),
        )
        .unwrap()
    }

    #[async_trait::async_trait]
    impl Pipeline for MockPipeline {
        async fn extract(&self) -> Result<RecordBatch> {
            self.check(Phase::Extract)?;
            Ok(sample_batch(10))
        }

        async fn transform(&self, batch: &RecordBatch) -> Result<TransformOutput> {
            self.check(Phase::Transform)?;
            assert_eq!(batch.num_rows(), 10);
            let cleaned = sample_batch(7);
            let report = QualityReport::from_batch(&cleaned);
            Ok(TransformOutput {
                batch: cleaned,
                report,
            })
        }

        async fn load(&self, batch: &RecordBatch) -> Result<LoadSummary> {
            self.check(Phase::Load)?;
            Ok(LoadSummary {
                table: "employees".to_string(),
                rows_written: batch.num_rows(),
                chunks: 1,
            })
        }

        async fn verify(&self) -> Result<usize> {
            self.check(Phase::Verify)?;
            Ok(7)
        }
    }

    #[test]
    fn test_phase_transitions() {
        let mut order = vec![Phase::FIRST];
        while let Some(next) = order.last().and_then(|p| p.next()) {
            order.push(next);
        }
        assert_eq!(
            order,
            vec![Phase::Extract, Phase::Transform, Phase::Load, Phase::Verify]
        );
    }

    #[tokio::test]
    async fn test_successful_run() {
        let engine = EtlEngine::new(MockPipeline::new(None));
        let result = engine.run().await;

        assert_eq!(result.status, RunStatus::Success);
        assert_eq!(result.rows_extracted, 10);
        assert_eq!(result.rows_transformed, 7);
        assert_eq!(result.rows_loaded, 7);
        assert_eq!(result.phase_timings.len(), 4);
        assert!(result.error.is_none());
        assert!(result.end_time >= result.start_time);
        assert_eq!(result.quality.as_ref().map(|q| q.total_rows), Some(7));
    }

    #[tokio::test]
    async fn test_extract_failure_short_circuits() {
        let engine = EtlEngine::new(MockPipeline::new(Some(Phase::Extract)));
        let result = engine.run().await;

        assert_eq!(result.status, RunStatus::Failed);
        assert_eq!(result.failed_phase, Some(Phase::Extract));
        assert!(!result.error.as_deref().unwrap_or("").is_empty());
        assert_eq!(result.rows_extracted, 0);
        assert_eq!(result.rows_transformed, 0);
        assert_eq!(result.rows_loaded, 0);
        assert_eq!(engine.pipeline().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transform_failure_keeps_extract_count() {
        let engine = EtlEngine::new(MockPipeline::new(Some(Phase::Transform)));
        let result = engine.run().await;

        assert_eq!(result.status, RunStatus::Failed);
        assert_eq!(result.rows_extracted, 10);
        assert_eq!(result.rows_transformed, 0);
        assert!(result.quality.is_none());
    }

    #[tokio::test]
    async fn test_load_failure_leaves_rows_loaded_at_zero() {
        let engine = EtlEngine::new(MockPipeline::new(Some(Phase::Load)));
        let result = engine.run().await;

        assert_eq!(result.status, RunStatus::Failed);
        assert_eq!(result.failed_phase, Some(Phase::Load));
        assert_eq!(result.rows_extracted, 10);
        assert_eq!(result.rows_transformed, 7);
        assert_eq!(result.rows_loaded, 0);
        assert!(result.error.unwrap().contains("connection refused"));
        assert_eq!(engine.pipeline().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_verify_failure_fails_the_run() {
        let engine = EtlEngine::new(MockPipeline::new(Some(Phase::Verify)));
        let result = engine.run().await;

        assert_eq!(result.status, RunStatus::Failed);
        assert_eq!(result.failed_phase, Some(Phase::Verify));
        assert_eq!(result.rows_loaded, 0);
    }
}
