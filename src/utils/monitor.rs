use std::time::{Duration, Instant};

/// 記錄每個階段的耗時
#[derive(Debug)]
pub struct PhaseTimer {
    start_time: Instant,
    phase_start: Instant,
}

impl PhaseTimer {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start_time: now,
            phase_start: now,
        }
    }

    pub fn begin(&mut self) {
        self.phase_start = Instant::now();
    }

    /// 結束目前階段並回傳耗時
    pub fn end(&mut self, phase: &str) -> Duration {
        let elapsed = self.phase_start.elapsed();
        tracing::debug!("⏱️ {} finished in {:?}", phase, elapsed);
        elapsed
    }

    pub fn log_stats(&self, phase: &str) {
        tracing::info!(
            "📊 {} - Elapsed: {:?}, Total: {:?}",
            phase,
            self.phase_start.elapsed(),
            self.start_time.elapsed()
        );
    }

    pub fn log_final_stats(&self) {
        tracing::info!("📊 Final Stats - Total Time: {:?}", self.start_time.elapsed());
    }

    pub fn total(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl Default for PhaseTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_elapsed_within_total() {
        let mut timer = PhaseTimer::new();
        timer.begin();
        let extract = timer.end("extract");
        timer.begin();
        let transform = timer.end("transform");

        assert!(timer.total() >= extract + transform);
    }
}
