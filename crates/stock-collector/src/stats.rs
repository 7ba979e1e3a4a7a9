//! 배치 실행 결과 보고서.

use serde::Serialize;
use std::time::Duration;
use stock_core::{FetchOutcome, Symbol};

/// 한 번의 배치 수집 결과 (심볼당 하나의 `FetchOutcome`).
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// 총 심볼 수
    pub total: usize,
    /// 성공 횟수
    pub succeeded: usize,
    /// 실패 횟수
    pub failed: usize,
    /// 저장된 총 일봉 수
    pub bars_written: u64,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
    /// 심볼별 결과 (입력 순서)
    pub outcomes: Vec<FetchOutcome>,
}

impl BatchReport {
    /// 심볼별 결과로 보고서를 만듭니다.
    pub fn from_outcomes(outcomes: Vec<FetchOutcome>, elapsed: Duration) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        Self {
            total: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            bars_written: outcomes.iter().map(|o| o.bars_written).sum(),
            elapsed,
            outcomes,
        }
    }

    /// 실패한 심볼 목록
    pub fn failed_symbols(&self) -> Vec<&Symbol> {
        self.outcomes
            .iter()
            .filter(|o| !o.is_success())
            .map(|o| &o.symbol)
            .collect()
    }

    /// 성공률 계산 (%)
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.succeeded as f64 / self.total as f64) * 100.0
        }
    }

    /// 통계 요약 로그 출력
    ///
    /// 실패한 심볼이 있으면 `warn` 레벨로 남깁니다.
    pub fn log_summary(&self, operation: &str) {
        if self.failed > 0 {
            let failed_symbols: Vec<&str> =
                self.failed_symbols().into_iter().map(Symbol::as_str).collect();
            tracing::warn!(
                operation = operation,
                total = self.total,
                succeeded = self.succeeded,
                failed = self.failed,
                bars_written = self.bars_written,
                failed_symbols = ?failed_symbols,
                success_rate = format!("{:.1}%", self.success_rate()),
                elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
                "수집 완료 (일부 심볼 저장 실패)"
            );
        } else {
            tracing::info!(
                operation = operation,
                total = self.total,
                succeeded = self.succeeded,
                bars_written = self.bars_written,
                success_rate = format!("{:.1}%", self.success_rate()),
                elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
                "수집 완료"
            );
        }
    }
}
