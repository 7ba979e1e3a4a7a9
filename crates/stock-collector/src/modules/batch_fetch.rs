//! 동시성 제한 배치 수집.
//!
//! 심볼마다 독립된 작업(조회 → upsert → 상태 갱신)을 생성하고, 공유 semaphore로
//! 동시에 실행되는 작업 수를 `concurrency` 이하로 제한합니다. permit은 입력 순서대로
//! 얻으므로 작업도 입력 순서대로 시작됩니다. 한 심볼의 실패는 해당 작업 안에서
//! `FetchOutcome::failed`로 변환되어 다른 심볼에 영향을 주지 않으며, 실패 알림은
//! permit을 반납한 뒤에 보냅니다. 모든 작업이 끝난 뒤에 배치가 완료됩니다.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use stock_core::{
    symbol_span, EventLevel, FailureKind, FetchOutcome, FetchStatus, PipelineEvent,
    SharedEventSink, Symbol,
};
use stock_data::{BarStore, MarketDataSource};
use stock_notification::{Alert, AlertSender};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::error::{CollectorError, Result, UnitError};
use crate::stats::BatchReport;

/// 배치 수집기.
#[derive(Clone)]
pub struct BatchFetcher {
    source: Arc<dyn MarketDataSource>,
    store: Arc<dyn BarStore>,
    alerts: Arc<dyn AlertSender>,
    events: SharedEventSink,
    concurrency: usize,
}

impl BatchFetcher {
    /// 새 배치 수집기를 생성합니다.
    ///
    /// `concurrency`가 0이면 설정 오류입니다.
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        store: Arc<dyn BarStore>,
        alerts: Arc<dyn AlertSender>,
        events: SharedEventSink,
        concurrency: usize,
    ) -> Result<Self> {
        if concurrency == 0 {
            return Err(CollectorError::Config(
                "concurrency must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            source,
            store,
            alerts,
            events,
            concurrency,
        })
    }

    /// 동시 실행 상한
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// 심볼 목록을 수집합니다.
    ///
    /// 심볼당 정확히 한 번 조회하고, 결과는 입력 순서대로 보고서에 담깁니다.
    /// 목록이 비어 있으면 아무것도 조회하지 않고 알림 한 건만 보냅니다.
    pub async fn run(&self, symbols: &[Symbol]) -> BatchReport {
        let started = Instant::now();

        if symbols.is_empty() {
            self.events.record(PipelineEvent::warn(
                "no_symbols",
                "No tickers to fetch today",
            ));
            self.send_alert(Alert::no_symbols()).await;
            return BatchReport::from_outcomes(Vec::new(), started.elapsed());
        }

        self.events.record(
            PipelineEvent::info(
                "batch_fetch",
                format!("Starting batch fetch for {} symbols", symbols.len()),
            )
            .with_field("symbol_count", symbols.len())
            .with_field("concurrency", self.concurrency),
        );

        let gate = Arc::new(Semaphore::new(self.concurrency));
        let progress: Vec<Arc<UnitProgress>> =
            symbols.iter().map(|_| Arc::new(UnitProgress::default())).collect();
        let mut units = JoinSet::new();

        for (index, symbol) in symbols.iter().enumerate() {
            // 입력 순서대로 permit을 얻은 뒤에 작업을 생성
            let permit = match Arc::clone(&gate).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    self.events.record(PipelineEvent::error(
                        "batch_fetch",
                        format!("Admission gate closed: {e}"),
                    ));
                    break;
                }
            };

            let fetcher = self.clone();
            let unit = Arc::clone(&progress[index]);
            let span = symbol_span!("fetch_symbol", symbol);
            let symbol = symbol.clone();

            units.spawn(
                async move {
                    let outcome = fetcher.process(&symbol, &unit).await;
                    // 알림 전송은 슬롯을 반납한 뒤에 수행
                    drop(permit);
                    if let Some(error) = outcome.error.as_deref() {
                        fetcher.alert_failure(&symbol, error, &unit).await;
                    }
                    (index, outcome)
                }
                .instrument(span),
            );
        }

        let mut slots: Vec<Option<FetchOutcome>> = vec![None; symbols.len()];
        while let Some(joined) = units.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => self.events.record(
                    PipelineEvent::error("fetch_symbol", format!("Fetch unit aborted: {e}"))
                        .with_field("panicked", e.is_panic()),
                ),
            }
        }

        // 중단된 작업도 실패로 기록해 심볼당 결과가 하나씩 남도록 함
        let mut outcomes = Vec::with_capacity(symbols.len());
        for ((symbol, slot), unit) in symbols.iter().zip(slots).zip(&progress) {
            let outcome = match slot {
                Some(outcome) => outcome,
                None => self.recover(symbol, unit).await,
            };
            outcomes.push(outcome);
        }

        let report = BatchReport::from_outcomes(outcomes, started.elapsed());
        let level = if report.failed > 0 {
            EventLevel::Warn
        } else {
            EventLevel::Info
        };
        self.events.record(
            PipelineEvent::new(
                level,
                "batch_fetch",
                format!(
                    "Batch fetch completed: {} succeeded, {} failed",
                    report.succeeded, report.failed
                ),
            )
            .with_field("symbol_count", report.total)
            .with_field("success_count", report.succeeded)
            .with_field("failed_count", report.failed)
            .with_field("bars_written", report.bars_written)
            .with_field("duration_ms", millis(report.elapsed)),
        );

        report
    }

    /// 심볼 하나를 처리하고 상태와 이벤트를 기록합니다. 오류를 밖으로 내보내지 않습니다.
    async fn process(&self, symbol: &Symbol, unit: &UnitProgress) -> FetchOutcome {
        let started = Instant::now();

        match self.fetch_and_store(symbol).await {
            Ok(bars_written) => {
                let elapsed = started.elapsed();
                self.record_status(symbol, FetchStatus::Success, unit).await;
                self.events.record(
                    PipelineEvent::info("fetch_symbol", format!("Fetched and stored {symbol}"))
                        .with_field("symbol", symbol.as_str())
                        .with_field("bars_written", bars_written)
                        .with_field("duration_ms", millis(elapsed)),
                );
                FetchOutcome::succeeded(symbol.clone(), bars_written, elapsed)
            }
            Err(e) => {
                self.record_failure(symbol, e.kind(), e.to_string(), started.elapsed(), unit)
                    .await
            }
        }
    }

    async fn fetch_and_store(&self, symbol: &Symbol) -> std::result::Result<u64, UnitError> {
        let bar = self.source.fetch_latest(symbol).await?;
        let written = self.store.upsert_bars(std::slice::from_ref(&bar)).await?;
        Ok(written)
    }

    /// 결과 없이 끝난 작업을 실패로 마무리합니다.
    ///
    /// 작업이 이미 수행한 상태 갱신과 알림은 반복하지 않습니다.
    async fn recover(&self, symbol: &Symbol, unit: &UnitProgress) -> FetchOutcome {
        let error = "fetch unit terminated unexpectedly";
        let outcome = self
            .record_failure(symbol, FailureKind::Internal, error.to_string(), Duration::ZERO, unit)
            .await;
        self.alert_failure(symbol, error, unit).await;
        outcome
    }

    async fn record_failure(
        &self,
        symbol: &Symbol,
        kind: FailureKind,
        error: String,
        elapsed: Duration,
        unit: &UnitProgress,
    ) -> FetchOutcome {
        self.record_status(symbol, FetchStatus::Failed, unit).await;
        self.events.record(
            PipelineEvent::error("fetch_symbol", format!("Error fetching {symbol}: {error}"))
                .with_field("symbol", symbol.as_str())
                .with_field("error_kind", kind.as_str())
                .with_field("error", error.as_str())
                .with_field("duration_ms", millis(elapsed)),
        );

        FetchOutcome::failed(symbol.clone(), kind, error, elapsed)
    }

    /// 상태 갱신 실패는 이미 저장된 일봉에 영향을 주지 않습니다.
    async fn record_status(&self, symbol: &Symbol, status: FetchStatus, unit: &UnitProgress) {
        if unit.status_written.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.store.update_ticker_status(symbol, status).await {
            self.events.record(
                PipelineEvent::error(
                    "update_ticker_status",
                    format!("Failed to update ticker status for {symbol}: {e}"),
                )
                .with_field("symbol", symbol.as_str())
                .with_field("status", status.as_str())
                .with_field("error", e.to_string()),
            );
        }
    }

    async fn alert_failure(&self, symbol: &Symbol, error: &str, unit: &UnitProgress) {
        if unit.alert_sent.swap(true, Ordering::SeqCst) {
            return;
        }
        self.send_alert(Alert::fetch_failure(symbol.as_str(), error))
            .await;
    }

    async fn send_alert(&self, alert: Alert) {
        if let Err(e) = self.alerts.send(&alert).await {
            self.events.record(
                PipelineEvent::warn("send_alert", format!("Alert not delivered: {e}"))
                    .with_field("subject", alert.subject.as_str())
                    .with_field("error", e.to_string()),
            );
        }
    }
}

/// 심볼 작업이 이미 수행한 쓰기.
#[derive(Debug, Default)]
struct UnitProgress {
    status_written: AtomicBool,
    alert_sent: AtomicBool,
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
