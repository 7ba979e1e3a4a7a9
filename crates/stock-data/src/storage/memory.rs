//! 인메모리 일봉/티커 저장소.
//!
//! `PgRecordStore`와 같은 계약(배치 단위 원자적 upsert, 마지막 쓰기 우선,
//! 알 수 없는 심볼의 상태 갱신은 0행)을 따릅니다. 테스트와 dry-run에서 사용하며,
//! 특정 심볼의 저장 실패를 주입할 수 있습니다.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use stock_core::{DailyBar, FetchStatus, PipelineEvent, SharedEventSink, Symbol};

use super::{dedup_last_wins, BarStore, SymbolSource, TickerRecord};
use crate::error::{DataError, Result};

#[derive(Debug, Default)]
struct State {
    bars: BTreeMap<(Symbol, NaiveDate), DailyBar>,
    tickers: BTreeMap<Symbol, TickerRecord>,
    status_updates: Vec<(Symbol, FetchStatus)>,
    failing_upserts: HashSet<Symbol>,
}

/// 인메모리 저장소.
pub struct MemoryRecordStore {
    state: Mutex<State>,
    events: SharedEventSink,
    stale_after: Duration,
}

impl MemoryRecordStore {
    pub fn new(events: SharedEventSink) -> Self {
        Self {
            state: Mutex::new(State::default()),
            events,
            stale_after: Duration::days(1),
        }
    }

    /// 재수집 기준 기간을 설정합니다.
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 티커를 등록하거나 다시 활성화합니다.
    pub fn add_tickers(&self, symbols: &[Symbol]) {
        let mut state = self.lock();
        for symbol in symbols {
            state
                .tickers
                .entry(symbol.clone())
                .and_modify(|t| t.is_active = true)
                .or_insert_with(|| TickerRecord {
                    symbol: symbol.clone(),
                    is_active: true,
                    last_fetched: None,
                    last_status: None,
                });
        }
    }

    /// 티커 레코드를 그대로 저장합니다.
    pub fn put_ticker(&self, record: TickerRecord) {
        self.lock().tickers.insert(record.symbol.clone(), record);
    }

    /// 티커 레코드를 조회합니다.
    pub fn ticker(&self, symbol: &Symbol) -> Option<TickerRecord> {
        self.lock().tickers.get(symbol).cloned()
    }

    /// 이 심볼이 포함된 upsert 배치를 실패시킵니다.
    pub fn fail_upserts_for(&self, symbol: Symbol) {
        self.lock().failing_upserts.insert(symbol);
    }

    /// 저장된 전체 일봉 (키 순서).
    pub fn bars(&self) -> Vec<DailyBar> {
        self.lock().bars.values().cloned().collect()
    }

    /// 심볼의 일봉 수
    pub fn bar_count(&self, symbol: &Symbol) -> usize {
        self.lock().bars.keys().filter(|(s, _)| s == symbol).count()
    }

    /// 특정 거래일의 일봉
    pub fn bar(&self, symbol: &Symbol, trading_day: NaiveDate) -> Option<DailyBar> {
        self.lock()
            .bars
            .get(&(symbol.clone(), trading_day))
            .cloned()
    }

    /// 요청된 상태 갱신 이력 (등록되지 않은 심볼 포함).
    pub fn status_updates(&self) -> Vec<(Symbol, FetchStatus)> {
        self.lock().status_updates.clone()
    }
}

#[async_trait]
impl BarStore for MemoryRecordStore {
    async fn upsert_bars(&self, bars: &[DailyBar]) -> Result<u64> {
        if bars.is_empty() {
            return Ok(0);
        }

        let rows = dedup_last_wins(bars);
        let mut state = self.lock();

        // 모두 검증한 뒤에만 반영 (부분 커밋 없음)
        if let Some(bad) = rows.iter().find(|b| state.failing_upserts.contains(&b.symbol)) {
            let err = DataError::InsertError(format!("injected failure for {}", bad.symbol));
            drop(state);
            self.events.record(
                PipelineEvent::error("upsert_bars", format!("Failed to upsert stock data: {err}"))
                    .with_field("record_count", rows.len())
                    .with_field("error", err.to_string()),
            );
            return Err(err);
        }
        for bar in &rows {
            bar.validate()?;
        }

        for bar in &rows {
            state
                .bars
                .insert((bar.symbol.clone(), bar.trading_day), (*bar).clone());
        }
        drop(state);

        let written = rows.len() as u64;
        self.events.record(
            PipelineEvent::info("upsert_bars", format!("Upserted {written} stock data records"))
                .with_field("record_count", written),
        );
        Ok(written)
    }

    async fn update_ticker_status(&self, symbol: &Symbol, status: FetchStatus) -> Result<u64> {
        let rows_affected = {
            let mut state = self.lock();
            state.status_updates.push((symbol.clone(), status));
            match state.tickers.get_mut(symbol) {
                Some(ticker) => {
                    ticker.last_status = Some(status);
                    ticker.last_fetched = Some(Utc::now());
                    1
                }
                None => 0,
            }
        };

        let event = if rows_affected == 0 {
            PipelineEvent::warn(
                "update_ticker_status",
                format!("Ticker {symbol} not registered, status not recorded"),
            )
        } else {
            PipelineEvent::info(
                "update_ticker_status",
                format!("Updated ticker status for {symbol} to {status}"),
            )
        };
        self.events.record(
            event
                .with_field("symbol", symbol.as_str())
                .with_field("status", status.as_str())
                .with_field("rows_affected", rows_affected),
        );

        Ok(rows_affected)
    }
}

#[async_trait]
impl SymbolSource for MemoryRecordStore {
    async fn symbols_to_fetch(&self) -> Result<Vec<Symbol>> {
        let threshold = Utc::now()
            .checked_sub_signed(self.stale_after)
            .unwrap_or(DateTime::UNIX_EPOCH);
        let symbols: Vec<Symbol> = self
            .lock()
            .tickers
            .values()
            .filter(|t| t.needs_refresh(threshold))
            .map(|t| t.symbol.clone())
            .collect();

        self.events.record(
            PipelineEvent::info(
                "get_symbols_to_fetch",
                format!("Retrieved {} symbols to fetch", symbols.len()),
            )
            .with_field("symbol_count", symbols.len())
            .with_field("query_date_threshold", threshold.to_rfc3339()),
        );

        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use stock_core::MemoryEventSink;

    fn symbol(s: &str) -> Symbol {
        Symbol::parse(s).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    fn bar(s: &str, close: f64) -> DailyBar {
        DailyBar::new(symbol(s), day(), 10.0, 12.0, 9.0, close, 1_000).unwrap()
    }

    fn store() -> MemoryRecordStore {
        MemoryRecordStore::new(Arc::new(MemoryEventSink::new()))
    }

    #[tokio::test]
    async fn test_upsert_twice_keeps_single_latest_row() {
        let store = store();
        store.upsert_bars(&[bar("AAPL", 11.0)]).await.unwrap();
        store.upsert_bars(&[bar("AAPL", 11.5)]).await.unwrap();

        assert_eq!(store.bar_count(&symbol("AAPL")), 1);
        assert_eq!(store.bar(&symbol("AAPL"), day()).unwrap().close, 11.5);
    }

    #[tokio::test]
    async fn test_failed_batch_writes_nothing() {
        let store = store();
        store.fail_upserts_for(symbol("MSFT"));

        let result = store.upsert_bars(&[bar("AAPL", 11.0), bar("MSFT", 20.0)]).await;

        assert!(result.is_err());
        assert!(store.bars().is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch_is_noop() {
        let store = store();
        assert_eq!(store.upsert_bars(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_symbol_status_update_reports_zero_rows() {
        let events = Arc::new(MemoryEventSink::new());
        let store = MemoryRecordStore::new(events.clone());

        let rows = store
            .update_ticker_status(&symbol("GHOST"), FetchStatus::Success)
            .await
            .unwrap();

        assert_eq!(rows, 0);
        let recorded = events.by_operation("update_ticker_status");
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].level, stock_core::EventLevel::Warn);
    }

    #[tokio::test]
    async fn test_symbols_to_fetch_selection() {
        let store = store();
        store.add_tickers(&[symbol("AAPL"), symbol("MSFT"), symbol("IBM"), symbol("OLD")]);
        store.put_ticker(TickerRecord {
            symbol: symbol("OLD"),
            is_active: false,
            last_fetched: None,
            last_status: None,
        });

        store
            .update_ticker_status(&symbol("AAPL"), FetchStatus::Success)
            .await
            .unwrap();
        store
            .update_ticker_status(&symbol("MSFT"), FetchStatus::Failed)
            .await
            .unwrap();

        let symbols = store.symbols_to_fetch().await.unwrap();
        assert_eq!(symbols, vec![symbol("IBM"), symbol("MSFT")]);
    }

    #[tokio::test]
    async fn test_stale_ticker_is_selected() {
        let store = store();
        store.put_ticker(TickerRecord {
            symbol: symbol("AAPL"),
            is_active: true,
            last_fetched: Some(Utc::now() - Duration::hours(25)),
            last_status: Some(FetchStatus::Success),
        });

        assert_eq!(store.symbols_to_fetch().await.unwrap(), vec![symbol("AAPL")]);
    }

    #[tokio::test]
    async fn test_oversized_freshness_threshold_saturates() {
        let store = store().with_stale_after(Duration::MAX);
        store.put_ticker(TickerRecord {
            symbol: symbol("AAPL"),
            is_active: true,
            last_fetched: Some(Utc::now() - Duration::days(365)),
            last_status: Some(FetchStatus::Success),
        });
        store.add_tickers(&[symbol("NEW")]);

        assert_eq!(store.symbols_to_fetch().await.unwrap(), vec![symbol("NEW")]);
    }
}
