//! 일봉 및 티커 상태 저장소.
//!
//! - `PgRecordStore`: PostgreSQL 저장소 (운영)
//! - `MemoryRecordStore`: 같은 계약을 따르는 인메모리 저장소

pub mod memory;
pub mod postgres;

pub use memory::MemoryRecordStore;
pub use postgres::{PgRecordStore, StoreConfig};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stock_core::{DailyBar, FetchStatus, Symbol};

use crate::error::Result;

/// 티커 레코드 (tickers 테이블 행).
#[derive(Debug, Clone, PartialEq)]
pub struct TickerRecord {
    pub symbol: Symbol,
    pub is_active: bool,
    pub last_fetched: Option<DateTime<Utc>>,
    pub last_status: Option<FetchStatus>,
}

impl TickerRecord {
    /// 수집 대상인지 판단합니다.
    ///
    /// 활성 상태이면서 한 번도 수집되지 않았거나, `threshold` 이전에 수집되었거나,
    /// 직전 수집이 실패한 경우입니다.
    pub fn needs_refresh(&self, threshold: DateTime<Utc>) -> bool {
        self.is_active
            && (self.last_fetched.map_or(true, |t| t < threshold)
                || self.last_status == Some(FetchStatus::Failed))
    }
}

/// 일봉 저장 및 티커 상태 갱신 trait.
#[async_trait]
pub trait BarStore: Send + Sync {
    /// 일봉을 한 트랜잭션으로 upsert합니다.
    ///
    /// (symbol, trading_day) 충돌 시 OHLCV 값을 새 값으로 덮어씁니다.
    /// 일부만 커밋되는 경우는 없으며, 실패 시 전체가 롤백됩니다.
    /// 반환값은 기록된 행 수입니다.
    async fn upsert_bars(&self, bars: &[DailyBar]) -> Result<u64>;

    /// 티커의 마지막 상태와 수집 시각을 갱신합니다.
    ///
    /// 알 수 없는 심볼이면 0을 반환합니다 (오류 아님).
    async fn update_ticker_status(&self, symbol: &Symbol, status: FetchStatus) -> Result<u64>;
}

/// 수집 대상 심볼 목록 제공 trait.
#[async_trait]
pub trait SymbolSource: Send + Sync {
    /// 갱신이 필요한 활성 심볼 목록을 반환합니다.
    async fn symbols_to_fetch(&self) -> Result<Vec<Symbol>>;
}

/// 배치 내 같은 키가 여러 번 나오면 마지막 값만 남깁니다 (입력 순서 유지).
pub(crate) fn dedup_last_wins(bars: &[DailyBar]) -> Vec<&DailyBar> {
    let mut result: Vec<&DailyBar> = Vec::with_capacity(bars.len());
    for bar in bars {
        if let Some(existing) = result.iter_mut().find(|b| b.key() == bar.key()) {
            *existing = bar;
        } else {
            result.push(bar);
        }
    }
    result
}
