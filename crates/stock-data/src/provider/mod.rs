//! 시세 데이터 Provider 모듈.
//!
//! ## Alpha Vantage
//! - `AlphaVantageClient`: `TIME_SERIES_DAILY` (compact) 엔드포인트 클라이언트
//! - 응답에서 가장 최근 거래일 한 건만 검증된 `DailyBar`로 변환

pub mod alpha_vantage;

pub use alpha_vantage::{AlphaVantageClient, AlphaVantageConfig};

use async_trait::async_trait;
use stock_core::{DailyBar, Symbol};

use crate::error::FetchError;

/// 일봉 시세 Provider trait.
///
/// 구현체는 동시에 대기 중인 여러 호출자가 공유할 수 있어야 합니다.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Provider 이름.
    fn name(&self) -> &str;

    /// 한 심볼의 가장 최근 거래일 일봉을 조회합니다.
    async fn fetch_latest(&self, symbol: &Symbol) -> Result<DailyBar, FetchError>;
}
