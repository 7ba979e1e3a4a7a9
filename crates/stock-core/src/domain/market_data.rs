//! 일봉 시장 데이터 타입.
//!
//! `DailyBar`는 한 종목의 하루치 OHLCV 관측값입니다.
//! (symbol, trading_day) 쌍이 하나의 일봉을 고유하게 식별합니다.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::Symbol;

/// 하루치 OHLCV 일봉.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    /// 티커 심볼
    pub symbol: Symbol,
    /// 거래일 (타임스탬프가 아닌 날짜)
    pub trading_day: NaiveDate,
    /// 시가
    pub open: f64,
    /// 고가
    pub high: f64,
    /// 저가
    pub low: f64,
    /// 종가
    pub close: f64,
    /// 거래량
    pub volume: i64,
}

impl DailyBar {
    /// 검증된 일봉을 생성합니다.
    ///
    /// 모든 가격은 유한한 양수여야 하고, 거래량은 음수일 수 없습니다.
    pub fn new(
        symbol: Symbol,
        trading_day: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: i64,
    ) -> CoreResult<Self> {
        let bar = Self {
            symbol,
            trading_day,
            open,
            high,
            low,
            close,
            volume,
        };
        bar.validate()?;
        Ok(bar)
    }

    /// 가격과 거래량 불변식을 확인합니다.
    pub fn validate(&self) -> CoreResult<()> {
        for (field, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(CoreError::InvalidBar {
                    symbol: self.symbol.to_string(),
                    reason: format!("{field} 가격이 양수가 아님: {value}"),
                });
            }
        }
        if self.volume < 0 {
            return Err(CoreError::InvalidBar {
                symbol: self.symbol.to_string(),
                reason: format!("음수 거래량: {}", self.volume),
            });
        }
        Ok(())
    }

    /// 저장 키 (symbol, trading_day)를 반환합니다.
    pub fn key(&self) -> (&Symbol, NaiveDate) {
        (&self.symbol, self.trading_day)
    }
}
