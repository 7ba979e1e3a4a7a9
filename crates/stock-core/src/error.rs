//! 파이프라인 핵심 에러 타입.

use thiserror::Error;

/// 도메인 값 검증 에러.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// 잘못된 심볼
    #[error("잘못된 심볼: {0}")]
    InvalidSymbol(String),

    /// 잘못된 일봉 데이터
    #[error("잘못된 일봉 데이터 ({symbol}): {reason}")]
    InvalidBar { symbol: String, reason: String },
}

/// 핵심 작업을 위한 Result 타입.
pub type CoreResult<T> = Result<T, CoreError>;
