//! 에러 타입 정의.

use stock_core::FailureKind;
use stock_data::{DataError, FetchError};
use thiserror::Error;

/// Collector 에러 타입.
///
/// 실행 전체를 중단시키는 오류만 여기에 해당합니다 (설정 누락, DB 연결 불가,
/// HTTP 세션 생성 실패). 심볼 단위 실패는 [`UnitError`]로 처리됩니다.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// 설정 에러
    #[error("Configuration error: {0}")]
    Config(String),

    /// 데이터베이스 에러
    #[error("Database error: {0}")]
    Database(#[from] DataError),

    /// HTTP 세션 생성 에러
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// 입력 데이터 에러
    #[error("Invalid input: {0}")]
    Data(#[from] stock_core::CoreError),
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;

/// 심볼 하나의 수집/저장 실패.
///
/// 해당 심볼 작업 안에서 `FetchOutcome::failed`로 변환되며 밖으로 전파되지 않습니다.
#[derive(Debug, Error)]
pub enum UnitError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to persist bars: {0}")]
    Persist(#[from] DataError),
}

impl UnitError {
    /// 실패 분류
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Fetch(e) => e.kind(),
            Self::Persist(_) => FailureKind::Persistence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stock_core::Symbol;

    #[test]
    fn test_unit_error_kind() {
        let symbol = Symbol::parse("BADSYM").unwrap();
        let fetch: UnitError = FetchError::data_format(&symbol, "missing series").into();
        assert_eq!(fetch.kind(), FailureKind::DataFormat);
        assert!(fetch.to_string().starts_with("Unexpected API response for BADSYM"));

        let persist: UnitError = DataError::InsertError("connection reset".to_string()).into();
        assert_eq!(persist.kind(), FailureKind::Persistence);
    }
}
