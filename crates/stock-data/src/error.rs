//! 데이터 모듈 오류 타입.

use stock_core::{CoreError, FailureKind, Symbol};
use thiserror::Error;

/// 저장소 관련 오류.
#[derive(Debug, Error)]
pub enum DataError {
    /// 데이터베이스 연결 오류
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    /// 쿼리 실행 오류
    #[error("Query error: {0}")]
    QueryError(String),

    /// 중복 레코드
    #[error("Duplicate record: {0}")]
    DuplicateError(String),

    /// 잘못된 데이터 형식
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// 마이그레이션 오류
    #[error("Migration error: {0}")]
    MigrationError(String),

    /// 연결 풀 소진
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// 데이터 삽입 오류
    #[error("Insert error: {0}")]
    InsertError(String),

    /// 데이터 갱신 오류
    #[error("Update error: {0}")]
    UpdateError(String),
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => DataError::PoolExhausted,
            sqlx::Error::Io(e) => DataError::ConnectionError(e.to_string()),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().unwrap_or_default();
                if code == "23505" {
                    // PostgreSQL 고유 제약 조건 위반
                    DataError::DuplicateError(db_err.message().to_string())
                } else {
                    DataError::QueryError(db_err.message().to_string())
                }
            }
            _ => DataError::QueryError(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DataError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DataError::MigrationError(err.to_string())
    }
}

impl From<CoreError> for DataError {
    fn from(err: CoreError) -> Self {
        DataError::InvalidData(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DataError>;

/// 시세 제공자 요청 오류.
///
/// 모든 변형은 원인 심볼을 포함하며, 내부에서 재시도하지 않습니다.
#[derive(Debug, Error)]
pub enum FetchError {
    /// 네트워크 전송 실패
    #[error("transport error for {symbol}: {source}")]
    Transport {
        symbol: Symbol,
        #[source]
        source: reqwest::Error,
    },

    /// 요청 타임아웃
    #[error("request for {symbol} timed out: {source}")]
    Timeout {
        symbol: Symbol,
        #[source]
        source: reqwest::Error,
    },

    /// 응답 형식 오류 (필드 누락, 숫자 변환 실패 등)
    #[error("Unexpected API response for {symbol}: {reason}")]
    DataFormat { symbol: Symbol, reason: String },

    /// 제공자가 요청을 거부 (잘못된 API 키, 호출 한도 초과 등)
    #[error("request for {symbol} rejected by provider: {message}")]
    Rejected { symbol: Symbol, message: String },
}

impl FetchError {
    /// reqwest 오류를 타임아웃/전송 오류로 분류합니다.
    pub fn from_reqwest(symbol: &Symbol, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout {
                symbol: symbol.clone(),
                source,
            }
        } else if source.is_decode() {
            Self::DataFormat {
                symbol: symbol.clone(),
                reason: format!("invalid JSON body: {source}"),
            }
        } else {
            Self::Transport {
                symbol: symbol.clone(),
                source,
            }
        }
    }

    pub fn data_format(symbol: &Symbol, reason: impl Into<String>) -> Self {
        Self::DataFormat {
            symbol: symbol.clone(),
            reason: reason.into(),
        }
    }

    /// 오류가 발생한 심볼
    pub fn symbol(&self) -> &Symbol {
        match self {
            Self::Transport { symbol, .. }
            | Self::Timeout { symbol, .. }
            | Self::DataFormat { symbol, .. }
            | Self::Rejected { symbol, .. } => symbol,
        }
    }

    /// 실패 분류
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Transport { .. } | Self::Timeout { .. } => FailureKind::Transport,
            Self::DataFormat { .. } => FailureKind::DataFormat,
            Self::Rejected { .. } => FailureKind::Rejected,
        }
    }
}
