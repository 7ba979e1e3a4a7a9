//! 심볼별 수집 결과 및 티커 상태.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::types::Symbol;

/// 심볼별 수집 상태 (tickers.last_status 컬럼 값).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    /// 수집 및 저장 성공
    Success,
    /// 수집 또는 저장 실패
    Failed,
}

impl FetchStatus {
    /// DB 저장용 문자열로 변환
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FetchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown fetch status: {}", s)),
        }
    }
}

/// 심볼 단위 실패 분류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// 네트워크/타임아웃
    Transport,
    /// 예상하지 못한 응답 형식
    DataFormat,
    /// 제공자가 요청을 거부 (API 키, 호출 한도 등)
    Rejected,
    /// DB 저장 실패
    Persistence,
    /// 작업 단위 내부 오류 (panic 등)
    Internal,
}

impl FailureKind {
    /// 로그 필드용 문자열
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::DataFormat => "data_format",
            Self::Rejected => "rejected",
            Self::Persistence => "persistence",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 한 심볼에 대한 수집 시도 결과.
///
/// 저장되지 않으며, 티커 상태 갱신과 알림 여부 결정에 바로 사용됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchOutcome {
    /// 티커 심볼
    pub symbol: Symbol,
    /// 결과 상태
    pub status: FetchStatus,
    /// 저장된 일봉 수 (단일 일자 정책상 0 또는 1)
    pub bars_written: u64,
    /// 실패 분류 (실패 시에만 존재)
    pub failure: Option<FailureKind>,
    /// 에러 설명 (실패 시에만 존재)
    pub error: Option<String>,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl FetchOutcome {
    /// 성공 결과를 생성합니다.
    pub fn succeeded(symbol: Symbol, bars_written: u64, elapsed: Duration) -> Self {
        Self {
            symbol,
            status: FetchStatus::Success,
            bars_written,
            failure: None,
            error: None,
            elapsed,
        }
    }

    /// 실패 결과를 생성합니다.
    pub fn failed(
        symbol: Symbol,
        kind: FailureKind,
        error: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            symbol,
            status: FetchStatus::Failed,
            bars_written: 0,
            failure: Some(kind),
            error: Some(error.into()),
            elapsed,
        }
    }

    /// 성공 여부
    pub fn is_success(&self) -> bool {
        self.status == FetchStatus::Success
    }
}
