//! 알림 타입 및 trait 정의.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 채널별 전송 요청 타임아웃 기본값
pub const DEFAULT_ALERT_TIMEOUT: Duration = Duration::from_secs(10);

/// `ALERT_TIMEOUT_SECS` 환경 변수의 전송 타임아웃 (없거나 잘못되면 기본값).
pub fn alert_timeout_from_env() -> Duration {
    std::env::var("ALERT_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_ALERT_TIMEOUT)
}

/// 알림 우선순위 레벨.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertPriority {
    /// 정보성
    Low,
    /// 일반 (확인 필요)
    #[default]
    Normal,
    /// 즉시 대응 필요
    Critical,
}

impl AlertPriority {
    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Low => "ℹ️",
            Self::Normal => "⚠️",
            Self::Critical => "🚨",
        }
    }
}

/// 운영자에게 보내는 알림 메시지.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// 고유 알림 ID
    pub id: String,
    /// 제목
    pub subject: String,
    /// 본문
    pub body: String,
    /// 우선순위 레벨
    pub priority: AlertPriority,
    /// 타임스탬프
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    /// 새 알림을 생성합니다.
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            subject: subject.into(),
            body: body.into(),
            priority: AlertPriority::Normal,
            timestamp: Utc::now(),
        }
    }

    /// 우선순위 레벨을 설정합니다.
    pub fn with_priority(mut self, priority: AlertPriority) -> Self {
        self.priority = priority;
        self
    }

    /// 심볼 수집 실패 알림.
    pub fn fetch_failure(symbol: &str, error: &str) -> Self {
        Self::new(
            format!("Stock Fetch Failure: {symbol}"),
            format!("Error fetching {symbol}: {error}"),
        )
    }

    /// 수집 대상 심볼이 없을 때의 알림.
    pub fn no_symbols() -> Self {
        Self::new(
            "Stock Pipeline Alert: No tickers to fetch",
            "No tickers to fetch today. Please check upstream data or database.",
        )
        .with_priority(AlertPriority::Critical)
    }
}

/// 알림 작업용 Result 타입.
pub type AlertResult<T> = Result<T, AlertError>;

/// 알림 에러.
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("알림 전송 실패: {0}")]
    SendFailed(String),

    #[error("잘못된 설정: {0}")]
    InvalidConfig(String),

    #[error("요청 한도 초과: {0}초 후 재시도")]
    RateLimited(u64),

    #[error("네트워크 에러: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// 알림 전송기 trait.
#[async_trait]
pub trait AlertSender: Send + Sync {
    /// 알림을 전송합니다.
    async fn send(&self, alert: &Alert) -> AlertResult<()>;

    /// 전송기가 활성화되어 있는지 확인합니다.
    fn is_enabled(&self) -> bool;

    /// 전송기 이름을 반환합니다.
    fn name(&self) -> &str;
}
