//! 환경변수 기반 설정 모듈.
//!
//! 프로세스 시작 시 한 번만 읽으며 재로딩은 하지 않습니다.

use crate::error::CollectorError;
use crate::Result;
use chrono::TimeDelta;
use secrecy::SecretString;
use std::time::Duration;
use stock_data::{AlphaVantageConfig, StoreConfig};

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 데이터베이스 설정
    pub database: DatabaseConfig,
    /// 시세 제공자 설정
    pub provider: ProviderConfig,
    /// 배치 수집 설정
    pub batch: BatchConfig,
    /// 데몬 모드 설정
    pub daemon: DaemonConfig,
}

/// 데이터베이스 설정
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL URL
    pub url: String,
    /// 최대 연결 수
    pub max_connections: u32,
}

/// Alpha Vantage 설정
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: SecretString,
    pub base_url: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

/// 배치 수집 설정
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// 동시에 실행되는 심볼 작업 수 상한
    pub concurrency: usize,
    /// 마지막 수집 후 이 시간이 지나면 재수집
    pub stale_after: TimeDelta,
}

/// 데몬 모드 설정
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// 워크플로우 실행 주기 (분 단위)
    pub interval_minutes: u64,
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드 (`.env` 파일이 있으면 먼저 읽음)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 키 조회 함수로 설정을 구성합니다.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = database_url(&lookup)?;

        let api_key = lookup("ALPHAVANTAGE_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                CollectorError::Config(
                    "ALPHAVANTAGE_API_KEY 환경변수가 설정되지 않았습니다".to_string(),
                )
            })?;

        let concurrency = env_var_parse(&lookup, "CONCURRENCY", 10usize);
        if concurrency == 0 {
            return Err(CollectorError::Config(
                "CONCURRENCY는 1 이상이어야 합니다".to_string(),
            ));
        }

        let stale_after_hours: i64 = env_var_parse(&lookup, "STALE_AFTER_HOURS", 24);
        let stale_after = TimeDelta::try_hours(stale_after_hours)
            .filter(|_| stale_after_hours > 0)
            .ok_or_else(|| {
                CollectorError::Config(format!(
                    "STALE_AFTER_HOURS는 1 이상의 유효한 시간이어야 합니다: {stale_after_hours}"
                ))
            })?;

        Ok(Self {
            database: DatabaseConfig {
                url: database_url,
                max_connections: env_var_parse(&lookup, "DATABASE_MAX_CONNECTIONS", 10),
            },
            provider: ProviderConfig {
                api_key: SecretString::from(api_key),
                base_url: lookup("ALPHAVANTAGE_BASE_URL")
                    .unwrap_or_else(|| AlphaVantageConfig::DEFAULT_BASE_URL.to_string()),
                timeout_secs: env_var_parse(
                    &lookup,
                    "FETCH_TIMEOUT_SECS",
                    AlphaVantageConfig::DEFAULT_TIMEOUT_SECS,
                ),
            },
            batch: BatchConfig {
                concurrency,
                stale_after,
            },
            daemon: DaemonConfig {
                interval_minutes: env_var_parse(&lookup, "DAEMON_INTERVAL_MINUTES", 1440),
            },
        })
    }

    /// 저장소 연결 설정
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            max_connections: self.database.max_connections,
            stale_after: self.batch.stale_after,
            ..StoreConfig::new(self.database.url.clone())
        }
    }

    /// 시세 클라이언트 설정
    pub fn alpha_vantage_config(&self) -> AlphaVantageConfig {
        AlphaVantageConfig::new(self.provider.api_key.clone())
            .with_base_url(self.provider.base_url.clone())
            .with_timeout(Duration::from_secs(self.provider.timeout_secs))
    }
}

impl DaemonConfig {
    /// 워크플로우 실행 주기를 Duration으로 반환 (최소 1분)
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.max(1) * 60)
    }
}

/// `DATABASE_URL`이 없으면 `POSTGRES_*` 변수로 URL을 조립합니다.
fn database_url<F>(lookup: &F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("DATABASE_URL").filter(|u| !u.is_empty()) {
        return Ok(url);
    }

    let required = |key: &str| {
        lookup(key).ok_or_else(|| {
            CollectorError::Config(format!(
                "DATABASE_URL 또는 {key} 환경변수가 설정되지 않았습니다"
            ))
        })
    };
    let user = required("POSTGRES_USER")?;
    let password = required("POSTGRES_PASSWORD")?;
    let db = required("POSTGRES_DB")?;
    let host = lookup("POSTGRES_HOST").unwrap_or_else(|| "postgres".to_string());
    let port: u16 = env_var_parse(lookup, "POSTGRES_PORT", 5432);

    Ok(format!("postgresql://{user}:{password}@{host}:{port}/{db}"))
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
