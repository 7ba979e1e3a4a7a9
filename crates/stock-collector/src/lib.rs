//! Daily OHLCV collector for the stock data pipeline.
//!
//! 이 crate는 배치 수집기와 실행 바이너리를 제공합니다:
//! - 환경변수 기반 설정
//! - 동시성 제한 배치 수집 (심볼 단위 실패 격리)
//! - 실행 결과 보고서

pub mod config;
pub mod error;
pub mod modules;
pub mod stats;

pub use config::CollectorConfig;
pub use error::{CollectorError, Result, UnitError};
pub use modules::{BatchFetcher, Collector};
pub use stats::BatchReport;
