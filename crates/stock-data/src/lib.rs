//! 일봉 데이터 수집 및 저장.
//!
//! 이 crate는 다음을 제공합니다:
//! - Alpha Vantage 일봉 시세 클라이언트
//! - PostgreSQL 기반 일봉/티커 상태 저장소 (멱등 upsert)
//! - 동일한 의미론을 갖는 인메모리 저장소 (테스트, dry-run)
//! - 수집기가 의존하는 `MarketDataSource` / `BarStore` / `SymbolSource` trait

pub mod error;
pub mod provider;
pub mod storage;

pub use error::{DataError, FetchError, Result};

// Provider 재내보내기
pub use provider::{AlphaVantageClient, AlphaVantageConfig, MarketDataSource};

// 저장소 재내보내기
pub use storage::{
    BarStore, MemoryRecordStore, PgRecordStore, StoreConfig, SymbolSource, TickerRecord,
};
