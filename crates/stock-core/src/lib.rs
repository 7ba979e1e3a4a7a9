//! # Stock Core
//!
//! 주식 데이터 파이프라인의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 파이프라인 전반에서 사용되는 기본 타입을 제공합니다:
//! - 티커 심볼 정의 (대문자 정규화)
//! - 일봉(OHLCV) 데이터 구조체
//! - 심볼별 수집 결과 및 상태
//! - 구조화된 이벤트 싱크
//! - 로깅 인프라

pub mod domain;
pub mod error;
pub mod events;
pub mod logging;
pub mod types;

pub use domain::*;
pub use error::*;
pub use events::*;
pub use logging::*;
pub use types::*;
