//! # Stock Notification
//!
//! 파이프라인 운영 알림 서비스.
//!
//! 지원 채널:
//! - Telegram
//! - Discord (webhook)
//!
//! 수집기는 `AlertManager`를 통해 설정된 모든 채널로 알림을 보냅니다.
//! 전송 실패는 기록만 하고 재시도하지 않습니다.

pub mod discord;
pub mod manager;
pub mod telegram;
pub mod types;

pub use discord::*;
pub use manager::*;
pub use telegram::*;
pub use types::*;
