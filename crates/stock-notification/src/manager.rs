//! 여러 전송기를 관리하는 알림 관리자.

use async_trait::async_trait;
use std::sync::Arc;
use stock_core::{PipelineEvent, SharedEventSink};

use crate::discord::DiscordWebhookSender;
use crate::telegram::TelegramSender;
use crate::types::{Alert, AlertError, AlertResult, AlertSender};

/// 설정된 모든 채널로 알림을 전송하는 관리자.
///
/// 한 채널의 실패는 다른 채널 전송을 막지 않으며, 활성 채널이 모두 실패한
/// 경우에만 오류를 반환합니다. 재시도는 하지 않습니다.
pub struct AlertManager {
    senders: Vec<Box<dyn AlertSender>>,
    events: SharedEventSink,
}

impl AlertManager {
    /// 새 알림 관리자를 생성합니다.
    pub fn new(events: SharedEventSink) -> Self {
        Self {
            senders: Vec::new(),
            events,
        }
    }

    /// 환경 변수에 설정된 채널(Telegram, Discord)로 관리자를 구성합니다.
    pub fn from_env(events: SharedEventSink) -> Self {
        let mut manager = Self::new(events);
        if let Some(sender) = TelegramSender::from_env() {
            manager.add_sender(sender);
        }
        if let Some(sender) = DiscordWebhookSender::from_env() {
            manager.add_sender(sender);
        }
        manager
    }

    /// 알림 전송기를 추가합니다.
    pub fn add_sender<S: AlertSender + 'static>(&mut self, sender: S) {
        self.senders.push(Box::new(sender));
    }

    /// 활성 채널 이름 목록
    pub fn channels(&self) -> Vec<&str> {
        self.senders
            .iter()
            .filter(|s| s.is_enabled())
            .map(|s| s.name())
            .collect()
    }

    /// 공유 핸들로 변환합니다.
    pub fn shared(self) -> Arc<dyn AlertSender> {
        Arc::new(self)
    }
}

#[async_trait]
impl AlertSender for AlertManager {
    async fn send(&self, alert: &Alert) -> AlertResult<()> {
        let enabled: Vec<&dyn AlertSender> = self
            .senders
            .iter()
            .filter(|s| s.is_enabled())
            .map(|s| s.as_ref())
            .collect();

        if enabled.is_empty() {
            self.events.record(
                PipelineEvent::warn(
                    "send_alert",
                    format!("No alert channel configured, alert not delivered: {}", alert.subject),
                )
                .with_field("subject", alert.subject.as_str())
                .with_field("body", alert.body.as_str()),
            );
            return Ok(());
        }

        let mut failures = 0usize;
        let mut last_error: Option<AlertError> = None;

        for sender in &enabled {
            match sender.send(alert).await {
                Ok(()) => self.events.record(
                    PipelineEvent::info("send_alert", format!("Alert sent via {}", sender.name()))
                        .with_field("channel", sender.name())
                        .with_field("subject", alert.subject.as_str())
                        .with_field("body_length", alert.body.len()),
                ),
                Err(e) => {
                    self.events.record(
                        PipelineEvent::error(
                            "send_alert",
                            format!("Failed to send alert via {}: {}", sender.name(), e),
                        )
                        .with_field("channel", sender.name())
                        .with_field("subject", alert.subject.as_str())
                        .with_field("error", e.to_string()),
                    );
                    failures += 1;
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            // 모든 활성 채널이 실패한 경우에만 에러 반환
            Some(e) if failures == enabled.len() => Err(e),
            _ => Ok(()),
        }
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "manager"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use stock_core::{EventLevel, MemoryEventSink};

    struct CountingSender {
        name: &'static str,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl AlertSender for CountingSender {
        async fn send(&self, _alert: &Alert) -> AlertResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(AlertError::SendFailed("boom".to_string()))
            } else {
                Ok(())
            }
        }

        fn is_enabled(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            self.name
        }
    }

    fn sender(name: &'static str, fail: bool) -> (CountingSender, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            CountingSender {
                name,
                fail,
                calls: calls.clone(),
            },
            calls,
        )
    }

    #[tokio::test]
    async fn test_partial_failure_is_ok_and_all_channels_tried() {
        let events = Arc::new(MemoryEventSink::new());
        let mut manager = AlertManager::new(events.clone());
        let (failing, failing_calls) = sender("a", true);
        let (working, working_calls) = sender("b", false);
        manager.add_sender(failing);
        manager.add_sender(working);

        manager.send(&Alert::no_symbols()).await.unwrap();

        assert_eq!(failing_calls.load(Ordering::SeqCst), 1);
        assert_eq!(working_calls.load(Ordering::SeqCst), 1);
        let recorded = events.by_operation("send_alert");
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].level, EventLevel::Error);
    }

    #[tokio::test]
    async fn test_all_channels_failing_returns_error() {
        let mut manager = AlertManager::new(Arc::new(MemoryEventSink::new()));
        let (failing, _) = sender("a", true);
        manager.add_sender(failing);

        assert!(manager.send(&Alert::no_symbols()).await.is_err());
    }

    #[tokio::test]
    async fn test_no_channels_records_warning() {
        let events = Arc::new(MemoryEventSink::new());
        let manager = AlertManager::new(events.clone());

        manager.send(&Alert::no_symbols()).await.unwrap();

        assert!(manager.channels().is_empty());
        let recorded = events.by_operation("send_alert");
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].level, EventLevel::Warn);
    }
}
