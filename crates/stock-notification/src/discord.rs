//! Discord webhook 알림 서비스.

use crate::types::{
    alert_timeout_from_env, Alert, AlertError, AlertResult, AlertSender, DEFAULT_ALERT_TIMEOUT,
};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Discord 메시지 최대 길이
const MAX_CONTENT_LEN: usize = 2000;

/// Discord webhook 전송기.
pub struct DiscordWebhookSender {
    webhook_url: SecretString,
    client: reqwest::Client,
    timeout: Duration,
}

impl DiscordWebhookSender {
    /// 새 webhook 전송기를 생성합니다.
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: SecretString::from(webhook_url.into()),
            client: reqwest::Client::new(),
            timeout: DEFAULT_ALERT_TIMEOUT,
        }
    }

    /// 요청 타임아웃을 설정합니다.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 환경 변수 `DISCORD_WEBHOOK_URL`에서 전송기를 생성합니다.
    pub fn from_env() -> Option<Self> {
        std::env::var("DISCORD_WEBHOOK_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .map(|url| Self::new(url).with_timeout(alert_timeout_from_env()))
    }

    /// 알림을 Discord 메시지로 포맷합니다.
    fn format_content(alert: &Alert) -> String {
        let content = format!(
            "{} **{}**\n```\n{}\n```",
            alert.priority.emoji(),
            alert.subject,
            alert.body
        );
        truncate_chars(content, MAX_CONTENT_LEN)
    }
}

#[async_trait]
impl AlertSender for DiscordWebhookSender {
    async fn send(&self, alert: &Alert) -> AlertResult<()> {
        let payload = serde_json::json!({ "content": Self::format_content(alert) });

        debug!(subject = %alert.subject, "Sending Discord webhook");

        let response = self
            .client
            .post(self.webhook_url.expose_secret())
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if status.as_u16() == 429 {
            warn!("Discord rate limited");
            return Err(AlertError::RateLimited(60));
        }

        let body = response.text().await.unwrap_or_default();
        error!("Failed to send Discord webhook: {} - {}", status, body);
        Err(AlertError::SendFailed(format!("HTTP {}: {}", status, body)))
    }

    fn is_enabled(&self) -> bool {
        !self.webhook_url.expose_secret().is_empty()
    }

    fn name(&self) -> &str {
        "discord"
    }
}

fn truncate_chars(text: String, max: usize) -> String {
    if text.chars().count() <= max {
        return text;
    }
    let mut truncated: String = text.chars().take(max.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}
