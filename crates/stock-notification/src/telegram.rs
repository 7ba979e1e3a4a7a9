//! 텔레그램 알림 서비스.
//!
//! Telegram Bot API를 통해 파이프라인 알림을 전송합니다.

use crate::types::{
    alert_timeout_from_env, Alert, AlertError, AlertResult, AlertSender, DEFAULT_ALERT_TIMEOUT,
};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// 텔레그램 알림 전송 설정.
#[derive(Debug)]
pub struct TelegramConfig {
    /// @BotFather에서 받은 봇 토큰
    pub bot_token: SecretString,
    /// 메시지를 보낼 채팅 ID
    pub chat_id: String,
    /// 전송 활성화 여부
    pub enabled: bool,
    /// Bot API Base URL
    pub api_base: String,
    /// 요청 타임아웃
    pub timeout: Duration,
}

impl TelegramConfig {
    /// 새 텔레그램 설정을 생성합니다.
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            bot_token: SecretString::from(bot_token.into()),
            chat_id: chat_id.into(),
            enabled: true,
            api_base: "https://api.telegram.org".to_string(),
            timeout: DEFAULT_ALERT_TIMEOUT,
        }
    }

    /// 환경 변수에서 설정을 생성합니다.
    pub fn from_env() -> Option<Self> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN").ok()?;
        let chat_id = std::env::var("TELEGRAM_CHAT_ID").ok()?;
        let enabled = std::env::var("TELEGRAM_ENABLED")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(true);

        Some(Self {
            enabled,
            timeout: alert_timeout_from_env(),
            ..Self::new(bot_token, chat_id)
        })
    }

    /// Bot API Base URL을 설정합니다.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// 요청 타임아웃을 설정합니다.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// 텔레그램 알림 전송기.
pub struct TelegramSender {
    config: TelegramConfig,
    client: reqwest::Client,
}

impl TelegramSender {
    /// 새 텔레그램 전송기를 생성합니다.
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// 환경 변수에서 전송기를 생성합니다.
    pub fn from_env() -> Option<Self> {
        TelegramConfig::from_env().map(Self::new)
    }

    /// 알림을 텔레그램 HTML 메시지로 포맷합니다.
    fn format_message(&self, alert: &Alert) -> String {
        let emoji = alert.priority.emoji();
        let subject = escape_html(&alert.subject);
        let body = escape_html(&alert.body);
        let timestamp = alert.timestamp.format("%Y-%m-%d %H:%M:%S UTC");
        format!("{emoji} <b>{subject}</b>\n\n{body}\n\n<i>🕐 {timestamp}</i>")
    }

    /// 텔레그램에 원시 메시지를 전송합니다.
    async fn send_message(&self, text: &str) -> AlertResult<()> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token.expose_secret()
        );

        let params = serde_json::json!({
            "chat_id": self.config.chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });

        debug!(
            "Sending Telegram message to chat_id: {}",
            self.config.chat_id
        );

        let response = self
            .client
            .post(&url)
            .timeout(self.config.timeout)
            .json(&params)
            .send()
            .await
            .map_err(AlertError::NetworkError)?;

        if response.status().is_success() {
            info!("Telegram notification sent successfully");
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            // 요청 한도 제한 확인
            if status.as_u16() == 429 {
                warn!("Telegram rate limited");
                return Err(AlertError::RateLimited(60));
            }

            error!("Failed to send Telegram message: {} - {}", status, body);
            Err(AlertError::SendFailed(format!("HTTP {}: {}", status, body)))
        }
    }
}

#[async_trait]
impl AlertSender for TelegramSender {
    async fn send(&self, alert: &Alert) -> AlertResult<()> {
        if !self.is_enabled() {
            debug!("Telegram notifications are disabled, skipping");
            return Ok(());
        }

        let message = self.format_message(alert);
        self.send_message(&message).await
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
            && !self.config.bot_token.expose_secret().is_empty()
            && !self.config.chat_id.is_empty()
    }

    fn name(&self) -> &str {
        "telegram"
    }
}

/// HTML parse_mode에서 의미를 갖는 문자를 이스케이프합니다.
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
