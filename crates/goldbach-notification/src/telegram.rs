//! Telegram 알림 서비스.
//!
//! Bot API `sendMessage`를 HTML parse mode로 호출합니다.

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::format::format_html;
use crate::types::{Notification, NotificationError, NotificationResult, NotificationSender};

/// 기본 Telegram Bot API 주소
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// 429 응답에 `retry_after`가 없을 때 사용
const DEFAULT_RETRY_AFTER_SECS: u64 = 30;

/// Telegram 알림 전송 설정.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// 봇 토큰
    pub bot_token: String,
    /// 대상 채팅 ID
    pub chat_id: String,
    /// API 주소 (테스트 시 목 서버로 교체)
    pub api_base: String,
    /// 전송 활성화 여부
    pub enabled: bool,
}

impl TelegramConfig {
    /// 새 Telegram 설정을 생성합니다.
    pub fn new(bot_token: String, chat_id: String) -> Self {
        Self {
            bot_token,
            chat_id,
            api_base: TELEGRAM_API_BASE.to_string(),
            enabled: true,
        }
    }

    /// API 주소를 변경합니다.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// 환경 변수에서 설정을 생성합니다.
    ///
    /// 토큰이나 채팅 ID가 없거나 비어 있으면 `None`.
    pub fn from_env() -> Option<Self> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN")
            .ok()
            .filter(|v| !v.is_empty())?;
        let chat_id = std::env::var("TELEGRAM_CHAT_ID")
            .ok()
            .filter(|v| !v.is_empty())?;
        let enabled = std::env::var("TELEGRAM_ENABLED")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(true);

        Some(Self {
            enabled,
            ..Self::new(bot_token, chat_id)
        })
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }
}

/// Telegram 알림 전송기.
pub struct TelegramSender {
    config: TelegramConfig,
    client: reqwest::Client,
}

impl TelegramSender {
    /// 새 Telegram 전송기를 생성합니다.
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

    /// HTML 메시지를 전송합니다.
    pub async fn send_html(&self, text: &str) -> NotificationResult<()> {
        let payload = json!({
            "chat_id": self.config.chat_id,
            "text": text,
            "parse_mode": "HTML",
        });

        debug!(chat_id = %self.config.chat_id, "Telegram 메시지 전송");

        let response = self
            .client
            .post(self.config.send_message_url())
            .json(&payload)
            .send()
            .await
            .map_err(NotificationError::NetworkError)?;

        let status = response.status();
        if status.is_success() {
            info!("Telegram 알림 전송 완료");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();

        if status.as_u16() == 429 {
            let retry_after = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v["parameters"]["retry_after"].as_u64())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            warn!(retry_after, "Telegram rate limited");
            return Err(NotificationError::RateLimited(retry_after));
        }

        error!("Telegram 전송 실패: {} - {}", status, body);
        Err(NotificationError::SendFailed(format!(
            "HTTP {}: {}",
            status, body
        )))
    }
}

#[async_trait]
impl NotificationSender for TelegramSender {
    async fn send(&self, notification: &Notification) -> NotificationResult<()> {
        if !self.is_enabled() {
            debug!("Telegram 알림이 비활성화되어 있습니다");
            return Ok(());
        }

        self.send_html(&format_html(notification)).await
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled && !self.config.bot_token.is_empty() && !self.config.chat_id.is_empty()
    }

    fn name(&self) -> &str {
        "telegram"
    }
}
