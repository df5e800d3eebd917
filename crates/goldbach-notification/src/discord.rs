//! Discord 알림 서비스.
//!
//! Discord Webhook을 통해 Goldbach 시그널과 리포트를 전송합니다.

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::format::{bias_emoji, format_html, html_to_markdown};
use crate::types::{
    Notification, NotificationError, NotificationEvent, NotificationPriority, NotificationResult,
    NotificationSender,
};

/// Discord 알림 전송 설정.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    /// Discord Webhook URL
    pub webhook_url: String,
    /// 표시 이름 (봇 이름으로 표시)
    pub display_name: Option<String>,
    /// 전송 활성화 여부
    pub enabled: bool,
}

impl DiscordConfig {
    /// 새 Discord 설정을 생성합니다.
    pub fn new(webhook_url: String) -> Self {
        Self {
            webhook_url,
            display_name: None,
            enabled: true,
        }
    }

    /// 표시 이름을 설정합니다.
    pub fn with_display_name(mut self, name: String) -> Self {
        self.display_name = Some(name);
        self
    }

    /// 환경 변수에서 설정을 생성합니다.
    pub fn from_env() -> Option<Self> {
        let webhook_url = std::env::var("DISCORD_WEBHOOK_URL")
            .ok()
            .filter(|v| !v.is_empty())?;
        let display_name = std::env::var("DISCORD_DISPLAY_NAME").ok();
        let enabled = std::env::var("DISCORD_ENABLED")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(true);

        Some(Self {
            webhook_url,
            display_name,
            enabled,
        })
    }
}

/// Discord 알림 전송기.
pub struct DiscordSender {
    config: DiscordConfig,
    client: reqwest::Client,
}

impl DiscordSender {
    /// 새 Discord 전송기를 생성합니다.
    pub fn new(config: DiscordConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// 환경 변수에서 전송기를 생성합니다.
    pub fn from_env() -> Option<Self> {
        DiscordConfig::from_env().map(Self::new)
    }

    /// 우선순위에 따른 색상을 반환합니다 (Discord embed color는 decimal 값 사용).
    fn get_priority_color(&self, priority: &NotificationPriority) -> u32 {
        match priority {
            NotificationPriority::Low => 0x6c757d,      // 회색
            NotificationPriority::Normal => 0x007bff,   // 파랑
            NotificationPriority::High => 0xfd7e14,     // 주황
            NotificationPriority::Critical => 0xdc3545, // 빨강
        }
    }

    /// 알림을 Discord Embed로 포맷합니다.
    fn format_embed(&self, notification: &Notification) -> serde_json::Value {
        let color = self.get_priority_color(&notification.priority);
        let timestamp = notification.timestamp.to_rfc3339();

        match &notification.event {
            NotificationEvent::SignalAlert { setup } => {
                let emoji = bias_emoji(setup.bias);
                let targets = setup
                    .targets
                    .iter()
                    .map(|t| format!("{}: {:.2}", t.name, t.price))
                    .collect::<Vec<_>>()
                    .join("\n");

                let mut fields = vec![
                    json!({ "name": "Plan", "value": setup.plan.to_string(), "inline": true }),
                    json!({ "name": "Bias", "value": format!("{} ({}%)", setup.bias, setup.confidence), "inline": true }),
                    json!({ "name": "Strength", "value": setup.signal_strength.to_string(), "inline": true }),
                    json!({ "name": "Entry Zone", "value": format!("{:.2} - {:.2}", setup.entry_zone.0, setup.entry_zone.1), "inline": true }),
                    json!({ "name": "Entry", "value": format!("{:.2}", setup.entry_price), "inline": true }),
                    json!({ "name": "Stop Loss", "value": format!("{:.2}", setup.stop_loss), "inline": true }),
                    json!({ "name": "Targets", "value": targets, "inline": false }),
                    json!({ "name": "AMD", "value": setup.amd_cycle.to_string(), "inline": true }),
                ];

                if setup.goldbach_time_confirm {
                    fields.push(json!({ "name": "Goldbach Time", "value": "✅ Confirmation", "inline": true }));
                }

                json!({
                    "title": format!("{} GOLDBACH SIGNAL - {}", emoji, setup.symbol),
                    "color": color,
                    "fields": fields,
                    "timestamp": timestamp
                })
            }

            NotificationEvent::Custom { title, message } => {
                json!({
                    "title": title,
                    "description": html_to_markdown(message),
                    "color": color,
                    "timestamp": timestamp
                })
            }

            // 나머지 이벤트는 HTML 메시지를 Markdown 본문으로 사용
            _ => {
                json!({
                    "description": html_to_markdown(&format_html(notification)),
                    "color": color,
                    "timestamp": timestamp
                })
            }
        }
    }

    /// Discord Webhook을 통해 메시지를 전송합니다.
    async fn send_webhook(&self, embed: serde_json::Value) -> NotificationResult<()> {
        let mut payload = json!({
            "embeds": [embed],
        });

        // 봇 이름 설정
        if let Some(ref name) = self.config.display_name {
            payload["username"] = json!(name);
        }

        debug!("Discord webhook 메시지 전송");

        let response = self
            .client
            .post(&self.config.webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(NotificationError::NetworkError)?;

        if response.status().is_success() {
            info!("Discord 알림 전송 완료");
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            // 요청 한도 제한 확인
            if status.as_u16() == 429 {
                warn!("Discord rate limited");
                return Err(NotificationError::RateLimited(60));
            }

            error!("Discord webhook 전송 실패: {} - {}", status, body);
            Err(NotificationError::SendFailed(format!(
                "HTTP {}: {}",
                status, body
            )))
        }
    }
}

#[async_trait]
impl NotificationSender for DiscordSender {
    async fn send(&self, notification: &Notification) -> NotificationResult<()> {
        if !self.is_enabled() {
            debug!("Discord 알림이 비활성화되어 있습니다");
            return Ok(());
        }

        let embed = self.format_embed(notification);
        self.send_webhook(embed).await
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled && !self.config.webhook_url.is_empty()
    }

    fn name(&self) -> &str {
        "discord"
    }
}
