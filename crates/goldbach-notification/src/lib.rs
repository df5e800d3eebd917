//! Goldbach 알림 모듈.
//!
//! Telegram, Discord 채널로 시그널과 리포트를 전송합니다.

pub mod discord;
pub mod format;
pub mod manager;
pub mod telegram;
pub mod types;

pub use discord::{DiscordConfig, DiscordSender};
pub use format::{format_html, html_to_markdown};
pub use manager::NotificationManager;
pub use telegram::{TelegramConfig, TelegramSender, TELEGRAM_API_BASE};
pub use types::{
    Notification, NotificationError, NotificationEvent, NotificationPriority, NotificationResult,
    NotificationSender,
};
