//! 알림 타입 정의.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use goldbach_core::{Bias, Layer, SignalStrength, TradeSetup};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// 알림 이벤트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// 트레이드 셋업 시그널
    SignalAlert { setup: TradeSetup },

    /// 셋업이 없을 때의 현재 위치 요약
    PositionUpdate {
        symbol: String,
        price: Decimal,
        position_str: String,
        layer: Option<Layer>,
        bias: Bias,
        confidence: u8,
    },

    /// 가격 알림 발동
    PriceAlert {
        symbol: String,
        condition: String,
        target: Decimal,
        current: Decimal,
        /// 시장 시각
        triggered_at: NaiveDateTime,
    },

    /// 일일 리포트
    DailyReport {
        generated_at: NaiveDateTime,
        lines: Vec<String>,
    },

    /// 사용자 정의 메시지
    Custom { title: String, message: String },
}

/// 알림 우선순위
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    Normal,
    High,
    Critical,
}

/// 전송 단위 알림
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub event: NotificationEvent,
    pub priority: NotificationPriority,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    /// 이벤트에서 우선순위를 결정해 알림을 생성합니다.
    pub fn new(event: NotificationEvent) -> Self {
        let priority = match &event {
            NotificationEvent::SignalAlert { setup }
                if setup.signal_strength >= SignalStrength::Excellent =>
            {
                NotificationPriority::High
            }
            NotificationEvent::PriceAlert { .. } => NotificationPriority::High,
            NotificationEvent::PositionUpdate { .. } => NotificationPriority::Low,
            _ => NotificationPriority::Normal,
        };

        Self {
            id: Uuid::new_v4(),
            event,
            priority,
            timestamp: Utc::now(),
        }
    }

    pub fn with_priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }
}

/// 알림 오류
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("네트워크 오류: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("요청 한도 초과: {0}초 후 재시도")]
    RateLimited(u64),

    #[error("전송 실패: {0}")]
    SendFailed(String),

    #[error("활성화된 알림 채널이 없습니다")]
    NotConfigured,
}

pub type NotificationResult<T> = Result<T, NotificationError>;

/// 알림 채널 인터페이스
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notification: &Notification) -> NotificationResult<()>;

    fn is_enabled(&self) -> bool;

    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use goldbach_core::GoldbachEngine;
    use rust_decimal_macros::dec;

    fn setup_at(hour: u32) -> TradeSetup {
        let time = chrono::NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap();
        GoldbachEngine::default()
            .generate_setup(dec!(21160), "NQ", None, 0, time)
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_priority_from_event() {
        // 04:00 → STRONG
        let normal = Notification::new(NotificationEvent::SignalAlert { setup: setup_at(4) });
        assert_eq!(normal.priority, NotificationPriority::Normal);

        // 03:00 Goldbach 시간 → PERFECT
        let high = Notification::new(NotificationEvent::SignalAlert { setup: setup_at(3) });
        assert_eq!(high.priority, NotificationPriority::High);

        let alert = Notification::new(NotificationEvent::PriceAlert {
            symbol: "NQ".to_string(),
            condition: "above".to_string(),
            target: dec!(21500),
            current: dec!(21510),
            triggered_at: setup_at(4).timestamp,
        });
        assert_eq!(alert.priority, NotificationPriority::High);
    }

    #[test]
    fn test_with_priority() {
        let notification = Notification::new(NotificationEvent::Custom {
            title: "t".to_string(),
            message: "m".to_string(),
        })
        .with_priority(NotificationPriority::Critical);
        assert_eq!(notification.priority, NotificationPriority::Critical);
    }
}
