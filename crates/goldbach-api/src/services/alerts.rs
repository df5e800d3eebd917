//! 가격 알림.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use goldbach_core::CoreError;
use goldbach_notification::NotificationEvent;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use super::price_cache::PriceEntry;

/// 알림 조건
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCondition {
    Above,
    Below,
    /// 직전 가격과 현재 가격 사이에서 목표가를 통과
    Cross,
}

impl AlertCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Above => "above",
            Self::Below => "below",
            Self::Cross => "cross",
        }
    }
}

impl fmt::Display for AlertCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertCondition {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "above" => Ok(Self::Above),
            "below" => Ok(Self::Below),
            "cross" => Ok(Self::Cross),
            _ => Err(CoreError::UnknownVariant {
                kind: "alert condition",
                value: s.to_string(),
            }),
        }
    }
}

/// 가격 알림
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAlert {
    pub id: String,
    pub symbol: String,
    pub condition: AlertCondition,
    pub price: Decimal,
    pub enabled: bool,
    pub triggered: bool,
    pub created_at: NaiveDateTime,
}

impl PriceAlert {
    pub fn new(
        id: String,
        symbol: String,
        condition: AlertCondition,
        price: Decimal,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            id,
            symbol,
            condition,
            price,
            enabled: true,
            triggered: false,
            created_at,
        }
    }

    /// 조건 충족 여부. 비활성 또는 이미 발동된 알림은 항상 `false`.
    pub fn check(&self, current: Decimal, previous: Option<Decimal>) -> bool {
        if !self.enabled || self.triggered {
            return false;
        }

        match self.condition {
            AlertCondition::Above => current > self.price,
            AlertCondition::Below => current < self.price,
            AlertCondition::Cross => match previous {
                Some(prev) => {
                    (prev < self.price && current >= self.price)
                        || (prev > self.price && current <= self.price)
                }
                None => false,
            },
        }
    }
}

/// 알림 목록
#[derive(Debug, Default)]
pub struct AlertBook {
    alerts: RwLock<BTreeMap<String, PriceAlert>>,
}

impl AlertBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, alert: PriceAlert) {
        info!(
            id = %alert.id,
            symbol = %alert.symbol,
            condition = %alert.condition,
            price = %alert.price,
            "가격 알림 추가"
        );
        self.alerts.write().await.insert(alert.id.clone(), alert);
    }

    pub async fn remove(&self, id: &str) -> bool {
        self.alerts.write().await.remove(id).is_some()
    }

    pub async fn list(&self) -> BTreeMap<String, PriceAlert> {
        self.alerts.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.alerts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.alerts.read().await.is_empty()
    }

    /// 활성 알림이 걸린 심볼 목록
    pub async fn active_symbols(&self) -> Vec<String> {
        let alerts = self.alerts.read().await;
        let mut symbols: Vec<String> = alerts
            .values()
            .filter(|a| a.enabled && !a.triggered)
            .map(|a| a.symbol.clone())
            .collect();
        symbols.sort();
        symbols.dedup();
        symbols
    }

    /// 심볼의 알림을 검사하고 발동된 알림을 이벤트로 반환합니다.
    ///
    /// 발동된 알림은 `triggered`로 표시되어 다시 발동하지 않습니다.
    pub async fn check(
        &self,
        symbol: &str,
        entry: &PriceEntry,
        now: NaiveDateTime,
    ) -> Vec<NotificationEvent> {
        let mut alerts = self.alerts.write().await;
        let mut events = Vec::new();

        for alert in alerts.values_mut().filter(|a| a.symbol == symbol) {
            if alert.check(entry.price, entry.previous) {
                alert.triggered = true;
                info!(
                    id = %alert.id,
                    symbol,
                    condition = %alert.condition,
                    target = %alert.price,
                    current = %entry.price,
                    "가격 알림 발동"
                );
                events.push(NotificationEvent::PriceAlert {
                    symbol: alert.symbol.clone(),
                    condition: alert.condition.to_string(),
                    target: alert.price,
                    current: entry.price,
                    triggered_at: now,
                });
            }
        }

        events
    }
}
