//! 최신 가격 캐시.
//!
//! 웹훅으로 들어온 가격을 심볼별로 보관하며, cross 알림 판정을 위해 직전 가격도 함께 유지합니다.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::RwLock;

/// 심볼별 가격 항목
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceEntry {
    pub price: Decimal,
    pub previous: Option<Decimal>,
    pub updated_at: DateTime<Utc>,
}

/// 가격 캐시
#[derive(Debug, Default)]
pub struct PriceCache {
    entries: RwLock<HashMap<String, PriceEntry>>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 가격 갱신 후 갱신된 항목 반환
    pub async fn update(&self, symbol: &str, price: Decimal) -> PriceEntry {
        let mut entries = self.entries.write().await;
        let previous = entries.get(symbol).map(|e| e.price);
        let entry = PriceEntry {
            price,
            previous,
            updated_at: Utc::now(),
        };
        entries.insert(symbol.to_string(), entry.clone());
        entry
    }

    pub async fn get(&self, symbol: &str) -> Option<PriceEntry> {
        self.entries.read().await.get(symbol).cloned()
    }

    pub async fn latest(&self, symbol: &str) -> Option<Decimal> {
        self.get(symbol).await.map(|e| e.price)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
