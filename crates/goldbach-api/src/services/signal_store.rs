//! 시그널 저장소.
//!
//! 최근 생성된 셋업을 고정 크기 FIFO로 메모리에 보관합니다.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use goldbach_core::{Bias, TradeSetup};
use serde::Serialize;
use tokio::sync::RwLock;

/// 기본 보관 개수
pub const SIGNAL_STORE_CAPACITY: usize = 100;

/// 시그널 통계
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalStatistics {
    pub total_signals: usize,
    pub bullish_signals: usize,
    pub bearish_signals: usize,
    pub by_plan: BTreeMap<String, usize>,
    pub by_strength: BTreeMap<String, usize>,
    pub last_updated: DateTime<Utc>,
}

/// 시그널 저장소
#[derive(Debug)]
pub struct SignalStore {
    capacity: usize,
    signals: RwLock<VecDeque<TradeSetup>>,
}

impl Default for SignalStore {
    fn default() -> Self {
        Self::new(SIGNAL_STORE_CAPACITY)
    }
}

impl SignalStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            signals: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// 저장. 용량을 넘으면 가장 오래된 시그널을 제거합니다.
    pub async fn push(&self, setup: TradeSetup) {
        let mut signals = self.signals.write().await;
        signals.push_back(setup);
        while signals.len() > self.capacity {
            signals.pop_front();
        }
    }

    /// 최근 `limit`개 (오래된 순)
    pub async fn recent(&self, limit: usize) -> Vec<TradeSetup> {
        let signals = self.signals.read().await;
        let skip = signals.len().saturating_sub(limit);
        signals.iter().skip(skip).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.signals.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.signals.read().await.is_empty()
    }

    pub async fn statistics(&self) -> SignalStatistics {
        let signals = self.signals.read().await;

        let mut by_plan = BTreeMap::new();
        let mut by_strength = BTreeMap::new();
        for setup in signals.iter() {
            *by_plan.entry(setup.plan.to_string()).or_insert(0) += 1;
            *by_strength
                .entry(setup.signal_strength.to_string())
                .or_insert(0) += 1;
        }

        SignalStatistics {
            total_signals: signals.len(),
            bullish_signals: signals.iter().filter(|s| s.bias == Bias::Bullish).count(),
            bearish_signals: signals.iter().filter(|s| s.bias == Bias::Bearish).count(),
            by_plan,
            by_strength,
            last_updated: Utc::now(),
        }
    }
}
