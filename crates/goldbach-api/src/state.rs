//! 애플리케이션 상태 관리.
//!
//! 모든 핸들러와 백그라운드 서비스가 `Arc<AppState>`로 공유합니다.

use chrono::{DateTime, NaiveDateTime, Utc};
use goldbach_core::GoldbachEngine;
use goldbach_notification::{NotificationError, NotificationEvent, NotificationManager};
use tracing::{debug, info, warn};

use crate::config::ApiConfig;
use crate::services::{AlertBook, PriceCache, Scheduler, SignalStore};

/// 애플리케이션 상태
pub struct AppState {
    pub config: ApiConfig,
    /// Goldbach 분석 엔진
    pub engine: GoldbachEngine,
    pub notifications: NotificationManager,
    /// 최근 시그널
    pub signals: SignalStore,
    /// 심볼별 최신 가격
    pub prices: PriceCache,
    pub alerts: AlertBook,
    pub scheduler: Scheduler,
    pub version: String,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: ApiConfig, notifications: NotificationManager) -> Self {
        let engine = GoldbachEngine::new(config.default_po3_size);
        Self {
            config,
            engine,
            notifications,
            signals: SignalStore::default(),
            prices: PriceCache::new(),
            alerts: AlertBook::new(),
            scheduler: Scheduler::new(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Utc::now(),
        }
    }

    /// 시장 시간대 기준 현재 시각
    pub fn now(&self) -> NaiveDateTime {
        self.config.clock.now()
    }

    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }

    /// 알림 전송. 하나 이상의 채널에 전달되면 `true`.
    ///
    /// 알림 실패는 요청 처리를 막지 않으므로 로그만 남깁니다.
    pub async fn dispatch(&self, event: NotificationEvent) -> bool {
        match self.notifications.notify(event).await {
            Ok(delivered) => {
                info!(delivered, "알림 전송 완료");
                delivered > 0
            }
            Err(NotificationError::NotConfigured) => {
                debug!("알림 채널이 설정되지 않아 전송을 건너뜁니다");
                false
            }
            Err(e) => {
                warn!(error = %e, "알림 전송 실패");
                false
            }
        }
    }
}

/// 테스트용 상태 (알림 채널 없음, 스케줄러 비활성)
#[cfg(test)]
pub fn create_test_state() -> AppState {
    AppState::new(
        ApiConfig::default().with_scheduler(false),
        NotificationManager::new(),
    )
}
