//! 알림 관리자.
//!
//! 등록된 모든 채널로 알림을 동시에 전송합니다.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::types::{
    Notification, NotificationError, NotificationEvent, NotificationResult, NotificationSender,
};

/// 알림 관리자
#[derive(Default, Clone)]
pub struct NotificationManager {
    senders: Vec<Arc<dyn NotificationSender>>,
}

impl NotificationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 환경 변수에 설정된 Telegram / Discord 채널로 관리자를 생성합니다.
    pub fn from_env() -> Self {
        let mut manager = Self::new();
        if let Some(sender) = crate::TelegramSender::from_env() {
            manager.add_sender(Arc::new(sender));
        }
        if let Some(sender) = crate::DiscordSender::from_env() {
            manager.add_sender(Arc::new(sender));
        }
        info!(channels = ?manager.enabled_channels(), "알림 관리자 초기화");
        manager
    }

    /// 전송 채널 추가
    pub fn add_sender(&mut self, sender: Arc<dyn NotificationSender>) {
        debug!(sender = sender.name(), "알림 채널 등록");
        self.senders.push(sender);
    }

    /// 활성화된 채널 이름 목록
    pub fn enabled_channels(&self) -> Vec<String> {
        self.senders
            .iter()
            .filter(|s| s.is_enabled())
            .map(|s| s.name().to_string())
            .collect()
    }

    pub fn has_enabled_sender(&self) -> bool {
        self.senders.iter().any(|s| s.is_enabled())
    }

    /// 이벤트를 알림으로 만들어 전송합니다.
    pub async fn notify(&self, event: NotificationEvent) -> NotificationResult<usize> {
        self.send(&Notification::new(event)).await
    }

    /// 모든 활성 채널로 전송하고 성공한 채널 수를 반환합니다.
    ///
    /// 활성 채널이 없으면 `NotConfigured`, 모든 채널이 실패하면 마지막 오류를 반환합니다.
    pub async fn send(&self, notification: &Notification) -> NotificationResult<usize> {
        let enabled: Vec<_> = self.senders.iter().filter(|s| s.is_enabled()).collect();
        if enabled.is_empty() {
            debug!("활성화된 알림 채널 없음");
            return Err(NotificationError::NotConfigured);
        }

        let results = join_all(enabled.iter().map(|s| s.send(notification))).await;

        let mut delivered = 0;
        let mut last_error = None;
        for (sender, result) in enabled.iter().zip(results) {
            match result {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(sender = sender.name(), error = %e, "알림 전송 실패");
                    last_error = Some(e);
                }
            }
        }

        match (delivered, last_error) {
            (0, Some(e)) => Err(e),
            _ => Ok(delivered),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    struct MockSender {
        name: &'static str,
        enabled: bool,
        fail: bool,
        calls: AtomicUsize,
    }

    impl MockSender {
        fn new(name: &'static str, enabled: bool, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                enabled,
                fail,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl NotificationSender for MockSender {
        async fn send(&self, _notification: &Notification) -> NotificationResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(NotificationError::SendFailed(self.name.to_string()))
            } else {
                Ok(())
            }
        }

        fn is_enabled(&self) -> bool {
            self.enabled
        }

        fn name(&self) -> &str {
            self.name
        }
    }

    fn custom() -> NotificationEvent {
        NotificationEvent::Custom {
            title: "test".to_string(),
            message: "hello".to_string(),
        }
    }

    #[tokio::test]
    async fn test_no_senders() {
        let manager = NotificationManager::new();
        assert!(matches!(
            manager.notify(custom()).await,
            Err(NotificationError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_disabled_sender_skipped() {
        let disabled = MockSender::new("off", false, false);
        let mut manager = NotificationManager::new();
        manager.add_sender(disabled.clone());

        assert!(matches!(
            manager.notify(custom()).await,
            Err(NotificationError::NotConfigured)
        ));
        assert_eq!(disabled.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_partial_failure_counts_successes() {
        let mut manager = NotificationManager::new();
        manager.add_sender(MockSender::new("ok", true, false));
        manager.add_sender(MockSender::new("bad", true, true));

        assert_eq!(manager.notify(custom()).await.unwrap(), 1);
        assert_eq!(manager.enabled_channels(), vec!["ok", "bad"]);
    }

    #[tokio::test]
    async fn test_all_failed_returns_last_error() {
        let mut manager = NotificationManager::new();
        manager.add_sender(MockSender::new("first", true, true));
        manager.add_sender(MockSender::new("second", true, true));

        match manager.notify(custom()).await {
            Err(NotificationError::SendFailed(name)) => assert_eq!(name, "second"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
