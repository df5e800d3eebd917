//! 서비스 모듈.
//!
//! 가격 캐시, 시그널 저장소, 가격 알림, 스케줄러 등 라우트와 백그라운드 작업이 공유하는 서비스들을 제공합니다.

pub mod alerts;
pub mod price_cache;
pub mod scheduler;
pub mod signal_store;

pub use alerts::{AlertBook, AlertCondition, PriceAlert};
pub use price_cache::{PriceCache, PriceEntry};
pub use scheduler::{
    start_scheduler_service, JobConfig, JobType, Schedule, ScheduledJob, Scheduler,
};
pub use signal_store::{SignalStatistics, SignalStore, SIGNAL_STORE_CAPACITY};
