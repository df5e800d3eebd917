//! Goldbach 트레이딩 코어.
//!
//! PO3 범위와 Goldbach 레벨, 바이어스 분석, 타이밍(Goldbach 시간, AMD 사이클,
//! 월간 파티션), 트레이드 셋업 생성을 제공합니다.

pub mod bar;
pub mod engine;
pub mod error;
pub mod levels;
pub mod reference;
pub mod timing;
pub mod types;

pub use bar::{parse_bar_date, PriceBar};
pub use engine::{
    format_setup, score_signal, BiasAnalysis, GoldbachEngine, Invalidation, PositionInfo, Target,
    TradeSetup, SETUP_STATUS_PENDING,
};
pub use error::{CoreError, CoreResult};
pub use levels::{
    layer_for_position, validate_po3, GoldbachLevel, LevelDefinition, Po3Range, DEFAULT_PO3,
    GOLDBACH_LEVELS, PO3_SIZES,
};
pub use timing::{
    amd_cycle_at, next_goldbach_times, AmdInfo, GoldbachTime, MarketClock, PartitionInfo,
    GOLDBACH_NUMBERS,
};
pub use types::{AmdCycle, Bias, Layer, SignalStrength, TradePlan};
