//! 백테스팅 모듈
//!
//! 과거 데이터로 Goldbach 셋업을 시뮬레이션하고 성과를 분석합니다.
//!
//! # 주요 구성요소
//!
//! - [`BacktestConfig`]: 백테스트 설정 (초기 자본, 포지션 비율, 필터 등)
//! - [`BacktestEngine`]: 백테스트 실행 엔진
//! - [`BacktestStatistics`]: 거래 통계 및 분류별 성과
//! - [`generate_report`]: 텍스트 리포트

pub mod engine;
pub mod report;
pub mod statistics;

pub use engine::{
    BacktestConfig, BacktestEngine, BacktestError, BacktestReport, BacktestResult, BacktestTrade,
    Direction, ExitReason, TradeOutcome,
};
pub use report::{generate_report, money};
pub use statistics::{BacktestStatistics, GroupStats};
