//! Goldbach 분석 모듈.
//!
//! 백테스팅, 통계, Monte Carlo 시뮬레이션, Walk-forward 분석을 제공합니다.

pub mod backtest;
pub mod monte_carlo;
pub mod walk_forward;

pub use backtest::{
    generate_report, BacktestConfig, BacktestEngine, BacktestError, BacktestReport,
    BacktestResult, BacktestStatistics, BacktestTrade, Direction, ExitReason, GroupStats,
    TradeOutcome,
};
pub use monte_carlo::{
    DistributionStats, DrawdownStats, MonteCarloResult, MonteCarloSimulator, DEFAULT_ITERATIONS,
};
pub use walk_forward::{
    robustness_score, walk_forward, FoldResult, SegmentSummary, WalkForwardSummary,
    DEFAULT_IN_SAMPLE_PCT, DEFAULT_NUM_FOLDS,
};
