//! 백테스트 통합 테스트
//!
//! 2024-03-04(월) 03:00부터 1시간 간격 NQ 바로 전체 실행 경로를 검증합니다.
//!
//! ## 시나리오 (PO3 729, 범위 21141 - 21870)
//! 1. 04:00 롱 EINSTEIN 진입 (진입 21243.06, 손절 21192.03, T1 21483.63)
//! 2. 05:00 T1 도달 청산
//! 3. 06:00 REBALANCE 셋업은 WEAK → 필터링
//! 4. 07:00 숏 EINSTEIN 진입 (진입 21767.94, 손절 21818.97)
//! 5. 08:00 손절
//! 6. 10:00 롱 재진입, 마지막 바 이후 TIME_EXIT

use chrono::{Duration, NaiveDate, NaiveDateTime};
use goldbach_analytics::{
    walk_forward, BacktestConfig, BacktestEngine, Direction, ExitReason, MonteCarloSimulator,
    TradeOutcome,
};
use goldbach_core::{PriceBar, SignalStrength, TradePlan};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ============================================================================
// 테스트 헬퍼 함수
// ============================================================================

fn hour(offset: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 4)
        .unwrap()
        .and_hms_opt(3, 0, 0)
        .unwrap()
        + Duration::hours(offset)
}

fn bar(offset: i64, open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> PriceBar {
    PriceBar::new(hour(offset), open, high, low, close)
}

fn scenario_bars() -> Vec<PriceBar> {
    vec![
        bar(0, dec!(21150), dec!(21170), dec!(21140), dec!(21160)),
        bar(1, dec!(21160), dec!(21260), dec!(21210), dec!(21250)),
        bar(2, dec!(21250), dec!(21490), dec!(21230), dec!(21500)),
        bar(3, dec!(21500), dec!(21860), dec!(21490), dec!(21850)),
        bar(4, dec!(21780), dec!(21800), dec!(21760), dec!(21780)),
        bar(5, dec!(21780), dec!(21830), dec!(21490), dec!(21500)),
        bar(6, dec!(21500), dec!(21510), dec!(21150), dec!(21160)),
        bar(7, dec!(21240), dec!(21260), dec!(21220), dec!(21245)),
        bar(8, dec!(21245), dec!(21300), dec!(21200), dec!(21250)),
    ]
}

// ============================================================================
// 실행 경로 테스트
// ============================================================================

#[test]
fn test_full_scenario_trades() {
    let report = BacktestEngine::new(BacktestConfig::default())
        .run(&scenario_bars())
        .unwrap();

    assert_eq!(report.trades.len(), 3);
    assert_eq!(report.data_points, 9);

    let first = &report.trades[0];
    assert_eq!(first.id, 1);
    assert_eq!(first.direction, Direction::Long);
    assert_eq!(first.plan, TradePlan::Einstein);
    assert_eq!(first.entry_time, hour(1));
    assert_eq!(first.exit_time, hour(2));
    assert_eq!(first.entry_price, dec!(21243.06));
    assert_eq!(first.exit_price, dec!(21483.63));
    assert_eq!(first.exit_reason, ExitReason::Target1);
    assert_eq!(first.position_size, dec!(100));
    assert_eq!(first.pnl, dec!(24057));
    assert_eq!(first.pnl_pct, 24057.0);
    assert_eq!(first.result, TradeOutcome::Win);
    assert_eq!(first.bars_held, 1);
    assert_eq!(first.signal_strength, SignalStrength::Strong);

    let second = &report.trades[1];
    assert_eq!(second.direction, Direction::Short);
    assert_eq!(second.entry_time, hour(4));
    assert_eq!(second.exit_reason, ExitReason::StopLoss);
    assert_eq!(second.exit_price, dec!(21818.97));
    assert_eq!(second.position_size, dec!(340.57));
    assert_eq!(second.pnl, dec!(-17379.2871));
    assert_eq!(second.result, TradeOutcome::Loss);

    let third = &report.trades[2];
    assert_eq!(third.entry_time, hour(7));
    assert_eq!(third.exit_reason, ExitReason::TimeExit);
    assert_eq!(third.exit_price, dec!(21250));
    assert_eq!(third.bars_held, 2);
    assert_eq!(third.mae, dec!(-43.06));
    assert_eq!(third.mfe, dec!(56.94));
    assert_eq!(third.pnl, dec!(1157.43327526));
}

#[test]
fn test_full_scenario_statistics() {
    let report = BacktestEngine::new(BacktestConfig::default())
        .run(&scenario_bars())
        .unwrap();
    let stats = &report.statistics;

    assert_eq!(stats.total_trades, 3);
    assert_eq!(stats.winning_trades, 2);
    assert_eq!(stats.losing_trades, 1);
    assert_eq!(
        stats.equity_curve,
        vec![
            dec!(10000),
            dec!(34057),
            dec!(16677.7129),
            dec!(17835.14617526)
        ]
    );
    assert_eq!(stats.max_drawdown, dec!(17379.2871));
    assert_eq!(stats.max_drawdown_duration, 2);
    assert_eq!(stats.max_consecutive_wins, 1);
    assert_eq!(stats.max_consecutive_losses, 1);
    assert_eq!(stats.stats_by_day["Monday"].trades, 3);
    assert_eq!(stats.stats_by_amd["M"].trades, 2);
    assert_eq!(stats.stats_by_amd["D1"].trades, 1);
    assert_eq!(stats.monthly_returns.len(), 1);

    let summary = report.summary();
    assert!(summary.contains("Total Trades:       3"));
    assert!(summary.contains("Monday"));
}

#[test]
fn test_unsorted_input_is_sorted() {
    let sorted = BacktestEngine::new(BacktestConfig::default())
        .run(&scenario_bars())
        .unwrap();

    let mut reversed = scenario_bars();
    reversed.reverse();
    let from_reversed = BacktestEngine::new(BacktestConfig::default())
        .run(&reversed)
        .unwrap();

    assert_eq!(sorted.trades, from_reversed.trades);
}

// ============================================================================
// 필터 테스트
// ============================================================================

#[test]
fn test_require_goldbach_time() {
    let config = BacktestConfig::default().with_require_goldbach_time(true);
    let report = BacktestEngine::new(config).run(&scenario_bars()).unwrap();

    // 11:00 (11 + 0 = 11) 만 Goldbach 시간
    assert_eq!(report.trades.len(), 1);
    assert!(report.trades[0].goldbach_time);
    assert_eq!(report.trades[0].entry_time, hour(8));
    assert_eq!(report.trades[0].bars_held, 1);
}

#[test]
fn test_plan_and_amd_filters() {
    let config = BacktestConfig::default().with_allowed_plans(vec![TradePlan::Rebalance]);
    let report = BacktestEngine::new(config).run(&scenario_bars()).unwrap();
    assert!(report.trades.is_empty());

    // D1만 허용 → 10:00 진입만 남음
    let config = BacktestConfig::default()
        .with_allowed_amd_cycles(vec![goldbach_core::AmdCycle::Distribution1]);
    let report = BacktestEngine::new(config).run(&scenario_bars()).unwrap();
    assert_eq!(report.trades.len(), 1);
    assert_eq!(report.trades[0].entry_time, hour(7));
}

#[test]
fn test_min_strength_filter() {
    let config = BacktestConfig::default().with_min_signal_strength(SignalStrength::Excellent);
    let report = BacktestEngine::new(config).run(&scenario_bars()).unwrap();

    // Goldbach 시간이 겹친 11:00 셋업만 PERFECT
    assert_eq!(report.trades.len(), 1);
    assert_eq!(report.trades[0].signal_strength, SignalStrength::Perfect);
}

// ============================================================================
// 손절 테스트
// ============================================================================

#[test]
fn test_trailing_stop() {
    let bars = vec![
        bar(0, dec!(21150), dec!(21170), dec!(21140), dec!(21160)),
        bar(1, dec!(21160), dec!(21260), dec!(21210), dec!(21250)),
        bar(2, dec!(21250), dec!(21400), dec!(21300), dec!(21390)),
        bar(3, dec!(21390), dec!(21395), dec!(21280), dec!(21290)),
    ];
    let config = BacktestConfig::default().with_trailing_stop(true, dec!(0.5));
    let report = BacktestEngine::new(config).run(&bars).unwrap();

    let trade = &report.trades[0];
    assert_eq!(trade.exit_reason, ExitReason::TrailingStop);
    // 21400 - 21243.06 * 0.5%
    assert_eq!(trade.exit_price, dec!(21293.7847));
    assert_eq!(trade.stop_loss, dec!(21192.03));
    assert_eq!(trade.pnl, dec!(5072.47));
    assert_eq!(trade.result, TradeOutcome::Win);
}

#[test]
fn test_stop_loss_disabled() {
    let config = BacktestConfig::default().with_stop_loss(false);
    let report = BacktestEngine::new(config).run(&scenario_bars()).unwrap();

    assert!(report
        .trades
        .iter()
        .all(|t| t.exit_reason != ExitReason::StopLoss));
}

// ============================================================================
// Monte Carlo / Walk-forward
// ============================================================================

#[test]
fn test_monte_carlo_from_report() {
    let report = BacktestEngine::new(BacktestConfig::default())
        .run(&scenario_bars())
        .unwrap();

    let result = MonteCarloSimulator::new(100)
        .with_seed(11)
        .simulate(&report.trade_pnls(), 10000.0)
        .unwrap();

    assert_eq!(result.iterations, 100);
    assert!((result.final_capital.mean - 17835.14617526).abs() < 1e-6);
    assert!(result.final_capital.percentile_5 <= result.final_capital.percentile_95);
}

#[test]
fn test_walk_forward_folds() {
    let mut bars = scenario_bars();
    bars.extend(
        scenario_bars()
            .into_iter()
            .map(|b| PriceBar::new(b.date + Duration::hours(9), b.open, b.high, b.low, b.close)),
    );
    bars.truncate(16);

    let summary = walk_forward(&bars, &BacktestConfig::default(), 4, 0.7).unwrap();

    assert_eq!(summary.results.len(), 4);
    // 폴드 크기 4, in-sample 2바, out-of-sample 2바
    for (idx, fold) in summary.results.iter().enumerate() {
        assert_eq!(fold.fold, idx + 1);
        assert!(fold.in_sample.start.is_some());
        assert!(fold.out_of_sample.end.is_some());
        assert!((0.0..=100.0).contains(&fold.robustness_score));
    }
    assert_eq!(summary.results[0].in_sample.start, Some(hour(0)));
    assert_eq!(summary.results[0].out_of_sample.start, Some(hour(2)));
}

#[test]
fn test_walk_forward_too_few_bars() {
    let bars = scenario_bars();
    assert!(walk_forward(&bars[..3], &BacktestConfig::default(), 5, 0.7).is_err());
}
