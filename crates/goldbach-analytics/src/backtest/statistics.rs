//! 백테스트 통계.

use std::collections::BTreeMap;

use chrono::{Datelike, Weekday};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

use crate::backtest::engine::{BacktestTrade, TradeOutcome};

/// 평일 (항상 요일별 통계에 포함)
pub const WEEKDAYS: [&str; 5] = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"];

/// 요일 이름 (월요일 → 일요일 순)
pub const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

fn day_name(day: Weekday) -> &'static str {
    DAY_NAMES[day.num_days_from_monday() as usize]
}

/// 그룹별 통계
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub trades: usize,
    pub wins: usize,
    pub pnl: Decimal,
    pub win_rate: f64,
}

impl GroupStats {
    fn record(&mut self, trade: &BacktestTrade) {
        self.trades += 1;
        if trade.result == TradeOutcome::Win {
            self.wins += 1;
        }
        self.pnl += trade.pnl;
        self.win_rate = self.wins as f64 / self.trades as f64 * 100.0;
    }
}

/// 백테스트 통계
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestStatistics {
    // 기본
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub breakeven_trades: usize,
    pub win_rate: f64,

    // 손익
    pub total_pnl: Decimal,
    pub total_pnl_pct: f64,
    pub avg_win: Decimal,
    pub avg_loss: Decimal,
    pub largest_win: Decimal,
    pub largest_loss: Decimal,
    pub profit_factor: f64,
    pub expectancy: Decimal,
    pub risk_reward_ratio: f64,

    // 낙폭
    pub max_drawdown: Decimal,
    pub max_drawdown_pct: f64,
    pub avg_drawdown: Decimal,
    /// 고점 아래에 머문 가장 긴 연속 구간 (자산 곡선 포인트 수)
    pub max_drawdown_duration: usize,

    // 연속 기록
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,

    // 보유 기간
    pub avg_bars_held: f64,
    pub avg_bars_winner: f64,
    pub avg_bars_loser: f64,

    // 분류별
    pub stats_by_plan: BTreeMap<String, GroupStats>,
    pub stats_by_strength: BTreeMap<String, GroupStats>,
    pub stats_by_amd: BTreeMap<String, GroupStats>,
    pub stats_by_day: BTreeMap<String, GroupStats>,

    /// 청산 월(`%Y-%m`)별 손익
    pub monthly_returns: BTreeMap<String, Decimal>,

    /// 거래별 자산 곡선 (초기 자본으로 시작)
    pub equity_curve: Vec<Decimal>,
}

impl BacktestStatistics {
    /// 거래가 없을 때의 통계
    pub fn empty(initial_capital: Decimal) -> Self {
        Self {
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            breakeven_trades: 0,
            win_rate: 0.0,
            total_pnl: Decimal::ZERO,
            total_pnl_pct: 0.0,
            avg_win: Decimal::ZERO,
            avg_loss: Decimal::ZERO,
            largest_win: Decimal::ZERO,
            largest_loss: Decimal::ZERO,
            profit_factor: 0.0,
            expectancy: Decimal::ZERO,
            risk_reward_ratio: 0.0,
            max_drawdown: Decimal::ZERO,
            max_drawdown_pct: 0.0,
            avg_drawdown: Decimal::ZERO,
            max_drawdown_duration: 0,
            max_consecutive_wins: 0,
            max_consecutive_losses: 0,
            avg_bars_held: 0.0,
            avg_bars_winner: 0.0,
            avg_bars_loser: 0.0,
            stats_by_plan: BTreeMap::new(),
            stats_by_strength: BTreeMap::new(),
            stats_by_amd: BTreeMap::new(),
            stats_by_day: weekday_template(),
            monthly_returns: BTreeMap::new(),
            equity_curve: vec![initial_capital],
        }
    }

    /// 거래 목록으로부터 통계 계산
    pub fn calculate(trades: &[BacktestTrade], initial_capital: Decimal) -> Self {
        let mut stats = Self::empty(initial_capital);
        if trades.is_empty() {
            return stats;
        }

        let wins: Vec<&BacktestTrade> = trades
            .iter()
            .filter(|t| t.result == TradeOutcome::Win)
            .collect();
        let losses: Vec<&BacktestTrade> = trades
            .iter()
            .filter(|t| t.result == TradeOutcome::Loss)
            .collect();

        stats.total_trades = trades.len();
        stats.winning_trades = wins.len();
        stats.losing_trades = losses.len();
        stats.breakeven_trades = trades.len() - wins.len() - losses.len();
        stats.win_rate = wins.len() as f64 / trades.len() as f64 * 100.0;

        // 손익
        stats.total_pnl = trades.iter().map(|t| t.pnl).sum();
        stats.total_pnl_pct = trades.iter().map(|t| t.pnl_pct).sum();

        let gross_profit: Decimal = wins.iter().map(|t| t.pnl).sum();
        let gross_loss_sum: Decimal = losses.iter().map(|t| t.pnl).sum();

        if !wins.is_empty() {
            stats.avg_win = gross_profit / Decimal::from(wins.len());
            stats.largest_win = wins.iter().map(|t| t.pnl).max().unwrap_or_default();
        }
        if !losses.is_empty() {
            stats.avg_loss = gross_loss_sum / Decimal::from(losses.len());
            stats.largest_loss = losses.iter().map(|t| t.pnl).min().unwrap_or_default();
        }

        let gross_loss = if losses.is_empty() {
            Decimal::ONE
        } else {
            gross_loss_sum.abs()
        };
        stats.profit_factor = if gross_loss > Decimal::ZERO {
            (gross_profit / gross_loss).to_f64().unwrap_or(0.0)
        } else {
            0.0
        };

        stats.expectancy = stats.total_pnl / Decimal::from(trades.len());
        if !stats.avg_loss.is_zero() {
            stats.risk_reward_ratio = (stats.avg_win / stats.avg_loss).abs().to_f64().unwrap_or(0.0);
        }

        // 자산 곡선과 낙폭
        let mut equity = initial_capital;
        for trade in trades {
            equity += trade.pnl;
            stats.equity_curve.push(equity);
        }
        stats.apply_drawdown(initial_capital);

        // 연속 기록
        let (max_wins, max_losses) = consecutive_streaks(trades);
        stats.max_consecutive_wins = max_wins;
        stats.max_consecutive_losses = max_losses;

        // 보유 기간
        stats.avg_bars_held = average_bars(trades.iter());
        stats.avg_bars_winner = average_bars(wins.iter().copied());
        stats.avg_bars_loser = average_bars(losses.iter().copied());

        // 분류별
        for trade in trades {
            stats
                .stats_by_plan
                .entry(trade.plan.as_str().to_string())
                .or_default()
                .record(trade);
            stats
                .stats_by_strength
                .entry(trade.signal_strength.as_str().to_string())
                .or_default()
                .record(trade);
            stats
                .stats_by_amd
                .entry(trade.amd_cycle.code().to_string())
                .or_default()
                .record(trade);
            stats
                .stats_by_day
                .entry(day_name(trade.entry_time.weekday()).to_string())
                .or_default()
                .record(trade);
            *stats
                .monthly_returns
                .entry(trade.exit_time.format("%Y-%m").to_string())
                .or_default() += trade.pnl;
        }

        stats
    }

    fn apply_drawdown(&mut self, initial_capital: Decimal) {
        let Some(&first) = self.equity_curve.first() else {
            return;
        };

        let mut peak = first;
        let mut drawdown_sum = Decimal::ZERO;
        let mut run = 0usize;

        for &equity in &self.equity_curve {
            if equity > peak {
                peak = equity;
            }
            let drawdown = peak - equity;
            drawdown_sum += drawdown;
            self.max_drawdown = self.max_drawdown.max(drawdown);

            if equity < peak {
                run += 1;
                self.max_drawdown_duration = self.max_drawdown_duration.max(run);
            } else {
                run = 0;
            }
        }

        self.avg_drawdown = drawdown_sum / Decimal::from(self.equity_curve.len());
        if initial_capital > Decimal::ZERO {
            self.max_drawdown_pct = (self.max_drawdown / initial_capital * Decimal::ONE_HUNDRED)
                .to_f64()
                .unwrap_or(0.0);
        }
    }
}

fn weekday_template() -> BTreeMap<String, GroupStats> {
    WEEKDAYS
        .iter()
        .map(|day| (day.to_string(), GroupStats::default()))
        .collect()
}

/// (최대 연승, 최대 연패). 무승부는 연속 기록을 끊습니다.
fn consecutive_streaks(trades: &[BacktestTrade]) -> (usize, usize) {
    let mut max_wins = 0;
    let mut max_losses = 0;
    let mut streak = 0;
    let mut last: Option<TradeOutcome> = None;

    for trade in trades {
        streak = if last == Some(trade.result) { streak + 1 } else { 1 };
        match trade.result {
            TradeOutcome::Win => max_wins = max_wins.max(streak),
            TradeOutcome::Loss => max_losses = max_losses.max(streak),
            TradeOutcome::Breakeven => {}
        }
        last = Some(trade.result);
    }

    (max_wins, max_losses)
}

fn average_bars<'a>(trades: impl Iterator<Item = &'a BacktestTrade>) -> f64 {
    let (count, total) = trades.fold((0usize, 0usize), |(c, s), t| (c + 1, s + t.bars_held));
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};
    use goldbach_core::{AmdCycle, SignalStrength, TradePlan};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::backtest::engine::{Direction, ExitReason};

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, d)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn create_trade(id: u64, pnl: Decimal, entry_day: u32, bars_held: usize) -> BacktestTrade {
        let result = if pnl > Decimal::ZERO {
            TradeOutcome::Win
        } else if pnl < Decimal::ZERO {
            TradeOutcome::Loss
        } else {
            TradeOutcome::Breakeven
        };

        BacktestTrade {
            id,
            entry_time: day(entry_day),
            exit_time: day(entry_day),
            symbol: "NQ".to_string(),
            direction: Direction::Long,
            plan: TradePlan::Einstein,
            entry_price: dec!(100),
            exit_price: dec!(100),
            stop_loss: dec!(90),
            target_1: dec!(110),
            target_2: dec!(120),
            position_size: dec!(100),
            pnl,
            pnl_pct: (pnl / dec!(100) * dec!(100)).to_f64().unwrap(),
            result,
            exit_reason: ExitReason::Target1,
            bars_held,
            mae: Decimal::ZERO,
            mfe: Decimal::ZERO,
            signal_strength: SignalStrength::Strong,
            goldbach_time: false,
            amd_cycle: AmdCycle::Distribution1,
        }
    }

    #[test]
    fn test_empty_statistics() {
        let stats = BacktestStatistics::calculate(&[], dec!(10000));

        assert_eq!(stats.total_trades, 0);
        assert_eq!(stats.equity_curve, vec![dec!(10000)]);
        assert_eq!(stats.stats_by_day.len(), 5);
        assert_eq!(stats.profit_factor, 0.0);
    }

    #[test]
    fn test_basic_counts_and_pnl() {
        // 2024-03-04 = 월요일
        let trades = vec![
            create_trade(1, dec!(200), 4, 2),
            create_trade(2, dec!(-100), 5, 4),
            create_trade(3, dec!(100), 6, 6),
            create_trade(4, Decimal::ZERO, 7, 1),
        ];
        let stats = BacktestStatistics::calculate(&trades, dec!(10000));

        assert_eq!(stats.total_trades, 4);
        assert_eq!(stats.winning_trades, 2);
        assert_eq!(stats.losing_trades, 1);
        assert_eq!(stats.breakeven_trades, 1);
        assert_eq!(stats.win_rate, 50.0);
        assert_eq!(stats.total_pnl, dec!(200));
        assert_eq!(stats.avg_win, dec!(150));
        assert_eq!(stats.largest_win, dec!(200));
        assert_eq!(stats.avg_loss, dec!(-100));
        assert_eq!(stats.largest_loss, dec!(-100));
        assert_eq!(stats.profit_factor, 3.0);
        assert_eq!(stats.expectancy, dec!(50));
        assert_eq!(stats.risk_reward_ratio, 1.5);
        assert_eq!(stats.avg_bars_held, 3.25);
        assert_eq!(stats.avg_bars_winner, 4.0);
        assert_eq!(stats.avg_bars_loser, 4.0);
    }

    #[test]
    fn test_profit_factor_without_losses() {
        let trades = vec![create_trade(1, dec!(50), 4, 1), create_trade(2, dec!(25), 5, 1)];
        let stats = BacktestStatistics::calculate(&trades, dec!(1000));

        // 손실이 없으면 분모 1
        assert_eq!(stats.profit_factor, 75.0);
        assert_eq!(stats.risk_reward_ratio, 0.0);
    }

    #[test]
    fn test_drawdown() {
        let trades = vec![
            create_trade(1, dec!(100), 4, 1),
            create_trade(2, dec!(-50), 5, 1),
            create_trade(3, dec!(-30), 6, 1),
            create_trade(4, dec!(200), 7, 1),
        ];
        let stats = BacktestStatistics::calculate(&trades, dec!(1000));

        assert_eq!(
            stats.equity_curve,
            vec![dec!(1000), dec!(1100), dec!(1050), dec!(1020), dec!(1220)]
        );
        assert_eq!(stats.max_drawdown, dec!(80));
        assert_eq!(stats.max_drawdown_pct, 8.0);
        // (0 + 0 + 50 + 80 + 0) / 5
        assert_eq!(stats.avg_drawdown, dec!(26));
        assert_eq!(stats.max_drawdown_duration, 2);
        assert_eq!(stats.max_consecutive_losses, 2);
        assert_eq!(stats.max_consecutive_wins, 1);
    }

    #[test]
    fn test_breakdowns() {
        let trades = vec![
            create_trade(1, dec!(100), 4, 1),
            create_trade(2, dec!(-50), 4, 1),
            // 2024-03-09 = 토요일
            create_trade(3, dec!(30), 9, 1),
        ];
        let stats = BacktestStatistics::calculate(&trades, dec!(1000));

        let monday = &stats.stats_by_day["Monday"];
        assert_eq!(monday.trades, 2);
        assert_eq!(monday.wins, 1);
        assert_eq!(monday.win_rate, 50.0);
        assert_eq!(monday.pnl, dec!(50));

        assert_eq!(stats.stats_by_day["Tuesday"].trades, 0);
        assert_eq!(stats.stats_by_day["Saturday"].trades, 1);
        assert!(!stats.stats_by_day.contains_key("Sunday"));

        assert_eq!(stats.stats_by_plan["EINSTEIN"].trades, 3);
        assert_eq!(stats.stats_by_strength["STRONG"].trades, 3);
        assert_eq!(stats.stats_by_amd["D1"].trades, 3);
        assert_eq!(stats.monthly_returns["2024-03"], dec!(80));
    }
}
