//! Walk-forward 분석
//!
//! 데이터를 폴드로 나누고 각 폴드를 in-sample / out-of-sample 구간으로 분할해
//! 두 구간의 성과를 비교합니다.

use chrono::NaiveDateTime;
use goldbach_core::PriceBar;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::backtest::{BacktestConfig, BacktestEngine, BacktestError, BacktestResult, BacktestStatistics};

/// 기본 in-sample 비율
pub const DEFAULT_IN_SAMPLE_PCT: f64 = 0.7;

/// 기본 폴드 수
pub const DEFAULT_NUM_FOLDS: usize = 5;

/// 구간 요약
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub trades: usize,
    pub win_rate: f64,
    pub pnl: Decimal,
}

impl SegmentSummary {
    fn new(bars: &[PriceBar], stats: &BacktestStatistics) -> Self {
        Self {
            start: bars.first().map(|b| b.date),
            end: bars.last().map(|b| b.date),
            trades: stats.total_trades,
            win_rate: stats.win_rate,
            pnl: stats.total_pnl,
        }
    }
}

/// 폴드 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldResult {
    /// 1부터 시작
    pub fold: usize,
    pub in_sample: SegmentSummary,
    pub out_of_sample: SegmentSummary,
    pub robustness_score: f64,
}

/// Walk-forward 전체 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardSummary {
    pub results: Vec<FoldResult>,
    pub avg_robustness: f64,
}

/// in-sample 대비 out-of-sample 성과 유지 정도 (0-100)
pub fn robustness_score(in_sample: &BacktestStatistics, out_of_sample: &BacktestStatistics) -> f64 {
    if in_sample.win_rate == 0.0 {
        return 0.0;
    }

    let win_rate_ratio = out_of_sample.win_rate / in_sample.win_rate;
    let pf_ratio = if in_sample.profit_factor > 0.0 {
        out_of_sample.profit_factor / in_sample.profit_factor
    } else {
        0.0
    };

    (win_rate_ratio * 50.0 + pf_ratio * 50.0).clamp(0.0, 100.0)
}

/// Walk-forward 분석 실행
pub fn walk_forward(
    bars: &[PriceBar],
    config: &BacktestConfig,
    num_folds: usize,
    in_sample_pct: f64,
) -> BacktestResult<WalkForwardSummary> {
    config.validate()?;
    if num_folds == 0 {
        return Err(BacktestError::DataError(
            "폴드 수는 1 이상이어야 합니다".to_string(),
        ));
    }
    if bars.len() < num_folds {
        return Err(BacktestError::DataError(format!(
            "데이터가 부족합니다: 바 {}개, 폴드 {}개",
            bars.len(),
            num_folds
        )));
    }
    if !(in_sample_pct > 0.0 && in_sample_pct < 1.0) {
        return Err(BacktestError::ConfigError(
            "in-sample 비율은 0과 1 사이여야 합니다".to_string(),
        ));
    }

    let mut bars = bars.to_vec();
    bars.sort_by_key(|b| b.date);

    let engine = BacktestEngine::new(config.clone());
    let fold_size = bars.len() / num_folds;
    let in_sample_len = (fold_size as f64 * in_sample_pct) as usize;

    info!(
        bars = bars.len(),
        folds = num_folds,
        fold_size,
        "Walk-forward 분석 시작"
    );

    let mut results = Vec::with_capacity(num_folds);
    for fold in 0..num_folds {
        let fold_start = fold * fold_size;
        let split = fold_start + in_sample_len;
        let fold_end = fold_start + fold_size;

        let in_bars = &bars[fold_start..split];
        let out_bars = &bars[split..fold_end];

        let in_stats = run_segment(&engine, in_bars)?;
        let out_stats = run_segment(&engine, out_bars)?;
        let robustness = robustness_score(&in_stats, &out_stats);

        debug!(
            fold = fold + 1,
            in_trades = in_stats.total_trades,
            out_trades = out_stats.total_trades,
            robustness,
            "폴드 완료"
        );

        results.push(FoldResult {
            fold: fold + 1,
            in_sample: SegmentSummary::new(in_bars, &in_stats),
            out_of_sample: SegmentSummary::new(out_bars, &out_stats),
            robustness_score: robustness,
        });
    }

    let avg_robustness =
        results.iter().map(|r| r.robustness_score).sum::<f64>() / results.len() as f64;

    Ok(WalkForwardSummary {
        results,
        avg_robustness,
    })
}

/// 바가 2개 미만이면 거래가 발생할 수 없으므로 빈 통계
fn run_segment(engine: &BacktestEngine, bars: &[PriceBar]) -> BacktestResult<BacktestStatistics> {
    if bars.len() < 2 {
        return Ok(BacktestStatistics::empty(engine.config().initial_capital));
    }
    Ok(engine.run(bars)?.statistics)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn stats_with(win_rate: f64, profit_factor: f64) -> BacktestStatistics {
        let mut stats = BacktestStatistics::empty(dec!(10000));
        stats.win_rate = win_rate;
        stats.profit_factor = profit_factor;
        stats
    }

    #[test]
    fn test_robustness_score() {
        assert_eq!(robustness_score(&stats_with(50.0, 2.0), &stats_with(25.0, 1.0)), 50.0);
        assert_eq!(robustness_score(&stats_with(0.0, 2.0), &stats_with(80.0, 3.0)), 0.0);
        // 상한 100
        assert_eq!(robustness_score(&stats_with(40.0, 1.0), &stats_with(80.0, 3.0)), 100.0);
        // in-sample PF 0 → PF 항 제외
        assert_eq!(robustness_score(&stats_with(50.0, 0.0), &stats_with(50.0, 1.0)), 50.0);
    }

    #[test]
    fn test_invalid_folds() {
        let config = BacktestConfig::default();
        assert!(matches!(
            walk_forward(&[], &config, 0, DEFAULT_IN_SAMPLE_PCT),
            Err(BacktestError::DataError(_))
        ));
    }
}
