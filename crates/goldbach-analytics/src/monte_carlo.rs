//! Monte Carlo 시뮬레이션
//!
//! 거래 순서를 무작위로 섞어 최종 자본과 최대 낙폭의 분포를 추정합니다.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// 기본 시뮬레이션 횟수
pub const DEFAULT_ITERATIONS: usize = 1000;

/// 최종 자본 분포
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionStats {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub percentile_5: f64,
    pub percentile_25: f64,
    pub percentile_50: f64,
    pub percentile_75: f64,
    pub percentile_95: f64,
}

/// 최대 낙폭(%) 분포
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownStats {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub percentile_95: f64,
}

/// 시뮬레이션 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloResult {
    pub iterations: usize,
    pub final_capital: DistributionStats,
    pub max_drawdown: DrawdownStats,
    /// 자본이 0 이하로 끝난 비율 (%)
    pub risk_of_ruin: f64,
}

/// Monte Carlo 시뮬레이터
#[derive(Debug, Clone)]
pub struct MonteCarloSimulator {
    iterations: usize,
    seed: Option<u64>,
}

impl Default for MonteCarloSimulator {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATIONS)
    }
}

impl MonteCarloSimulator {
    pub fn new(iterations: usize) -> Self {
        Self {
            iterations,
            seed: None,
        }
    }

    /// 재현 가능한 결과를 위한 시드 설정
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// 시뮬레이션 실행. 거래가 없거나 반복 횟수가 0이면 `None`.
    pub fn simulate(&self, pnls: &[f64], initial_capital: f64) -> Option<MonteCarloResult> {
        if pnls.is_empty() || self.iterations == 0 {
            return None;
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut shuffled = pnls.to_vec();
        let mut final_capitals = Vec::with_capacity(self.iterations);
        let mut max_drawdowns = Vec::with_capacity(self.iterations);

        for _ in 0..self.iterations {
            shuffled.shuffle(&mut rng);
            let (final_capital, max_dd) = run_path(&shuffled, initial_capital);
            final_capitals.push(final_capital);
            max_drawdowns.push(max_dd);
        }

        let ruined = final_capitals.iter().filter(|&&c| c <= 0.0).count();
        let risk_of_ruin = ruined as f64 / self.iterations as f64 * 100.0;

        sort_values(&mut final_capitals);
        sort_values(&mut max_drawdowns);

        debug!(
            iterations = self.iterations,
            trades = pnls.len(),
            risk_of_ruin,
            "Monte Carlo 시뮬레이션 완료"
        );

        Some(MonteCarloResult {
            iterations: self.iterations,
            final_capital: DistributionStats {
                mean: mean(&final_capitals),
                std: std_dev(&final_capitals),
                min: final_capitals[0],
                max: final_capitals[final_capitals.len() - 1],
                percentile_5: percentile(&final_capitals, 5.0),
                percentile_25: percentile(&final_capitals, 25.0),
                percentile_50: percentile(&final_capitals, 50.0),
                percentile_75: percentile(&final_capitals, 75.0),
                percentile_95: percentile(&final_capitals, 95.0),
            },
            max_drawdown: DrawdownStats {
                mean: mean(&max_drawdowns),
                std: std_dev(&max_drawdowns),
                min: max_drawdowns[0],
                max: max_drawdowns[max_drawdowns.len() - 1],
                percentile_95: percentile(&max_drawdowns, 95.0),
            },
            risk_of_ruin,
        })
    }
}

/// 한 경로의 (최종 자본, 최대 낙폭 %)
fn run_path(pnls: &[f64], initial_capital: f64) -> (f64, f64) {
    let mut equity = initial_capital;
    let mut peak = initial_capital;
    let mut max_dd: f64 = 0.0;

    for &pnl in pnls {
        equity += pnl;
        if equity > peak {
            peak = equity;
        }
        // 고점이 0 이하이면 낙폭 비율이 정의되지 않음
        let dd = if peak > 0.0 {
            (peak - equity) / peak * 100.0
        } else {
            0.0
        };
        max_dd = max_dd.max(dd);
    }

    (equity, max_dd)
}

fn sort_values(values: &mut [f64]) {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// 모표준편차
fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// 선형 보간 백분위수 (정렬된 입력)
pub fn percentile(sorted: &[f64], pct: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = pct.clamp(0.0, 100.0) / 100.0 * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let weight = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * weight
        }
    }
}
