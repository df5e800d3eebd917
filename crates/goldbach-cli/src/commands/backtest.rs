//! 백테스트 명령어.
//!
//! JSON 또는 CSV 파일의 OHLC 데이터로 Goldbach 전략을 백테스트합니다.
//!
//! # 사용 예시
//!
//! ```bash
//! # 기본 설정으로 백테스트
//! goldbach backtest --data data/nq_1h.csv
//!
//! # Monte Carlo 1000회 + Walk-forward 5폴드, JSON 리포트 저장
//! goldbach backtest --data data/nq_1h.json --monte-carlo 1000 --seed 42 \
//!     --walk-forward 5 --output reports/nq.json
//! ```

use std::path::{Path, PathBuf};

use anyhow::Result;
use goldbach_analytics::{
    walk_forward, BacktestConfig, BacktestEngine, BacktestReport, MonteCarloResult,
    MonteCarloSimulator, WalkForwardSummary, DEFAULT_IN_SAMPLE_PCT,
};
use goldbach_core::SignalStrength;
use rust_decimal::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::commands::data::load_bars;

/// 백테스트 CLI 설정
#[derive(Debug, Clone)]
pub struct BacktestCliConfig {
    /// 데이터 파일 경로
    pub data_path: PathBuf,
    /// 초기 자본금
    pub initial_capital: Decimal,
    /// 거래당 자본 비율 (%)
    pub position_size_pct: Decimal,
    pub min_signal_strength: SignalStrength,
    pub po3_size: u32,
    pub symbol: String,
    pub require_goldbach_time: bool,
    /// Monte Carlo 반복 횟수 (없으면 생략)
    pub monte_carlo_iterations: Option<usize>,
    pub seed: Option<u64>,
    /// Walk-forward 폴드 수 (없으면 생략)
    pub walk_forward_folds: Option<usize>,
    /// 결과 저장 경로 (옵션)
    pub output_path: Option<PathBuf>,
}

impl Default for BacktestCliConfig {
    fn default() -> Self {
        let defaults = BacktestConfig::default();
        Self {
            data_path: PathBuf::new(),
            initial_capital: defaults.initial_capital,
            position_size_pct: defaults.position_size_pct,
            min_signal_strength: defaults.min_signal_strength,
            po3_size: defaults.po3_size,
            symbol: defaults.symbol,
            require_goldbach_time: defaults.require_goldbach_time,
            monte_carlo_iterations: None,
            seed: None,
            walk_forward_folds: None,
            output_path: None,
        }
    }
}

impl BacktestCliConfig {
    /// 엔진 설정으로 변환
    pub fn engine_config(&self) -> BacktestConfig {
        BacktestConfig::new(self.initial_capital)
            .with_position_size_pct(self.position_size_pct)
            .with_min_signal_strength(self.min_signal_strength)
            .with_po3_size(self.po3_size)
            .with_symbol(self.symbol.clone())
            .with_require_goldbach_time(self.require_goldbach_time)
    }
}

/// 백테스트 실행 결과
#[derive(Debug, Clone, Serialize)]
pub struct BacktestOutput {
    pub report: BacktestReport,
    pub monte_carlo: Option<MonteCarloResult>,
    pub walk_forward: Option<WalkForwardSummary>,
}

impl BacktestOutput {
    /// 텍스트 요약
    pub fn summary(&self) -> String {
        let mut text = self.report.summary();

        if let Some(mc) = &self.monte_carlo {
            text.push_str(&format!(
                "\nMONTE CARLO ({} iterations)\n\
                 Final Capital:   mean {:.2} | p50 {:.2} | p5 {:.2} | p95 {:.2}\n\
                 Max Drawdown:    mean {:.2}% | p95 {:.2}% | worst {:.2}%\n\
                 Risk of Ruin:    {:.2}%\n",
                mc.iterations,
                mc.final_capital.mean,
                mc.final_capital.percentile_50,
                mc.final_capital.percentile_5,
                mc.final_capital.percentile_95,
                mc.max_drawdown.mean,
                mc.max_drawdown.percentile_95,
                mc.max_drawdown.max,
                mc.risk_of_ruin,
            ));
        }

        if let Some(wf) = &self.walk_forward {
            text.push_str(&format!("\nWALK-FORWARD ({} folds)\n", wf.results.len()));
            for fold in &wf.results {
                text.push_str(&format!(
                    "Fold {}: IS {} trades / {:.1}% | OOS {} trades / {:.1}% | robustness {:.1}\n",
                    fold.fold,
                    fold.in_sample.trades,
                    fold.in_sample.win_rate,
                    fold.out_of_sample.trades,
                    fold.out_of_sample.win_rate,
                    fold.robustness_score,
                ));
            }
            text.push_str(&format!("Average Robustness: {:.1}\n", wf.avg_robustness));
        }

        text
    }
}

/// 백테스트 실행.
///
/// 출력 경로가 있으면 결과를 저장합니다.
pub fn run_backtest(config: &BacktestCliConfig) -> Result<BacktestOutput> {
    let engine_config = config.engine_config();
    engine_config.validate()?;
    let bars = load_bars(&config.data_path)?;

    info!(
        symbol = %engine_config.symbol,
        bars = bars.len(),
        capital = %engine_config.initial_capital,
        "백테스트 시작"
    );

    let report = BacktestEngine::new(engine_config.clone()).run(&bars)?;

    let monte_carlo = config.monte_carlo_iterations.and_then(|iterations| {
        let mut simulator = MonteCarloSimulator::new(iterations);
        if let Some(seed) = config.seed {
            simulator = simulator.with_seed(seed);
        }
        let capital = report.config.initial_capital.to_f64().unwrap_or(0.0);
        simulator.simulate(&report.trade_pnls(), capital)
    });

    let walk_forward = match config.walk_forward_folds {
        Some(folds) => Some(walk_forward(
            &bars,
            &engine_config,
            folds,
            DEFAULT_IN_SAMPLE_PCT,
        )?),
        None => None,
    };

    info!(
        trades = report.trades.len(),
        monte_carlo = monte_carlo.is_some(),
        walk_forward = walk_forward.is_some(),
        "백테스트 완료"
    );

    let output = BacktestOutput {
        report,
        monte_carlo,
        walk_forward,
    };

    if let Some(path) = &config.output_path {
        save_report(&output, path)?;
        info!(path = %path.display(), "결과 저장 완료");
    }

    Ok(output)
}

/// 결과 저장 (`.json`이면 JSON, 그 외에는 텍스트 요약)
fn save_report(output: &BacktestOutput, path: &Path) -> Result<()> {
    // 디렉토리 생성
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::to_string_pretty(output)?
    } else {
        output.summary()
    };

    std::fs::write(path, content)?;
    Ok(())
}
