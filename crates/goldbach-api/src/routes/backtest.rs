//! 백테스트 API 라우트
//!
//! 요청 본문의 OHLC 데이터로 백테스트와 Walk-forward 분석을 실행합니다.
//! 계산은 `spawn_blocking`에서 수행되어 런타임 워커를 점유하지 않습니다.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use goldbach_analytics::{
    generate_report, walk_forward, BacktestConfig, BacktestEngine, BacktestStatistics,
    BacktestTrade, MonteCarloResult, MonteCarloSimulator, WalkForwardSummary, DEFAULT_IN_SAMPLE_PCT,
    DEFAULT_ITERATIONS, DEFAULT_NUM_FOLDS,
};
use goldbach_core::PriceBar;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::json_body;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

// ==================== Request/Response 타입 ====================

/// 백테스트 옵션. 백테스트 설정에 Monte Carlo 옵션이 추가됩니다.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BacktestOptions {
    #[serde(flatten)]
    pub config: BacktestConfig,
    #[serde(default)]
    pub run_monte_carlo: bool,
    #[serde(default)]
    pub monte_carlo_iterations: Option<usize>,
    /// 재현 가능한 Monte Carlo 결과용
    #[serde(default)]
    pub seed: Option<u64>,
}

/// 백테스트 요청
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BacktestRequest {
    #[serde(default)]
    pub data: Option<Vec<PriceBar>>,
    #[serde(default)]
    pub config: BacktestOptions,
}

/// 백테스트 응답
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResponse {
    pub statistics: BacktestStatistics,
    pub trades: Vec<BacktestTrade>,
    pub monte_carlo: Option<MonteCarloResult>,
    /// 텍스트 리포트
    pub report: String,
}

/// Walk-forward 요청
#[derive(Debug, Clone, Deserialize)]
pub struct WalkForwardRequest {
    #[serde(default)]
    pub data: Option<Vec<PriceBar>>,
    #[serde(default = "default_num_folds")]
    pub num_folds: usize,
    #[serde(default = "default_in_sample_pct")]
    pub in_sample_pct: f64,
    #[serde(default)]
    pub config: BacktestConfig,
}

fn default_num_folds() -> usize {
    DEFAULT_NUM_FOLDS
}

fn default_in_sample_pct() -> f64 {
    DEFAULT_IN_SAMPLE_PCT
}

fn require_data(data: Option<Vec<PriceBar>>) -> ApiResult<Vec<PriceBar>> {
    match data {
        Some(bars) if !bars.is_empty() => Ok(bars),
        _ => Err(ApiError::BadRequest("OHLC data is required".to_string())),
    }
}

// ==================== 핸들러 ====================

/// 백테스트 실행.
///
/// POST /api/backtest
pub async fn run_backtest(
    State(_state): State<Arc<AppState>>,
    payload: Result<Json<BacktestRequest>, JsonRejection>,
) -> ApiResult<Json<BacktestResponse>> {
    let req = json_body(payload)?;
    let bars = require_data(req.data)?;
    let options = req.config;
    options.config.validate()?;

    info!(
        bars = bars.len(),
        symbol = %options.config.symbol,
        monte_carlo = options.run_monte_carlo,
        "백테스트 요청"
    );

    let response = tokio::task::spawn_blocking(move || -> ApiResult<BacktestResponse> {
        let report = BacktestEngine::new(options.config).run(&bars)?;

        let monte_carlo = if options.run_monte_carlo {
            let mut simulator =
                MonteCarloSimulator::new(options.monte_carlo_iterations.unwrap_or(DEFAULT_ITERATIONS));
            if let Some(seed) = options.seed {
                simulator = simulator.with_seed(seed);
            }
            let capital = report.config.initial_capital.to_f64().unwrap_or(0.0);
            simulator.simulate(&report.trade_pnls(), capital)
        } else {
            None
        };

        Ok(BacktestResponse {
            report: generate_report(&report.statistics),
            statistics: report.statistics,
            trades: report.trades,
            monte_carlo,
        })
    })
    .await??;

    Ok(Json(response))
}

/// Walk-forward 분석.
///
/// POST /api/backtest/walk-forward
pub async fn run_walk_forward(
    State(_state): State<Arc<AppState>>,
    payload: Result<Json<WalkForwardRequest>, JsonRejection>,
) -> ApiResult<Json<WalkForwardSummary>> {
    let req = json_body(payload)?;
    let bars = require_data(req.data)?;

    info!(
        bars = bars.len(),
        folds = req.num_folds,
        in_sample_pct = req.in_sample_pct,
        "Walk-forward 요청"
    );

    let summary = tokio::task::spawn_blocking(move || {
        walk_forward(&bars, &req.config, req.num_folds, req.in_sample_pct)
    })
    .await??;

    Ok(Json(summary))
}

// ==================== 라우터 ====================

pub fn backtest_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(run_backtest))
        .route("/walk-forward", post(run_walk_forward))
}
