//! 백테스팅 엔진
//!
//! 과거 OHLC 데이터에 Goldbach 셋업 생성기를 적용하여 거래를 시뮬레이션합니다.
//!
//! # 실행 규칙
//!
//! - 각 바에서 직전 종가로 셋업을 생성하고, 필터를 통과하면 셋업의 진입가로 진입
//! - 보유 중에는 시간 초과 → 손절 → 2차 목표 → 1차 목표 순으로 청산 조건 확인
//! - 청산한 바에서는 재진입하지 않음
//! - 마지막 바 이후 남은 포지션은 마지막 종가로 `TIME_EXIT`
//!
//! # 사용 예시
//!
//! ```rust,ignore
//! use goldbach_analytics::backtest::{BacktestConfig, BacktestEngine};
//! use rust_decimal_macros::dec;
//!
//! let config = BacktestConfig::new(dec!(10000))
//!     .with_position_size_pct(dec!(2))
//!     .with_min_signal_strength(SignalStrength::Strong);
//!
//! let report = BacktestEngine::new(config).run(&bars)?;
//! println!("{}", report.summary());
//! ```

use chrono::NaiveDateTime;
use goldbach_core::{
    validate_po3, AmdCycle, Bias, GoldbachEngine, PriceBar, SignalStrength, TradePlan, TradeSetup,
    DEFAULT_PO3,
};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::backtest::{report::generate_report, statistics::BacktestStatistics};

/// 백테스트 오류
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BacktestError {
    /// 설정 오류
    #[error("백테스트 설정 오류: {0}")]
    ConfigError(String),

    /// 데이터 오류
    #[error("데이터 오류: {0}")]
    DataError(String),
}

/// 백테스트 결과 타입
pub type BacktestResult<T> = Result<T, BacktestError>;

// ==================== 설정 ====================

/// 백테스트 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// 초기 자본금
    #[serde(default = "default_initial_capital")]
    pub initial_capital: Decimal,

    /// 거래당 자본 비율 (%)
    #[serde(default = "default_position_size_pct")]
    pub position_size_pct: Decimal,

    /// 최대 동시 포지션 수 (엔진은 단일 포지션으로 실행)
    #[serde(default = "default_max_positions")]
    pub max_positions: usize,

    /// 편도 수수료 (금액)
    #[serde(default)]
    pub commission: Decimal,

    /// 편도 슬리피지 (금액)
    #[serde(default)]
    pub slippage: Decimal,

    /// 손절 사용 여부
    #[serde(default = "default_true")]
    pub use_stop_loss: bool,

    /// 추적 손절 사용 여부
    #[serde(default)]
    pub use_trailing_stop: bool,

    /// 추적 손절 간격 (진입가 대비 %)
    #[serde(default = "default_trailing_stop_pct")]
    pub trailing_stop_pct: Decimal,

    /// 최소 신호 강도
    #[serde(default = "default_min_signal_strength")]
    pub min_signal_strength: SignalStrength,

    /// 허용 플랜
    #[serde(default = "default_allowed_plans")]
    pub allowed_plans: Vec<TradePlan>,

    /// 허용 AMD 사이클
    #[serde(default = "default_allowed_amd_cycles")]
    pub allowed_amd_cycles: Vec<AmdCycle>,

    /// Goldbach 시간 확인 필수 여부
    #[serde(default)]
    pub require_goldbach_time: bool,

    /// 최대 보유 바 수
    #[serde(default = "default_max_bars_in_trade")]
    pub max_bars_in_trade: usize,

    /// PO3 범위 크기
    #[serde(default = "default_po3_size")]
    pub po3_size: u32,

    /// 심볼
    #[serde(default = "default_symbol")]
    pub symbol: String,
}

// 설정 기본값 함수들 (serde default용)
fn default_initial_capital() -> Decimal {
    dec!(10000)
}
fn default_position_size_pct() -> Decimal {
    Decimal::ONE
}
fn default_max_positions() -> usize {
    1
}
fn default_true() -> bool {
    true
}
fn default_trailing_stop_pct() -> Decimal {
    dec!(0.5)
}
fn default_min_signal_strength() -> SignalStrength {
    SignalStrength::Medium
}
fn default_allowed_plans() -> Vec<TradePlan> {
    TradePlan::ALL.to_vec()
}
fn default_allowed_amd_cycles() -> Vec<AmdCycle> {
    vec![AmdCycle::Manipulation, AmdCycle::Distribution1]
}
fn default_max_bars_in_trade() -> usize {
    50
}
fn default_po3_size() -> u32 {
    DEFAULT_PO3
}
fn default_symbol() -> String {
    "NQ".to_string()
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: default_initial_capital(),
            position_size_pct: default_position_size_pct(),
            max_positions: default_max_positions(),
            commission: Decimal::ZERO,
            slippage: Decimal::ZERO,
            use_stop_loss: true,
            use_trailing_stop: false,
            trailing_stop_pct: default_trailing_stop_pct(),
            min_signal_strength: default_min_signal_strength(),
            allowed_plans: default_allowed_plans(),
            allowed_amd_cycles: default_allowed_amd_cycles(),
            require_goldbach_time: false,
            max_bars_in_trade: default_max_bars_in_trade(),
            po3_size: default_po3_size(),
            symbol: default_symbol(),
        }
    }
}

impl BacktestConfig {
    /// 새로운 백테스트 설정을 생성합니다.
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            initial_capital,
            ..Default::default()
        }
    }

    /// 거래당 자본 비율 설정
    pub fn with_position_size_pct(mut self, pct: Decimal) -> Self {
        self.position_size_pct = pct;
        self
    }

    /// 수수료/슬리피지 설정 (편도 금액)
    pub fn with_costs(mut self, commission: Decimal, slippage: Decimal) -> Self {
        self.commission = commission;
        self.slippage = slippage;
        self
    }

    /// 손절 사용 설정
    pub fn with_stop_loss(mut self, enabled: bool) -> Self {
        self.use_stop_loss = enabled;
        self
    }

    /// 추적 손절 설정
    pub fn with_trailing_stop(mut self, enabled: bool, pct: Decimal) -> Self {
        self.use_trailing_stop = enabled;
        self.trailing_stop_pct = pct;
        self
    }

    /// 최소 신호 강도 설정
    pub fn with_min_signal_strength(mut self, strength: SignalStrength) -> Self {
        self.min_signal_strength = strength;
        self
    }

    /// 허용 플랜 설정
    pub fn with_allowed_plans(mut self, plans: Vec<TradePlan>) -> Self {
        self.allowed_plans = plans;
        self
    }

    /// 허용 AMD 사이클 설정
    pub fn with_allowed_amd_cycles(mut self, cycles: Vec<AmdCycle>) -> Self {
        self.allowed_amd_cycles = cycles;
        self
    }

    /// Goldbach 시간 확인 필수 설정
    pub fn with_require_goldbach_time(mut self, required: bool) -> Self {
        self.require_goldbach_time = required;
        self
    }

    /// 최대 보유 바 수 설정
    pub fn with_max_bars_in_trade(mut self, bars: usize) -> Self {
        self.max_bars_in_trade = bars;
        self
    }

    /// PO3 크기 설정
    pub fn with_po3_size(mut self, po3: u32) -> Self {
        self.po3_size = po3;
        self
    }

    /// 심볼 설정
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    /// 설정 검증
    pub fn validate(&self) -> BacktestResult<()> {
        if self.initial_capital <= Decimal::ZERO {
            return Err(BacktestError::ConfigError(
                "초기 자본은 0보다 커야 합니다".to_string(),
            ));
        }
        if self.position_size_pct <= Decimal::ZERO || self.position_size_pct > dec!(100) {
            return Err(BacktestError::ConfigError(
                "포지션 비율은 0 초과 100 이하여야 합니다".to_string(),
            ));
        }
        if self.commission < Decimal::ZERO {
            return Err(BacktestError::ConfigError(
                "수수료는 0 이상이어야 합니다".to_string(),
            ));
        }
        if self.slippage < Decimal::ZERO {
            return Err(BacktestError::ConfigError(
                "슬리피지는 0 이상이어야 합니다".to_string(),
            ));
        }
        if self.use_trailing_stop && self.trailing_stop_pct <= Decimal::ZERO {
            return Err(BacktestError::ConfigError(
                "추적 손절 비율은 0보다 커야 합니다".to_string(),
            ));
        }
        if self.max_bars_in_trade == 0 {
            return Err(BacktestError::ConfigError(
                "최대 보유 바 수는 1 이상이어야 합니다".to_string(),
            ));
        }
        if self.max_positions == 0 {
            return Err(BacktestError::ConfigError(
                "최대 포지션 수는 1 이상이어야 합니다".to_string(),
            ));
        }
        validate_po3(self.po3_size).map_err(|e| BacktestError::ConfigError(e.to_string()))?;
        Ok(())
    }
}

// ==================== 거래 ====================

/// 포지션 방향
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Long,
    Short,
}

/// 거래 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeOutcome {
    Win,
    Loss,
    Breakeven,
}

/// 청산 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitReason {
    #[serde(rename = "STOP_LOSS")]
    StopLoss,
    #[serde(rename = "TRAILING_STOP")]
    TrailingStop,
    #[serde(rename = "TARGET_1")]
    Target1,
    #[serde(rename = "TARGET_2")]
    Target2,
    #[serde(rename = "TIME_EXIT")]
    TimeExit,
}

/// 완료된 거래
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestTrade {
    pub id: u64,
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub symbol: String,
    pub direction: Direction,
    pub plan: TradePlan,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub stop_loss: Decimal,
    pub target_1: Decimal,
    pub target_2: Decimal,
    pub position_size: Decimal,
    pub pnl: Decimal,
    pub pnl_pct: f64,
    pub result: TradeOutcome,
    pub exit_reason: ExitReason,
    pub bars_held: usize,
    /// 최대 역행 폭 (가격 단위, 0 이하)
    pub mae: Decimal,
    /// 최대 순행 폭 (가격 단위, 0 이상)
    pub mfe: Decimal,
    pub signal_strength: SignalStrength,
    pub goldbach_time: bool,
    pub amd_cycle: AmdCycle,
}

/// 보유 중인 거래
#[derive(Debug, Clone)]
struct OpenTrade {
    id: u64,
    entry_bar: usize,
    entry_time: NaiveDateTime,
    direction: Direction,
    plan: TradePlan,
    entry_price: Decimal,
    stop_loss: Decimal,
    active_stop: Decimal,
    trailed: bool,
    best_price: Decimal,
    target_1: Decimal,
    target_2: Decimal,
    position_size: Decimal,
    signal_strength: SignalStrength,
    goldbach_time: bool,
    amd_cycle: AmdCycle,
    mae: Decimal,
    mfe: Decimal,
}

impl OpenTrade {
    fn from_setup(id: u64, setup: TradeSetup, entry_bar: usize, position_size: Decimal) -> Self {
        let direction = if setup.bias == Bias::Bullish {
            Direction::Long
        } else {
            Direction::Short
        };
        let target_price = |idx: usize| {
            setup
                .targets
                .get(idx)
                .map(|t| t.price)
                .unwrap_or(setup.entry_price)
        };

        Self {
            id,
            entry_bar,
            entry_time: setup.timestamp,
            direction,
            plan: setup.plan,
            entry_price: setup.entry_price,
            stop_loss: setup.stop_loss,
            active_stop: setup.stop_loss,
            trailed: false,
            best_price: setup.entry_price,
            target_1: target_price(0),
            target_2: target_price(1),
            position_size,
            signal_strength: setup.signal_strength,
            goldbach_time: setup.goldbach_time_confirm,
            amd_cycle: setup.amd_cycle,
            mae: Decimal::ZERO,
            mfe: Decimal::ZERO,
        }
    }

    /// MAE/MFE 갱신
    fn update_excursion(&mut self, bar: &PriceBar) {
        let (adverse, favorable) = match self.direction {
            Direction::Long => (bar.low - self.entry_price, bar.high - self.entry_price),
            Direction::Short => (self.entry_price - bar.high, self.entry_price - bar.low),
        };
        self.mae = self.mae.min(adverse);
        self.mfe = self.mfe.max(favorable);
    }

    /// 최고(숏은 최저) 가격에서 `distance`만큼 떨어진 위치로 손절을 끌어올림
    fn trail_stop(&mut self, bar: &PriceBar, distance: Decimal) {
        match self.direction {
            Direction::Long => {
                self.best_price = self.best_price.max(bar.high);
                let candidate = self.best_price - distance;
                if candidate > self.active_stop {
                    self.active_stop = candidate;
                    self.trailed = true;
                }
            }
            Direction::Short => {
                self.best_price = self.best_price.min(bar.low);
                let candidate = self.best_price + distance;
                if candidate < self.active_stop {
                    self.active_stop = candidate;
                    self.trailed = true;
                }
            }
        }
    }
}

// ==================== 리포트 ====================

/// 백테스트 실행 리포트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    /// 설정 정보
    pub config: BacktestConfig,

    /// 완료된 거래
    pub trades: Vec<BacktestTrade>,

    /// 통계
    pub statistics: BacktestStatistics,

    /// 데이터 포인트 수
    pub data_points: usize,

    /// 백테스트 기간 시작
    pub start_time: NaiveDateTime,

    /// 백테스트 기간 종료
    pub end_time: NaiveDateTime,
}

impl BacktestReport {
    /// 텍스트 리포트 반환
    pub fn summary(&self) -> String {
        generate_report(&self.statistics)
    }

    /// 거래 PnL 목록 (Monte Carlo 입력용)
    pub fn trade_pnls(&self) -> Vec<f64> {
        self.trades
            .iter()
            .map(|t| t.pnl.to_f64().unwrap_or(0.0))
            .collect()
    }
}

// ==================== 엔진 ====================

/// 백테스트 엔진
#[derive(Debug, Clone)]
pub struct BacktestEngine {
    config: BacktestConfig,
}

impl BacktestEngine {
    pub fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// 백테스트 실행
    ///
    /// 바는 날짜 기준으로 안정 정렬한 뒤 사용합니다.
    pub fn run(&self, bars: &[PriceBar]) -> BacktestResult<BacktestReport> {
        self.config.validate()?;
        if bars.is_empty() {
            return Err(BacktestError::DataError(
                "가격 데이터가 비어 있습니다".to_string(),
            ));
        }

        let mut bars = bars.to_vec();
        bars.sort_by_key(|b| b.date);

        let analyzer = GoldbachEngine::new(self.config.po3_size);
        let symbol = self.config.symbol.as_str();
        let trail_distance = |entry: Decimal| entry * self.config.trailing_stop_pct / dec!(100);

        let mut capital = self.config.initial_capital;
        let mut trades: Vec<BacktestTrade> = Vec::new();
        let mut open: Option<OpenTrade> = None;
        let mut next_id: u64 = 1;

        info!(
            symbol,
            bars = bars.len(),
            capital = %capital,
            "백테스트 시작"
        );

        for i in 1..bars.len() {
            let bar = &bars[i];

            if let Some(mut trade) = open.take() {
                if let Some((exit_price, reason)) = self.check_exit(&trade, bar, i) {
                    let bars_held = i - trade.entry_bar;
                    let closed = self.close_trade(trade, bar.date, exit_price, reason, bars_held);
                    capital += closed.pnl;
                    trades.push(closed);
                    continue;
                }

                trade.update_excursion(bar);
                if self.config.use_trailing_stop {
                    trade.trail_stop(bar, trail_distance(trade.entry_price));
                }
                open = Some(trade);
                continue;
            }

            if capital <= Decimal::ZERO {
                continue;
            }

            let prev_close = bars[i - 1].close;
            let setup = analyzer
                .generate_setup(prev_close, symbol, Some(self.config.po3_size), 0, bar.date)
                .map_err(|e| {
                    BacktestError::DataError(format!("{}번째 바 분석 실패: {}", i - 1, e))
                })?;

            let Some(setup) = setup else {
                continue;
            };
            if !self.passes_filters(&setup) {
                continue;
            }

            let position_size = capital * self.config.position_size_pct / dec!(100);
            let trade = OpenTrade::from_setup(next_id, setup, i, position_size);
            debug!(
                id = trade.id,
                direction = ?trade.direction,
                plan = %trade.plan,
                entry = %trade.entry_price,
                "포지션 진입"
            );
            next_id += 1;
            open = Some(trade);
        }

        if let Some(trade) = open.take() {
            let last = &bars[bars.len() - 1];
            let bars_held = bars.len() - trade.entry_bar;
            let closed = self.close_trade(trade, last.date, last.close, ExitReason::TimeExit, bars_held);
            capital += closed.pnl;
            trades.push(closed);
        }

        if capital <= Decimal::ZERO {
            warn!(capital = %capital, "자본 소진");
        }

        let statistics = BacktestStatistics::calculate(&trades, self.config.initial_capital);
        info!(
            trades = statistics.total_trades,
            win_rate = statistics.win_rate,
            total_pnl = %statistics.total_pnl,
            "백테스트 완료"
        );

        Ok(BacktestReport {
            config: self.config.clone(),
            trades,
            statistics,
            data_points: bars.len(),
            start_time: bars[0].date,
            end_time: bars[bars.len() - 1].date,
        })
    }

    /// 셋업 필터 (강도, 플랜, AMD 사이클, Goldbach 시간)
    fn passes_filters(&self, setup: &TradeSetup) -> bool {
        setup.signal_strength >= self.config.min_signal_strength
            && self.config.allowed_plans.contains(&setup.plan)
            && self.config.allowed_amd_cycles.contains(&setup.amd_cycle)
            && (!self.config.require_goldbach_time || setup.goldbach_time_confirm)
    }

    fn check_exit(&self, trade: &OpenTrade, bar: &PriceBar, bar_index: usize) -> Option<(Decimal, ExitReason)> {
        let bars_held = bar_index - trade.entry_bar;
        if bars_held >= self.config.max_bars_in_trade {
            return Some((bar.close, ExitReason::TimeExit));
        }

        let stop_active = self.config.use_stop_loss || trade.trailed;
        let stop_reason = if trade.trailed {
            ExitReason::TrailingStop
        } else {
            ExitReason::StopLoss
        };

        match trade.direction {
            Direction::Long => {
                if stop_active && bar.low <= trade.active_stop {
                    Some((trade.active_stop, stop_reason))
                } else if bar.high >= trade.target_2 {
                    Some((trade.target_2, ExitReason::Target2))
                } else if bar.high >= trade.target_1 {
                    Some((trade.target_1, ExitReason::Target1))
                } else {
                    None
                }
            }
            Direction::Short => {
                if stop_active && bar.high >= trade.active_stop {
                    Some((trade.active_stop, stop_reason))
                } else if bar.low <= trade.target_2 {
                    Some((trade.target_2, ExitReason::Target2))
                } else if bar.low <= trade.target_1 {
                    Some((trade.target_1, ExitReason::Target1))
                } else {
                    None
                }
            }
        }
    }

    fn close_trade(
        &self,
        trade: OpenTrade,
        exit_time: NaiveDateTime,
        exit_price: Decimal,
        exit_reason: ExitReason,
        bars_held: usize,
    ) -> BacktestTrade {
        let gross = match trade.direction {
            Direction::Long => (exit_price - trade.entry_price) * trade.position_size,
            Direction::Short => (trade.entry_price - exit_price) * trade.position_size,
        };
        // 진입 + 청산
        let pnl = gross - self.config.commission * dec!(2) - self.config.slippage * dec!(2);

        let pnl_pct = if trade.position_size.is_zero() {
            0.0
        } else {
            (pnl / trade.position_size * dec!(100)).to_f64().unwrap_or(0.0)
        };

        let result = if pnl > Decimal::ZERO {
            TradeOutcome::Win
        } else if pnl < Decimal::ZERO {
            TradeOutcome::Loss
        } else {
            TradeOutcome::Breakeven
        };

        debug!(
            id = trade.id,
            reason = ?exit_reason,
            exit = %exit_price,
            pnl = %pnl,
            "포지션 청산"
        );

        BacktestTrade {
            id: trade.id,
            entry_time: trade.entry_time,
            exit_time,
            symbol: self.config.symbol.clone(),
            direction: trade.direction,
            plan: trade.plan,
            entry_price: trade.entry_price,
            exit_price,
            stop_loss: trade.stop_loss,
            target_1: trade.target_1,
            target_2: trade.target_2,
            position_size: trade.position_size,
            pnl,
            pnl_pct,
            result,
            exit_reason,
            bars_held,
            mae: trade.mae,
            mfe: trade.mfe,
            signal_strength: trade.signal_strength,
            goldbach_time: trade.goldbach_time,
            amd_cycle: trade.amd_cycle,
        }
    }
}
