//! Goldbach 분석 엔진.
//!
//! 가격의 범위 내 위치로 바이어스를 판단하고, 타이밍(Goldbach 시간, AMD 사이클,
//! 월간 파티션)과 결합하여 트레이드 셋업을 생성합니다.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CoreResult;
use crate::levels::{layer_for_position, GoldbachLevel, Po3Range, DEFAULT_PO3};
use crate::timing::{AmdInfo, GoldbachTime, PartitionInfo};
use crate::types::{AmdCycle, Bias, Layer, SignalStrength, TradePlan};

/// 생성 직후 셋업 상태
pub const SETUP_STATUS_PENDING: &str = "PENDING";

const MIN_CONFIDENCE: u8 = 40;
const MAX_CONFIDENCE: u8 = 85;

// ==================== 분석 결과 타입 ====================

/// 가격 위치 정보
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionInfo {
    pub price: Decimal,
    pub range: Po3Range,
    pub position: f64,
    pub position_str: String,
    pub layer: Option<Layer>,
    pub nearest_level: Option<GoldbachLevel>,
}

/// 바이어스 분석 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasAnalysis {
    pub bias: Bias,
    pub confidence: u8,
    pub gip_level: u8,
    pub position: f64,
    pub layer: Layer,
    pub reasoning: Vec<String>,
}

/// 목표가
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub level: u8,
    pub price: Decimal,
}

/// 무효화 조건
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invalidation {
    pub level: u8,
    pub price: Decimal,
    pub description: String,
}

/// 트레이드 셋업
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSetup {
    pub id: u64,
    pub timestamp: NaiveDateTime,
    pub symbol: String,
    pub plan: TradePlan,
    pub bias: Bias,
    pub confidence: u8,
    pub entry_zone: (Decimal, Decimal),
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub targets: Vec<Target>,
    pub invalidation: Invalidation,
    pub reasoning: Vec<String>,
    pub goldbach_time_confirm: bool,
    pub amd_cycle: AmdCycle,
    pub monthly_partition_day: u32,
    pub signal_strength: SignalStrength,
    pub status: String,
    pub result: Option<String>,
}

/// 플랜별 레벨 배치 (퍼센트)
struct PlanLayout {
    plan: TradePlan,
    entry: (u8, u8),
    targets: [(&'static str, u8); 2],
    invalidation: (u8, &'static str),
}

/// EINSTEIN 목표가 이름 (부분/전량 청산)
const STAGED_TARGETS: [&str; 2] = ["T1 (Partial)", "T2 (Full)"];
const PLAIN_TARGETS: [&str; 2] = ["T1", "T2"];

/// 위치와 바이어스로 플랜을 선택합니다. 위에서부터 처음 일치하는 규칙이 적용됩니다.
fn select_plan(position: f64, bias: Bias) -> Option<PlanLayout> {
    let bullish = bias == Bias::Bullish;
    let bearish = bias == Bias::Bearish;

    let layout = |plan: TradePlan, entry, t1, t2, invalidation| {
        let [n1, n2] = if plan == TradePlan::Einstein {
            STAGED_TARGETS
        } else {
            PLAIN_TARGETS
        };
        PlanLayout {
            plan,
            entry,
            targets: [(n1, t1), (n2, t2)],
            invalidation,
        }
    };

    if position <= 17.0 && bullish {
        Some(layout(TradePlan::Einstein, (11, 17), 47, 59, (7, "Below LLOD [7]")))
    } else if position >= 83.0 && bearish {
        Some(layout(TradePlan::Einstein, (83, 89), 53, 41, (93, "Above LLOD [93]")))
    } else if position <= 11.0 && bullish {
        Some(layout(TradePlan::Liquidity, (3, 11), 29, 50, (0, "Below Range Low")))
    } else if position >= 89.0 && bearish {
        Some(layout(TradePlan::Liquidity, (89, 97), 71, 50, (100, "Above Range High")))
    } else if (29.0..=35.0).contains(&position) && bullish {
        Some(layout(TradePlan::FlowContinuation, (29, 35), 50, 71, (17, "Below GIP [17]")))
    } else if (65.0..=71.0).contains(&position) && bearish {
        Some(layout(TradePlan::FlowContinuation, (65, 71), 50, 29, (83, "Above GIP [83]")))
    } else if (41.0..=59.0).contains(&position) && position <= 50.0 {
        Some(layout(TradePlan::Rebalance, (41, 47), 53, 59, (35, "Below Flow [35]")))
    } else if (41.0..=59.0).contains(&position) {
        Some(layout(TradePlan::Rebalance, (53, 59), 47, 41, (65, "Above Flow [65]")))
    } else {
        None
    }
}

/// 신호 강도 점수 계산
pub fn score_signal(
    confidence: u8,
    goldbach_time: bool,
    amd_cycle: AmdCycle,
    key_day: bool,
    layer: Layer,
) -> SignalStrength {
    let mut score = 0u8;

    if confidence >= 70 {
        score += 2;
    } else if confidence >= 60 {
        score += 1;
    }
    if goldbach_time {
        score += 2;
    }
    if matches!(amd_cycle, AmdCycle::Manipulation | AmdCycle::Distribution1) {
        score += 1;
    }
    if key_day {
        score += 1;
    }
    if layer == Layer::Liquidity {
        score += 1;
    }

    SignalStrength::from_score(score)
}

// ==================== 엔진 ====================

/// Goldbach 분석 엔진
///
/// 셋업 카운터는 원자적이므로 `Arc`로 공유하여 여러 태스크에서 사용할 수 있습니다.
#[derive(Debug)]
pub struct GoldbachEngine {
    default_po3: u32,
    setup_counter: AtomicU64,
}

impl Default for GoldbachEngine {
    fn default() -> Self {
        Self::new(DEFAULT_PO3)
    }
}

impl GoldbachEngine {
    pub fn new(default_po3: u32) -> Self {
        Self {
            default_po3,
            setup_counter: AtomicU64::new(0),
        }
    }

    pub fn default_po3(&self) -> u32 {
        self.default_po3
    }

    /// 지금까지 `generate_setup`이 호출된 횟수
    pub fn setups_generated(&self) -> u64 {
        self.setup_counter.load(Ordering::Relaxed)
    }

    /// 가격의 PO3 범위 (`po3`가 없으면 기본 크기)
    pub fn calculate_range(&self, price: Decimal, po3: Option<u32>) -> CoreResult<Po3Range> {
        Po3Range::from_price(price, po3.unwrap_or(self.default_po3))
    }

    /// 가격 위치 정보
    pub fn position_info(&self, price: Decimal, po3: Option<u32>) -> CoreResult<PositionInfo> {
        let range = self.calculate_range(price, po3)?;
        let position = range.position(price);
        let nearest_level = range.nearest_level(price).cloned();

        Ok(PositionInfo {
            price,
            position,
            position_str: format!("[{:.0}]", position),
            layer: layer_for_position(position),
            nearest_level,
            range,
        })
    }

    /// 바이어스 분석
    pub fn analyze_bias(
        &self,
        price: Decimal,
        po3: Option<u32>,
        trend_days: i32,
    ) -> CoreResult<BiasAnalysis> {
        let range = self.calculate_range(price, po3)?;
        Ok(bias_for_position(range.position(price), trend_days))
    }

    /// 트레이드 셋업 생성
    ///
    /// 명확한 셋업이 없으면 `Ok(None)`. 카운터는 결과와 관계없이 증가합니다.
    pub fn generate_setup(
        &self,
        price: Decimal,
        symbol: &str,
        po3: Option<u32>,
        trend_days: i32,
        time: NaiveDateTime,
    ) -> CoreResult<Option<TradeSetup>> {
        let id = self.setup_counter.fetch_add(1, Ordering::Relaxed) + 1;
        let range = self.calculate_range(price, po3)?;

        let position = range.position(price);
        let bias = bias_for_position(position, trend_days);

        let Some(layout) = select_plan(position, bias.bias) else {
            debug!(symbol, %price, position, "명확한 셋업 없음");
            return Ok(None);
        };

        let goldbach_time = GoldbachTime::at(time);
        let amd = AmdInfo::at(time);
        let partition = PartitionInfo::at(time.date());

        let entry_lo = range.level_price(layout.entry.0);
        let entry_hi = range.level_price(layout.entry.1);
        let entry_price = (entry_lo + entry_hi) / dec!(2);

        let targets = layout
            .targets
            .iter()
            .map(|(name, pct)| Target {
                name: (*name).to_string(),
                level: *pct,
                price: range.level_price(*pct),
            })
            .collect();

        let (inv_level, inv_desc) = layout.invalidation;
        let invalidation = Invalidation {
            level: inv_level,
            price: range.level_price(inv_level),
            description: inv_desc.to_string(),
        };

        let signal_strength = score_signal(
            bias.confidence,
            goldbach_time.is_goldbach,
            amd.cycle,
            partition.is_key_day,
            bias.layer,
        );

        let mut reasoning = bias.reasoning;
        reasoning.push(format!("Trade Plan: {}", layout.plan));
        if goldbach_time.is_goldbach {
            reasoning.push(format!(
                "Goldbach Time confirmation ({})",
                goldbach_time.clock_label()
            ));
        }
        reasoning.push(format!("AMD Cycle: {}", amd.cycle_name));
        if let Some(info) = &partition.key_day_info {
            reasoning.push(format!("Key partition day: {}", info));
        }

        debug!(
            symbol,
            plan = %layout.plan,
            bias = %bias.bias,
            strength = %signal_strength,
            "셋업 생성"
        );

        Ok(Some(TradeSetup {
            id,
            timestamp: time,
            symbol: symbol.to_string(),
            plan: layout.plan,
            bias: bias.bias,
            confidence: bias.confidence,
            entry_zone: (entry_lo, entry_hi),
            entry_price,
            stop_loss: invalidation.price,
            targets,
            invalidation,
            reasoning,
            goldbach_time_confirm: goldbach_time.is_goldbach,
            amd_cycle: amd.cycle,
            monthly_partition_day: partition.partition_day,
            signal_strength,
            status: SETUP_STATUS_PENDING.to_string(),
            result: None,
        }))
    }
}

fn bias_for_position(position: f64, trend_days: i32) -> BiasAnalysis {
    let mut confidence: i32 = 50;
    let mut reasoning = Vec::new();

    let (bias, gip_level) = if position <= 17.0 {
        confidence += 15;
        reasoning.push(format!(
            "Price below GIP [17] ({:.0}%) - strong BULLISH bias",
            position
        ));
        (Bias::Bullish, 17)
    } else if position >= 83.0 {
        confidence += 15;
        reasoning.push(format!(
            "Price above GIP [83] ({:.0}%) - strong BEARISH bias",
            position
        ));
        (Bias::Bearish, 83)
    } else if position < 50.0 {
        reasoning.push(format!(
            "Price below EQ [50] ({:.0}%) - mild BULLISH bias",
            position
        ));
        (Bias::Bullish, 17)
    } else if position > 50.0 {
        reasoning.push(format!(
            "Price above EQ [50] ({:.0}%) - mild BEARISH bias",
            position
        ));
        (Bias::Bearish, 83)
    } else {
        reasoning.push("Price at EQ [50] - NEUTRAL".to_string());
        (Bias::Neutral, 50)
    };

    let layer = layer_for_position(position);
    match layer {
        Some(Layer::Liquidity) => {
            confidence += 10;
            reasoning.push("In Liquidity Layer - high reversal probability".to_string());
        }
        Some(Layer::Flow) => {
            confidence += 5;
            reasoning.push("In Flow Layer - follow momentum".to_string());
        }
        Some(Layer::Rebalance) => {
            reasoning.push("In Rebalance Layer - consolidation likely".to_string());
        }
        None => {}
    }

    if trend_days != 0 {
        let weight = (trend_days.abs().saturating_mul(2)).min(10);
        let aligned = (trend_days > 0 && bias == Bias::Bullish)
            || (trend_days < 0 && bias == Bias::Bearish);
        if aligned {
            confidence += weight;
            reasoning.push(format!(
                "Trend alignment: {} days in bias direction",
                trend_days.abs()
            ));
        } else {
            confidence -= weight;
            reasoning.push(format!(
                "Counter-trend: {} days against bias",
                trend_days.abs()
            ));
        }
    }

    let confidence = confidence.clamp(i32::from(MIN_CONFIDENCE), i32::from(MAX_CONFIDENCE)) as u8;

    BiasAnalysis {
        bias,
        confidence,
        gip_level,
        position,
        layer: layer.unwrap_or(Layer::Flow),
        reasoning,
    }
}

/// 셋업을 사람이 읽을 수 있는 텍스트로 변환
pub fn format_setup(setup: &TradeSetup) -> String {
    let mut lines = vec![
        format!(
            "GOLDBACH SETUP #{} - {} {}",
            setup.id, setup.symbol, setup.bias
        ),
        "─".repeat(40),
        format!("Time:        {}", setup.timestamp.format("%d.%m.%Y %H:%M")),
        format!("Plan:        {}", setup.plan),
        format!("Strength:    {}", setup.signal_strength),
        format!("Confidence:  {}%", setup.confidence),
        format!(
            "Entry Zone:  {:.2} - {:.2}",
            setup.entry_zone.0, setup.entry_zone.1
        ),
        format!("Entry:       {:.2}", setup.entry_price),
        format!("Stop Loss:   {:.2}", setup.stop_loss),
    ];

    for target in &setup.targets {
        lines.push(format!(
            "{:<12} {:.2} [{}]",
            format!("{}:", target.name),
            target.price,
            target.level
        ));
    }

    lines.push(format!(
        "Invalidation: {} ({:.2})",
        setup.invalidation.description, setup.invalidation.price
    ));
    lines.push(format!(
        "Timing:      AMD {} | Goldbach time: {} | Partition day: {}",
        setup.amd_cycle,
        if setup.goldbach_time_confirm { "yes" } else { "no" },
        setup.monthly_partition_day
    ));
    lines.push("Reasoning:".to_string());
    lines.extend(setup.reasoning.iter().map(|r| format!("  • {}", r)));

    lines.join("\n")
}
