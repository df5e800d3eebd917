//! PO3 범위와 Goldbach 레벨 계산.
//!
//! 가격은 PO3 크기(3의 거듭제곱) 단위의 범위로 나뉘고, 각 범위는 고정된
//! 퍼센트 레벨 테이블로 분할됩니다.
//!
//! # 레이어 구조
//!
//! | 구간 | 레이어 |
//! |------|--------|
//! | 0-17, 83-100 | LIQUIDITY |
//! | 29-35, 65-71 | FLOW |
//! | 41-59 | REBALANCE |
//!
//! 가격이 100 미만이면 외환으로 간주하여 10000배 스케일로 범위를 계산한 뒤
//! 다시 가격 단위로 환산합니다.

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::Layer;

/// 허용되는 PO3 범위 크기
pub const PO3_SIZES: [u32; 8] = [3, 9, 27, 81, 243, 729, 2187, 6561];

/// 기본 PO3 크기
pub const DEFAULT_PO3: u32 = 729;

/// 이 가격 미만은 외환 스케일로 계산
pub const FOREX_PRICE_THRESHOLD: Decimal = dec!(100);

const FOREX_SCALE: Decimal = dec!(10000);

/// 레벨 정의
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelDefinition {
    pub pct: u8,
    pub name: &'static str,
    pub ict_name: &'static str,
    pub layer: Option<Layer>,
}

const fn level(pct: u8, name: &'static str, ict_name: &'static str, layer: Option<Layer>) -> LevelDefinition {
    LevelDefinition {
        pct,
        name,
        ict_name,
        layer,
    }
}

const LIQ: Option<Layer> = Some(Layer::Liquidity);
const FLOW: Option<Layer> = Some(Layer::Flow);
const REB: Option<Layer> = Some(Layer::Rebalance);

/// 21개 레벨 테이블 (퍼센트 오름차순)
pub const GOLDBACH_LEVELS: [LevelDefinition; 21] = [
    level(0, "LOW", "Range Low", LIQ),
    level(3, "REJ", "Rejection Block", LIQ),
    level(7, "LLOD", "Last Line of Defence", LIQ),
    level(11, "IRL", "Order Block", LIQ),
    level(17, "GIP", "Fair Value Gap", LIQ),
    level(23, "nGB", "(non-Goldbach)", None),
    level(29, "FLOW", "Liquidity Void", FLOW),
    level(35, "nGB", "(non-Goldbach)", None),
    level(41, "EXT.REB", "Breaker", REB),
    level(47, "INT.REB", "Mitigation Block", REB),
    level(50, "EQ", "Equilibrium", REB),
    level(53, "INT.REB", "Mitigation Block", REB),
    level(59, "EXT.REB", "Breaker", REB),
    level(65, "nGB", "(non-Goldbach)", None),
    level(71, "FLOW", "Liquidity Void", FLOW),
    level(77, "nGB", "(non-Goldbach)", None),
    level(83, "GIP", "Fair Value Gap", LIQ),
    level(89, "IRL", "Order Block", LIQ),
    level(93, "LLOD", "Last Line of Defence", LIQ),
    level(97, "REJ", "Rejection Block", LIQ),
    level(100, "HIGH", "Range High", LIQ),
];

const NON_GOLDBACH_LEVELS: [u8; 4] = [23, 35, 65, 77];

/// PO3 크기가 허용 목록에 있는지 확인합니다.
pub fn validate_po3(po3: u32) -> CoreResult<u32> {
    if PO3_SIZES.contains(&po3) {
        Ok(po3)
    } else {
        Err(CoreError::InvalidPo3Size(po3))
    }
}

/// 포지션(0-100)에 해당하는 레이어. 레이어 사이 구간은 `None`.
pub fn layer_for_position(position: f64) -> Option<Layer> {
    if position <= 17.0 || position >= 83.0 {
        Some(Layer::Liquidity)
    } else if (29.0..=35.0).contains(&position) || (65.0..=71.0).contains(&position) {
        Some(Layer::Flow)
    } else if (41.0..=59.0).contains(&position) {
        Some(Layer::Rebalance)
    } else {
        None
    }
}

/// 범위 안의 개별 레벨
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldbachLevel {
    pub level_pct: u8,
    pub price: Decimal,
    pub name: String,
    pub ict_name: String,
    pub layer: Option<Layer>,
    pub is_goldbach: bool,
}

impl GoldbachLevel {
    fn from_definition(def: &LevelDefinition, price: Decimal) -> Self {
        let name = match def.pct {
            0 | 50 | 100 => def.name.to_string(),
            pct => format!("{} [{}]", def.name, pct),
        };

        Self {
            level_pct: def.pct,
            price,
            name,
            ict_name: def.ict_name.to_string(),
            layer: def.layer,
            is_goldbach: !NON_GOLDBACH_LEVELS.contains(&def.pct),
        }
    }
}

/// PO3 범위
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Po3Range {
    /// 범위 번호 (정수 가격 / PO3)
    pub range_num: i64,
    pub low: Decimal,
    pub high: Decimal,
    /// 가격 단위 범위 폭
    pub size: Decimal,
    pub po3_size: u32,
    pub levels: Vec<GoldbachLevel>,
}

impl Po3Range {
    /// 가격이 속한 범위를 계산합니다.
    pub fn from_price(price: Decimal, po3: u32) -> CoreResult<Self> {
        let po3 = validate_po3(po3)?;
        if price <= Decimal::ZERO {
            return Err(CoreError::InvalidPrice(price));
        }

        let scale = if price < FOREX_PRICE_THRESHOLD {
            FOREX_SCALE
        } else {
            Decimal::ONE
        };

        let price_int = (price * scale)
            .trunc()
            .to_i64()
            .ok_or(CoreError::InvalidPrice(price))?;
        let range_num = price_int / i64::from(po3);

        Ok(Self::build(range_num, po3, scale))
    }

    /// 범위 번호로부터 범위를 생성합니다 (정수 가격 단위).
    pub fn from_range_number(range_num: i64, po3: u32) -> CoreResult<Self> {
        let po3 = validate_po3(po3)?;
        Ok(Self::build(range_num, po3, Decimal::ONE))
    }

    fn build(range_num: i64, po3: u32, scale: Decimal) -> Self {
        let low_int = range_num.saturating_mul(i64::from(po3));
        let low = Decimal::from(low_int) / scale;
        let size = Decimal::from(po3) / scale;
        let high = low + size;

        let levels = GOLDBACH_LEVELS
            .iter()
            .map(|def| GoldbachLevel::from_definition(def, low + Decimal::from(def.pct) / dec!(100) * size))
            .collect();

        Self {
            range_num,
            low,
            high,
            size,
            po3_size: po3,
            levels,
        }
    }

    /// 퍼센트 레벨의 가격
    pub fn level_price(&self, pct: u8) -> Decimal {
        self.low + Decimal::from(pct) / dec!(100) * self.size
    }

    /// 테이블에 정의된 레벨 조회
    pub fn level(&self, pct: u8) -> Option<&GoldbachLevel> {
        self.levels.iter().find(|l| l.level_pct == pct)
    }

    /// 범위 내 위치 (0-100, 범위 밖은 경계값으로 고정)
    pub fn position(&self, price: Decimal) -> f64 {
        if price <= self.low {
            return 0.0;
        }
        if price >= self.high {
            return 100.0;
        }
        ((price - self.low) / self.size * dec!(100))
            .to_f64()
            .unwrap_or(0.0)
    }

    /// 가격에 가장 가까운 레벨 (동률이면 낮은 레벨)
    pub fn nearest_level(&self, price: Decimal) -> Option<&GoldbachLevel> {
        self.levels.iter().fold(None, |best: Option<&GoldbachLevel>, level| match best {
            Some(b) if (b.price - price).abs() <= (level.price - price).abs() => Some(b),
            _ => Some(level),
        })
    }
}
