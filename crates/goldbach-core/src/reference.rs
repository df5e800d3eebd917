//! 참조 데이터 (레벨, 파티션, 트레이드 플랜 설명).

use std::collections::BTreeMap;

use serde::Serialize;

use crate::levels::GOLDBACH_LEVELS;
use crate::timing::MONTHLY_PARTITIONS;
use crate::types::Layer;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceLevel {
    pub name: &'static str,
    pub ict: &'static str,
    pub layer: Option<Layer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReferencePartition {
    pub start_day: u32,
    pub number: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferencePlan {
    pub description: &'static str,
    pub entry_zone: &'static str,
    pub targets: &'static str,
    pub best_for: &'static str,
}

/// 퍼센트 → 레벨 정의
pub fn reference_levels() -> BTreeMap<u8, ReferenceLevel> {
    GOLDBACH_LEVELS
        .iter()
        .map(|def| {
            (
                def.pct,
                ReferenceLevel {
                    name: def.name,
                    ict: def.ict_name,
                    layer: def.layer,
                },
            )
        })
        .collect()
}

/// 월 → 파티션
pub fn reference_partitions() -> BTreeMap<u32, ReferencePartition> {
    MONTHLY_PARTITIONS
        .iter()
        .zip(1u32..)
        .map(|(&(start_day, number), month)| (month, ReferencePartition { start_day, number }))
        .collect()
}

/// 플랜 이름 → 설명
pub fn reference_plans() -> BTreeMap<&'static str, ReferencePlan> {
    BTreeMap::from([
        (
            "EINSTEIN",
            ReferencePlan {
                description: "Most profitable plan - enter the GAP between [11-17] or [83-89]",
                entry_zone: "Liquidity Layer GAP",
                targets: "[47-53] partial, [41-59] full",
                best_for: "Reversal from extremes",
            },
        ),
        (
            "LIQUIDITY",
            ReferencePlan {
                description: "Entry on a stop run near the range edges",
                entry_zone: "[3-11] or [89-97]",
                targets: "External liquidity",
                best_for: "Stop runs",
            },
        ),
        (
            "FLOW_CONTINUATION",
            ReferencePlan {
                description: "Follow momentum in the Flow Layer",
                entry_zone: "[29-35] or [65-71]",
                targets: "Rebalance, then the opposite Flow",
                best_for: "Trend continuation",
            },
        ),
        (
            "REBALANCE",
            ReferencePlan {
                description: "Trade the range inside the Rebalance Layer",
                entry_zone: "[41-47] or [53-59]",
                targets: "Opposite edge of Rebalance",
                best_for: "Range trading",
            },
        ),
        (
            "STOP_RUN",
            ReferencePlan {
                description: "Classic ICT stop run setup",
                entry_zone: "Range extreme with breaker",
                targets: "Liquidity Void [29/71]",
                best_for: "Manipulation phases",
            },
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_tables() {
        let levels = reference_levels();
        assert_eq!(levels.len(), 21);
        assert_eq!(levels[&50].name, "EQ");
        assert_eq!(levels[&23].layer, None);

        let partitions = reference_partitions();
        assert_eq!(partitions.len(), 12);
        assert_eq!(partitions[&9], ReferencePartition { start_day: 9, number: 99 });

        let plans = reference_plans();
        assert_eq!(plans.len(), 5);
        assert!(plans.contains_key("STOP_RUN"));
    }

    #[test]
    fn test_reference_json_keys() {
        let json = serde_json::to_value(reference_levels()).unwrap();
        assert_eq!(json["17"]["ict"], "Fair Value Gap");
        assert_eq!(json["29"]["layer"], "FLOW");
    }
}
