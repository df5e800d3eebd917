//! 도메인 열거형.
//!
//! 직렬화 형식은 외부 API와 동일하게 대문자 코드(`BULLISH`, `FLOW_CONTINUATION`, `D1` 등)를 사용합니다.
//! 역직렬화는 대소문자를 구분하지 않습니다.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// 시장 방향성
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Bias {
    Bullish,
    Bearish,
    Neutral,
}

impl Bias {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bullish => "BULLISH",
            Self::Bearish => "BEARISH",
            Self::Neutral => "NEUTRAL",
        }
    }
}

impl fmt::Display for Bias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 3-Layer 프레임워크의 레이어
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Layer {
    Liquidity,
    Flow,
    Rebalance,
}

impl Layer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Liquidity => "LIQUIDITY",
            Self::Flow => "FLOW",
            Self::Rebalance => "REBALANCE",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 트레이드 플랜
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "String")]
pub enum TradePlan {
    Einstein,
    Liquidity,
    FlowContinuation,
    FlowRejection,
    Rebalance,
    StopRun,
}

impl TradePlan {
    /// 전체 플랜 목록 (선언 순서)
    pub const ALL: [TradePlan; 6] = [
        Self::Einstein,
        Self::Liquidity,
        Self::FlowContinuation,
        Self::FlowRejection,
        Self::Rebalance,
        Self::StopRun,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Einstein => "EINSTEIN",
            Self::Liquidity => "LIQUIDITY",
            Self::FlowContinuation => "FLOW_CONTINUATION",
            Self::FlowRejection => "FLOW_REJECTION",
            Self::Rebalance => "REBALANCE",
            Self::StopRun => "STOP_RUN",
        }
    }
}

impl fmt::Display for TradePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradePlan {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase();
        Self::ALL
            .into_iter()
            .find(|plan| plan.as_str() == normalized)
            .ok_or_else(|| CoreError::UnknownVariant {
                kind: "trade plan",
                value: s.to_string(),
            })
    }
}

impl TryFrom<String> for TradePlan {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// AMD 사이클 (Accumulation / Manipulation / Distribution)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum AmdCycle {
    /// 아시아 세션 (20:00-03:00 CET)
    #[serde(rename = "A")]
    Asian,
    /// 런던 / 매니퓰레이션 (03:00-09:00 CET)
    #[serde(rename = "M")]
    Manipulation,
    /// 뉴욕 오전 (09:00-12:00 CET)
    #[serde(rename = "D1")]
    Distribution1,
    /// 뉴욕 오후 (12:00 이후)
    #[serde(rename = "D2")]
    Distribution2,
}

impl AmdCycle {
    pub const ALL: [AmdCycle; 4] = [
        Self::Asian,
        Self::Manipulation,
        Self::Distribution1,
        Self::Distribution2,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Self::Asian => "A",
            Self::Manipulation => "M",
            Self::Distribution1 => "D1",
            Self::Distribution2 => "D2",
        }
    }
}

impl fmt::Display for AmdCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for AmdCycle {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase();
        Self::ALL
            .into_iter()
            .find(|cycle| cycle.code() == normalized)
            .ok_or_else(|| CoreError::UnknownVariant {
                kind: "AMD cycle",
                value: s.to_string(),
            })
    }
}

impl TryFrom<String> for AmdCycle {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// 신호 강도 (WEAK < MEDIUM < STRONG < EXCELLENT < PERFECT)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "String")]
pub enum SignalStrength {
    Weak,
    Medium,
    Strong,
    Excellent,
    Perfect,
}

impl SignalStrength {
    pub const ALL: [SignalStrength; 5] = [
        Self::Weak,
        Self::Medium,
        Self::Strong,
        Self::Excellent,
        Self::Perfect,
    ];

    /// 점수를 강도로 변환합니다.
    pub fn from_score(score: u8) -> Self {
        match score {
            6.. => Self::Perfect,
            5 => Self::Excellent,
            4 => Self::Strong,
            2 | 3 => Self::Medium,
            _ => Self::Weak,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weak => "WEAK",
            Self::Medium => "MEDIUM",
            Self::Strong => "STRONG",
            Self::Excellent => "EXCELLENT",
            Self::Perfect => "PERFECT",
        }
    }
}

impl fmt::Display for SignalStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalStrength {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase();
        Self::ALL
            .into_iter()
            .find(|strength| strength.as_str() == normalized)
            .ok_or_else(|| CoreError::UnknownVariant {
                kind: "signal strength",
                value: s.to_string(),
            })
    }
}

impl TryFrom<String> for SignalStrength {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_strength_ordering() {
        assert!(SignalStrength::Weak < SignalStrength::Medium);
        assert!(SignalStrength::Strong < SignalStrength::Excellent);
        assert!(SignalStrength::Excellent < SignalStrength::Perfect);
    }

    #[test]
    fn test_signal_strength_from_score() {
        assert_eq!(SignalStrength::from_score(0), SignalStrength::Weak);
        assert_eq!(SignalStrength::from_score(1), SignalStrength::Weak);
        assert_eq!(SignalStrength::from_score(2), SignalStrength::Medium);
        assert_eq!(SignalStrength::from_score(3), SignalStrength::Medium);
        assert_eq!(SignalStrength::from_score(4), SignalStrength::Strong);
        assert_eq!(SignalStrength::from_score(5), SignalStrength::Excellent);
        assert_eq!(SignalStrength::from_score(7), SignalStrength::Perfect);
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("medium".parse::<SignalStrength>(), Ok(SignalStrength::Medium));
        assert_eq!("flow_continuation".parse::<TradePlan>(), Ok(TradePlan::FlowContinuation));
        assert_eq!("d1".parse::<AmdCycle>(), Ok(AmdCycle::Distribution1));
        assert!("HUGE".parse::<SignalStrength>().is_err());
    }

    #[test]
    fn test_serde_codes() {
        assert_eq!(serde_json::to_string(&AmdCycle::Distribution2).unwrap(), "\"D2\"");
        assert_eq!(serde_json::to_string(&TradePlan::StopRun).unwrap(), "\"STOP_RUN\"");
        assert_eq!(serde_json::to_string(&Bias::Bullish).unwrap(), "\"BULLISH\"");

        let strength: SignalStrength = serde_json::from_str("\"strong\"").unwrap();
        assert_eq!(strength, SignalStrength::Strong);
        let cycle: AmdCycle = serde_json::from_str("\"M\"").unwrap();
        assert_eq!(cycle, AmdCycle::Manipulation);
    }
}
