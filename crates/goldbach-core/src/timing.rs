//! Goldbach 시간, AMD 사이클, 월간 파티션.
//!
//! 모든 함수는 시장 기준 벽시계 시간(`NaiveDateTime`)을 받습니다.
//! 현재 시각은 [`MarketClock`]으로 시장 시간대에 맞춰 변환합니다.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::AmdCycle;

/// 시:분 합계가 이 숫자와 같으면 Goldbach 시간
pub const GOLDBACH_NUMBERS: [u32; 12] = [3, 11, 17, 29, 41, 47, 53, 59, 71, 83, 89, 97];

/// 기본 시장 시간대 (CET)
pub const DEFAULT_MARKET_TIMEZONE: Tz = chrono_tz::Europe::Berlin;

// ==================== Goldbach 시간 ====================

/// Goldbach 시간 분석 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldbachTime {
    pub time: NaiveDateTime,
    pub hour: u32,
    pub minute: u32,
    pub sum_value: u32,
    pub is_goldbach: bool,
    pub nearest_goldbach: u32,
}

impl GoldbachTime {
    pub fn at(time: NaiveDateTime) -> Self {
        let hour = time.hour();
        let minute = time.minute();
        let sum_value = hour + minute;

        Self {
            time,
            hour,
            minute,
            sum_value,
            is_goldbach: GOLDBACH_NUMBERS.contains(&sum_value),
            nearest_goldbach: nearest_goldbach_number(sum_value),
        }
    }

    /// "h:mm" 형식
    pub fn clock_label(&self) -> String {
        format!("{}:{:02}", self.hour, self.minute)
    }
}

fn nearest_goldbach_number(value: u32) -> u32 {
    GOLDBACH_NUMBERS
        .iter()
        .copied()
        .fold(GOLDBACH_NUMBERS[0], |best, n| {
            if n.abs_diff(value) < best.abs_diff(value) {
                n
            } else {
                best
            }
        })
}

/// `from` 이후의 Goldbach 시간을 분 단위로 탐색합니다.
pub fn next_goldbach_times(from: NaiveDateTime, count: usize) -> Vec<GoldbachTime> {
    // 하루(1440분) 안에 여러 번 발생하므로 탐색 상한은 충분히 넉넉함
    let max_steps = 1440 * (count + 1);
    let mut results = Vec::with_capacity(count);
    let mut current = from;

    for _ in 0..max_steps {
        if results.len() >= count {
            break;
        }
        current += Duration::minutes(1);
        let info = GoldbachTime::at(current);
        if info.is_goldbach {
            results.push(info);
        }
    }

    results
}

// ==================== AMD 사이클 ====================

/// AMD 사이클 정보
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmdInfo {
    pub cycle: AmdCycle,
    pub cycle_name: String,
    pub description: String,
    pub trading_bias: String,
}

impl AmdInfo {
    pub fn at(time: NaiveDateTime) -> Self {
        let cycle = amd_cycle_at(time);
        let (name, description, bias) = match cycle {
            AmdCycle::Asian => (
                "Asian Session",
                "Consolidation phase - mark the range",
                "Wait - mark the Asian range",
            ),
            AmdCycle::Manipulation => (
                "London/Manipulation",
                "Creates HOD/LOD in 80%+ of cases",
                "Look for a stop run of the Asian range",
            ),
            AmdCycle::Distribution1 => (
                "NY AM (D1)",
                "Continuation or reversal of M move",
                "Continuation if M was small, reversal if M was large",
            ),
            AmdCycle::Distribution2 => (
                "NY PM (D2)",
                "Profit taking and reversals common",
                "Careful - frequent reversals",
            ),
        };

        Self {
            cycle,
            cycle_name: name.to_string(),
            description: description.to_string(),
            trading_bias: bias.to_string(),
        }
    }
}

/// 시간대별 AMD 사이클
pub fn amd_cycle_at(time: NaiveDateTime) -> AmdCycle {
    match time.hour() {
        20..=23 | 0..=2 => AmdCycle::Asian,
        3..=8 => AmdCycle::Manipulation,
        9..=11 => AmdCycle::Distribution1,
        _ => AmdCycle::Distribution2,
    }
}

// ==================== 월간 파티션 ====================

/// 월별 (시작일, 파티션 번호). 인덱스 0 = 1월.
pub const MONTHLY_PARTITIONS: [(u32, u32); 12] = [
    (8, 18),
    (7, 27),
    (6, 36),
    (5, 45),
    (4, 54),
    (3, 63),
    (2, 72),
    (1, 81),
    (9, 99),
    (8, 108),
    (7, 117),
    (6, 126),
];

/// 월의 파티션 (시작일, 번호)
pub fn partition_for_month(month: u32) -> Option<(u32, u32)> {
    month
        .checked_sub(1)
        .and_then(|idx| MONTHLY_PARTITIONS.get(idx as usize).copied())
}

fn key_day_info(partition_day: u32) -> Option<&'static str> {
    match partition_day {
        3 => Some("POI clue day - look for gap/block/liquidity"),
        11 => Some("First major swing (Goldbach number)"),
        17 => Some("Second swing if day 11 didn't complete"),
        _ => None,
    }
}

/// 월간 파티션 정보
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionInfo {
    pub month: u32,
    pub day: u32,
    pub partition_start: u32,
    pub partition_number: u32,
    /// 파티션 시작 전이면 0
    pub partition_day: u32,
    pub is_key_day: bool,
    pub key_day_info: Option<String>,
    pub expected_stop_run_pips: u32,
}

impl PartitionInfo {
    pub fn at(date: NaiveDate) -> Self {
        let month = date.month();
        let day = date.day();
        let (start, number) = partition_for_month(month).unwrap_or((1, 0));

        let partition_day = if day >= start { day - start + 1 } else { 0 };
        let info = key_day_info(partition_day);

        Self {
            month,
            day,
            partition_start: start,
            partition_number: number,
            partition_day,
            is_key_day: info.is_some(),
            key_day_info: info.map(str::to_string),
            expected_stop_run_pips: number,
        }
    }
}

// ==================== 시장 시계 ====================

/// 현재 시각을 시장 시간대의 벽시계 시간으로 변환
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketClock {
    timezone: Tz,
}

impl Default for MarketClock {
    fn default() -> Self {
        Self::new(DEFAULT_MARKET_TIMEZONE)
    }
}

impl MarketClock {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    /// `MARKET_TIMEZONE` 환경 변수에서 생성. 잘못된 값이면 기본값으로 대체.
    pub fn from_env() -> Self {
        match std::env::var("MARKET_TIMEZONE") {
            Ok(name) => Self::from_name(&name),
            Err(_) => Self::default(),
        }
    }

    /// 시간대 이름(IANA)으로 생성. 잘못된 이름이면 기본값으로 대체.
    pub fn from_name(name: &str) -> Self {
        match name.trim().parse::<Tz>() {
            Ok(tz) => Self::new(tz),
            Err(_) => {
                warn!(
                    timezone = %name,
                    fallback = %DEFAULT_MARKET_TIMEZONE,
                    "알 수 없는 시장 시간대, 기본값 사용"
                );
                Self::default()
            }
        }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// 현재 시장 시간
    pub fn now(&self) -> NaiveDateTime {
        self.to_market_time(Utc::now())
    }

    /// UTC 시각을 시장 벽시계 시간으로 변환
    pub fn to_market_time(&self, time: DateTime<Utc>) -> NaiveDateTime {
        time.with_timezone(&self.timezone).naive_local()
    }
}
